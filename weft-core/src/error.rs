//! Error types.
//!
//! Only conditions a caller can reasonably handle are reported as errors.
//! Breaches of the vertex protocol (double activation, foreign handles,
//! enqueueing on a closing transaction) are programming mistakes and panic
//! at the point of violation.

use std::error::Error as StdError;

use thiserror::Error;

use crate::transaction::TransactionId;

/// Failure of a whole transaction.
#[derive(Debug, Error)]
pub enum TransactionError {
    /// `Transaction::execute` was called while another transaction is open
    /// on this thread.
    #[error("transaction {current} is already open on this thread")]
    AlreadyOpen {
        /// The transaction that is currently propagating.
        current: TransactionId,
    },

    /// An external side effect failed. The graph was already committed; side
    /// effects queued after the failing one were not run.
    #[error("side effect failed after commit")]
    SideEffect(#[from] SideEffectError),
}

/// Error reported by an [`ExternalSideEffect`](crate::transaction::ExternalSideEffect).
#[derive(Debug, Error)]
#[error("{message}")]
pub struct SideEffectError {
    message: String,
    #[source]
    source: Option<Box<dyn StdError + 'static>>,
}

impl SideEffectError {
    /// Create an error with a plain message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Create an error wrapping an underlying cause.
    pub fn with_source(message: impl Into<String>, source: impl StdError + 'static) -> Self {
        Self {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// The human-readable message.
    pub fn message(&self) -> &str {
        &self.message
    }
}
