//! Open-transaction scope.
//!
//! At most one transaction propagates per thread at a time. The scope guard
//! records the open transaction in a thread-local slot and clears it again
//! when dropped, including when propagation panics.

use std::cell::Cell;

use super::TransactionId;
use crate::error::TransactionError;

thread_local! {
    static OPEN_TRANSACTION: Cell<Option<TransactionId>> = const { Cell::new(None) };
}

/// Guard that marks a transaction as open on the current thread.
pub(crate) struct TransactionScope {
    id: TransactionId,
}

impl TransactionScope {
    /// Open the scope for `id`, or report the transaction that is already open.
    pub fn enter(id: TransactionId) -> Result<Self, TransactionError> {
        OPEN_TRANSACTION.with(|open| match open.get() {
            Some(current) => Err(TransactionError::AlreadyOpen { current }),
            None => {
                open.set(Some(id));
                Ok(Self { id })
            }
        })
    }

    /// The transaction currently open on this thread, if any.
    pub fn current() -> Option<TransactionId> {
        OPEN_TRANSACTION.with(Cell::get)
    }
}

impl Drop for TransactionScope {
    fn drop(&mut self) {
        OPEN_TRANSACTION.with(|open| {
            let closed = open.take();
            debug_assert_eq!(
                closed,
                Some(self.id),
                "TransactionScope mismatch: expected {:?}, got {:?}",
                self.id,
                closed
            );
        });
    }
}
