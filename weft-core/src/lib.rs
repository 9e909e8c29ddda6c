//! Weft Core
//!
//! This crate provides a transactional, glitch-free reactive dataflow
//! engine. It implements:
//!
//! - Cells (values over time) and event streams (discrete occurrences)
//! - Transactions that propagate, correct and commit changes atomically
//! - Demand-driven activation of derived vertices
//! - Revocable actions, cancellable effects and deferred reads
//!
//! The engine is single-threaded. One transaction propagates at a time on a
//! thread; opening another while it runs is an error.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `graph`: Vertex identity, listener registries and weak registration
//! - `transaction`: The propagate, wrap-up, commit and side-effect protocol
//! - `cell`: Cell vertices (frozen and warm) and their operators
//! - `stream`: Stream vertices (terminated and live) and their operators
//! - `reactive`: The public operator surface built on the vertices
//!
//! # Example
//!
//! ```rust,ignore
//! use weft_core::{EventStream, Transaction};
//!
//! let clicks: EventStream<()> = EventStream::wrap(&button);
//!
//! // Count the clicks
//! let count = Transaction::execute(|tx| clicks.accumulate(tx, 0, |count, _| count + 1))?;
//!
//! // Every click distributed by `button` now updates the count
//! assert_eq!(Transaction::execute(|tx| count.sample(tx))?, 0);
//! ```

pub mod cell;
pub mod error;
pub mod graph;
pub mod reactive;
pub mod stream;
pub mod transaction;

#[cfg(test)]
mod test_utils;

pub use error::{SideEffectError, TransactionError};
pub use reactive::{
    looped, Action, Cell, Effect, EffectHandle, EventDistributor, EventStream, ExternalSourceAdapter, Looped,
    Moment, Schedule, SubscriptionHandle, Trigger, Triggers,
};
pub use transaction::{ExternalSideEffect, RevocationHandle, Transaction, TransactionId};
