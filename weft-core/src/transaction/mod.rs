//! Transactions
//!
//! Every change to the graph happens inside a transaction. A transaction
//! runs in four phases:
//!
//! 1. **Propagate**: the caller's closure stimulates input vertices. Each
//!    stimulated vertex exposes an update or emission, enqueues itself for
//!    commitment and notifies its listeners synchronously, which do the same
//!    in turn.
//! 2. **Wrap up**: callbacks deferred by vertices constructed during
//!    propagation run, with the transaction still open. They may enqueue
//!    further callbacks.
//! 3. **Commit**: every enqueued vertex commits once, in enqueue order,
//!    turning its in-flight state into stable state.
//! 4. **Side effects**: queued external side effects run in enqueue order.
//!    The thread is no longer inside the transaction at this point, so a side
//!    effect may open a new one.
//!
//! If the caller's closure panics, the transaction is abandoned while
//! unwinding: every enqueued vertex drops its in-flight state and no side
//! effect runs. The graph stays usable for the next transaction.
//!
//! # Sampling
//!
//! While a transaction propagates, reading a cell's value yields its value
//! from before the transaction ("old value"); the in-flight update is
//! available separately. After commit the new value becomes the old one.

mod revocation;
mod scope;
mod side_effect;

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use indexmap::IndexMap;

use crate::error::TransactionError;
use crate::graph::{Committable, VertexId};
pub use revocation::RevocationHandle;
pub(crate) use scope::TransactionScope;
pub use side_effect::ExternalSideEffect;
use side_effect::SideEffectQueue;

/// Unique identifier for a transaction.
///
/// Identifiers increase monotonically across the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TransactionId(u64);

impl TransactionId {
    /// Generate a new unique transaction ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for TransactionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

type WrapUp = Box<dyn FnOnce(&mut Transaction)>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Propagating,
    Committing,
}

/// The propagation context of an open transaction.
///
/// Only [`Transaction::execute`] creates one; every operation that reads or
/// changes the graph borrows it.
pub struct Transaction {
    id: TransactionId,
    phase: Phase,
    commit_queue: IndexMap<VertexId, Rc<dyn Committable>>,
    wrap_up_queue: VecDeque<WrapUp>,
    side_effects: Rc<RefCell<SideEffectQueue>>,
}

impl Transaction {
    /// Open a transaction, run `propagate` in it, then wrap up, commit and
    /// run queued side effects.
    ///
    /// # Errors
    ///
    /// - [`TransactionError::AlreadyOpen`] if called while another
    ///   transaction propagates on this thread. Nothing runs in that case.
    /// - [`TransactionError::SideEffect`] if a side effect fails. The graph
    ///   is committed; the side effects after the failing one are skipped.
    pub fn execute<R>(propagate: impl FnOnce(&mut Transaction) -> R) -> Result<R, TransactionError> {
        let id = TransactionId::new();
        let scope = TransactionScope::enter(id)?;

        let span = tracing::trace_span!("transaction", id = id.raw());
        let _entered = span.enter();

        let mut tx = Transaction {
            id,
            phase: Phase::Propagating,
            commit_queue: IndexMap::new(),
            wrap_up_queue: VecDeque::new(),
            side_effects: SideEffectQueue::new(),
        };

        let result = propagate(&mut tx);
        tx.wrap_up();
        let side_effects = tx.commit();
        drop(tx);
        drop(scope);

        match SideEffectQueue::run(&side_effects) {
            Ok(executed) => {
                if executed > 0 {
                    tracing::trace!(executed, "side effects executed");
                }
                Ok(result)
            }
            Err(error) => {
                tracing::warn!(%error, "side effect failed, abandoning the remaining queue");
                Err(error.into())
            }
        }
    }

    pub fn id(&self) -> TransactionId {
        self.id
    }

    /// The transaction propagating on this thread, if any.
    pub fn current_id() -> Option<TransactionId> {
        TransactionScope::current()
    }

    /// Enqueue `vertex` to be committed when propagation ends.
    ///
    /// Enqueueing the same vertex again is harmless; it commits once.
    pub(crate) fn enqueue_for_commitment(&mut self, vertex: Rc<dyn Committable>) {
        self.assert_propagating("enqueue a vertex for commitment");
        self.commit_queue.entry(VertexId::of(&vertex)).or_insert(vertex);
    }

    /// Defer `callback` until propagation has finished but before commit.
    pub(crate) fn enqueue_for_wrap_up(&mut self, callback: impl FnOnce(&mut Transaction) + 'static) {
        self.assert_propagating("enqueue a wrap-up callback");
        self.wrap_up_queue.push_back(Box::new(callback));
    }

    /// Queue a side effect to run after commit.
    ///
    /// Revoking the returned handle while the transaction is still open
    /// withdraws the side effect.
    pub fn enqueue_for_execution(&mut self, side_effect: Rc<dyn ExternalSideEffect>) -> RevocationHandle {
        self.assert_propagating("enqueue a side effect");
        let queued = SideEffectQueue::push(&self.side_effects, side_effect);
        RevocationHandle::new(move |_| queued.withdraw())
    }

    fn assert_propagating(&self, what: &str) {
        assert_eq!(
            self.phase,
            Phase::Propagating,
            "cannot {what}: transaction {} is already committing",
            self.id
        );
    }

    fn wrap_up(&mut self) {
        while let Some(callback) = self.wrap_up_queue.pop_front() {
            callback(self);
        }
    }

    fn commit(&mut self) -> Rc<RefCell<SideEffectQueue>> {
        self.phase = Phase::Committing;
        let committed = self.commit_queue.len();
        // The queue is cleared only once every vertex has committed, so a
        // panicking commit leaves the rest to be abandoned.
        for index in 0..committed {
            let vertex = self.commit_queue[index].clone();
            vertex.commit();
        }
        self.commit_queue.clear();
        tracing::trace!(committed, "transaction committed");
        self.side_effects.clone()
    }
}

impl Drop for Transaction {
    fn drop(&mut self) {
        if self.commit_queue.is_empty() {
            return;
        }
        tracing::warn!(
            id = self.id.raw(),
            abandoned = self.commit_queue.len(),
            "transaction unwound before commit"
        );
        for (_, vertex) in self.commit_queue.drain(..) {
            vertex.abandon();
        }
    }
}

impl fmt::Debug for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transaction")
            .field("id", &self.id)
            .field("phase", &self.phase)
            .field("enqueued", &self.commit_queue.len())
            .finish()
    }
}

// ---- Tests ----
