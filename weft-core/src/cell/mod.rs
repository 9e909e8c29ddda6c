//! Cell Vertices
//!
//! A cell vertex holds a value at every point in time.
//!
//! # Frozen and Warm
//!
//! - A **frozen** vertex can never change. It accepts no observers; trying to
//!   observe it hands back a detached handle.
//! - A **warm** vertex may change. During a transaction it exposes an
//!   optional in-flight [`Update`]; observers are notified whenever that
//!   update is exposed, corrected or revoked.
//!
//! The split is a sealed enum, so callers branch on it explicitly instead of
//! asking a vertex what it can do.

mod frozen;
pub(crate) mod operators;
mod warm;

use std::fmt;
use std::rc::Rc;

use crate::graph::{Listener, ListenerHandle, Observable, VertexId};
use crate::transaction::Transaction;
pub(crate) use frozen::{DerivedFrozenCell, PureCell};
pub(crate) use warm::{CachePolicy, CellOperator, WarmCell};

/// The new value a warm cell takes on when the current transaction commits.
///
/// "No update" (`Option::None` at the use site) and an update to a value
/// equal to the old one are different things: only the former leaves
/// dependents untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Update<V>(V);

impl<V> Update<V> {
    pub fn new(value: V) -> Self {
        Self(value)
    }

    pub fn value(&self) -> &V {
        &self.0
    }

    pub fn into_value(self) -> V {
        self.0
    }

    pub fn map<U>(&self, transform: impl FnOnce(&V) -> U) -> Update<U> {
        Update(transform(&self.0))
    }
}

/// Listener on a warm cell vertex.
pub type Observer<V> = dyn Listener<Update<V>>;

/// A cell vertex that can never change.
pub trait FrozenCellVertex<V> {
    /// The constant value, computed lazily for derived vertices.
    fn old_value(&self, tx: &mut Transaction) -> V;
}

/// A cell vertex that may change in a transaction.
pub trait WarmCellVertex<V> {
    fn id(&self) -> VertexId;

    /// The update exposed in the current transaction, if any.
    fn ongoing_update(&self) -> Option<Update<V>>;

    /// The value from before the current transaction.
    fn old_value(&self, tx: &mut Transaction) -> V;

    /// Register an observer. Registering the first observer of a
    /// demand-driven vertex activates it.
    fn register_observer(&self, tx: &mut Transaction, observer: Rc<Observer<V>>) -> ListenerHandle;

    /// Unregister an observer. Removing the last observer of a
    /// demand-driven vertex deactivates it.
    ///
    /// # Panics
    ///
    /// Panics if `handle` was not issued by this vertex or was already used.
    fn unregister_observer(&self, handle: ListenerHandle);

    fn observer_count(&self) -> usize;
}

/// A vertex of the cell family.
pub enum CellVertex<V> {
    Frozen(Rc<dyn FrozenCellVertex<V>>),
    Warm(Rc<dyn WarmCellVertex<V>>),
}

impl<V: Clone + 'static> CellVertex<V> {
    pub fn id(&self) -> VertexId {
        match self {
            CellVertex::Frozen(vertex) => VertexId::of(vertex),
            CellVertex::Warm(vertex) => vertex.id(),
        }
    }

    pub fn is_frozen(&self) -> bool {
        matches!(self, CellVertex::Frozen(_))
    }

    /// Whether both refer to the same vertex.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }

    pub fn ongoing_update(&self) -> Option<Update<V>> {
        match self {
            CellVertex::Frozen(_) => None,
            CellVertex::Warm(vertex) => vertex.ongoing_update(),
        }
    }

    pub fn old_value(&self, tx: &mut Transaction) -> V {
        match self {
            CellVertex::Frozen(vertex) => vertex.old_value(tx),
            CellVertex::Warm(vertex) => vertex.old_value(tx),
        }
    }

    /// The value after the current transaction: the in-flight update if
    /// there is one, the old value otherwise.
    pub fn new_value(&self, tx: &mut Transaction) -> V {
        match self.ongoing_update() {
            Some(update) => update.into_value(),
            None => self.old_value(tx),
        }
    }

    pub fn register_observer(&self, tx: &mut Transaction, observer: Rc<Observer<V>>) -> ListenerHandle {
        match self {
            CellVertex::Frozen(_) => ListenerHandle::detached(),
            CellVertex::Warm(vertex) => vertex.register_observer(tx, observer),
        }
    }

    pub fn unregister_observer(&self, handle: ListenerHandle) {
        match self {
            CellVertex::Frozen(_) => handle.into_detached(),
            CellVertex::Warm(vertex) => vertex.unregister_observer(handle),
        }
    }
}

impl<V> Clone for CellVertex<V> {
    fn clone(&self) -> Self {
        match self {
            CellVertex::Frozen(vertex) => CellVertex::Frozen(vertex.clone()),
            CellVertex::Warm(vertex) => CellVertex::Warm(vertex.clone()),
        }
    }
}

impl<V: Clone + 'static> fmt::Debug for CellVertex<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = if self.is_frozen() { "Frozen" } else { "Warm" };
        f.debug_tuple(kind).field(&self.id()).finish()
    }
}

impl<V: Clone + 'static> Observable<Update<V>> for CellVertex<V> {
    fn register_listener(&self, tx: &mut Transaction, listener: Rc<Observer<V>>) -> ListenerHandle {
        self.register_observer(tx, listener)
    }

    fn unregister_listener(&self, handle: ListenerHandle) {
        self.unregister_observer(handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::*;

    #[test]
    fn constant_hands_out_detached_handles() {
        let constant = CellVertex::Frozen(PureCell::new(1));
        let handle = sample(|tx| constant.register_observer(tx, Recorder::<Update<i32>>::new()));

        assert!(handle.is_detached());
        constant.unregister_observer(handle);
    }

    #[test]
    #[should_panic(expected = "returned to a vertex without listeners")]
    fn registered_handle_returned_to_a_constant_panics() {
        let input = InputCell::new(1);
        let handle = sample(|tx| input.vertex().register_observer(tx, Recorder::<Update<i32>>::new()));

        CellVertex::Frozen(PureCell::new(1)).unregister_observer(handle);
    }
}
