//! The generic warm cell vertex.
//!
//! All warm cells share one implementation of the observer protocol and of
//! the commit cycle. What differs between them is captured by a
//! [`CellOperator`]: how the vertex connects to its sources, how it computes
//! its old value, and what it caches.
//!
//! # Caching
//!
//! | Policy      | Old value                                   |
//! |-------------|---------------------------------------------|
//! | `Uncached`  | recomputed on every read                    |
//! | `Momentary` | computed once per transaction, then dropped |
//! | `Active`    | stable state, replaced by the update on commit |

use std::cell::{Cell as StdCell, RefCell};
use std::rc::{Rc, Weak};

use super::{Observer, Update, WarmCellVertex};
use crate::graph::{Committable, Lifecycle, ListenerHandle, Listeners, VertexId};
use crate::transaction::Transaction;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CachePolicy {
    Uncached,
    Momentary,
    Active,
}

/// The behavior of one kind of warm cell.
pub(crate) trait CellOperator<V: Clone + 'static>: Sized + 'static {
    const CACHE: CachePolicy;

    const LIFECYCLE: Lifecycle;

    /// Connect to the sources and return the update to expose right away.
    ///
    /// Called when the first observer registers on a demand-driven vertex.
    fn activate(vertex: &WarmCell<V, Self>, tx: &mut Transaction) -> Option<Update<V>> {
        let _ = (vertex, tx);
        None
    }

    /// Disconnect from the sources. Called when the last observer leaves.
    fn deactivate(vertex: &WarmCell<V, Self>) {
        let _ = vertex;
    }

    /// The value from before the current transaction, when it is not cached.
    fn compute_old_value(vertex: &WarmCell<V, Self>, tx: &mut Transaction) -> V {
        let _ = tx;
        unreachable!("vertex {:?} keeps its stable value cached", vertex.id())
    }

    /// Operator-specific commit step; `update` is what was in flight.
    fn transit(vertex: &WarmCell<V, Self>, update: Option<&Update<V>>) {
        let _ = (vertex, update);
    }
}

/// A warm cell vertex driven by the operator `Op`.
pub(crate) struct WarmCell<V, Op> {
    // Declared first so that an operator's lifeline ends before the rest of
    // the vertex is torn down.
    op: Op,
    this: Weak<Self>,
    observers: Listeners<Update<V>>,
    ongoing_update: RefCell<Option<Update<V>>>,
    cache: RefCell<Option<V>>,
    enqueued: StdCell<bool>,
}

impl<V: Clone + 'static, Op: CellOperator<V>> WarmCell<V, Op> {
    /// A vertex without stable state.
    pub fn new(op: Op) -> Rc<Self> {
        Self::build(op, None)
    }

    /// A vertex whose stable value starts as `initial`.
    pub fn new_stateful(initial: V, op: Op) -> Rc<Self> {
        debug_assert_eq!(Op::CACHE, CachePolicy::Active);
        Self::build(op, Some(initial))
    }

    fn build(op: Op, cache: Option<V>) -> Rc<Self> {
        Rc::new_cyclic(|this| Self {
            op,
            this: this.clone(),
            observers: Listeners::new(),
            ongoing_update: RefCell::new(None),
            cache: RefCell::new(cache),
            enqueued: StdCell::new(false),
        })
    }

    pub fn op(&self) -> &Op {
        &self.op
    }

    pub fn rc(&self) -> Rc<Self> {
        self.this
            .upgrade()
            .expect("warm cell vertex used while being dropped")
    }

    /// The value after the current transaction.
    pub fn new_value(&self, tx: &mut Transaction) -> V {
        match self.ongoing_update() {
            Some(update) => update.into_value(),
            None => WarmCellVertex::old_value(self, tx),
        }
    }

    /// Set the in-flight update without notifying anyone.
    pub fn expose_update(&self, tx: &mut Transaction, update: Option<Update<V>>) {
        let previous = self.ongoing_update.replace(update);
        drop(previous);
        self.ensure_enqueued(tx);
    }

    /// Set the in-flight update and notify every observer.
    pub fn expose_and_propagate_update(&self, tx: &mut Transaction, update: Option<Update<V>>) {
        self.expose_update(tx, update.clone());
        if self.observers.notify_all(tx, update.as_ref()) {
            self.on_last_observer_lost();
        }
    }

    fn ensure_enqueued(&self, tx: &mut Transaction) {
        if !self.enqueued.get() {
            tx.enqueue_for_commitment(self.rc());
            self.enqueued.set(true);
        }
    }

    fn on_last_observer_lost(&self) {
        if Op::LIFECYCLE == Lifecycle::DemandDriven {
            tracing::trace!(vertex = ?self.id(), "deactivating cell vertex");
            Op::deactivate(self);
            let cleared = self.ongoing_update.replace(None);
            drop(cleared);
        }
    }
}

impl<V: Clone + 'static, Op: CellOperator<V>> WarmCellVertex<V> for WarmCell<V, Op> {
    fn id(&self) -> VertexId {
        VertexId::of_ref(self)
    }

    fn ongoing_update(&self) -> Option<Update<V>> {
        self.ongoing_update.borrow().clone()
    }

    fn old_value(&self, tx: &mut Transaction) -> V {
        let cached = self.cache.borrow().clone();
        if let Some(value) = cached {
            return value;
        }

        let value = Op::compute_old_value(self, tx);
        if Op::CACHE != CachePolicy::Uncached {
            *self.cache.borrow_mut() = Some(value.clone());
            self.ensure_enqueued(tx);
        }
        value
    }

    fn register_observer(&self, tx: &mut Transaction, observer: Rc<Observer<V>>) -> ListenerHandle {
        let (slot, first) = self.observers.add(observer);

        if first && Op::LIFECYCLE == Lifecycle::DemandDriven {
            tracing::trace!(vertex = ?self.id(), "activating cell vertex");
            if let Some(update) = Op::activate(self, tx) {
                self.expose_update(tx, Some(update));
            }
        }

        ListenerHandle::registered(self.id(), slot)
    }

    fn unregister_observer(&self, handle: ListenerHandle) {
        let slot = handle.into_slot(self.id());
        if self.observers.remove(slot) {
            self.on_last_observer_lost();
        }
    }

    fn observer_count(&self) -> usize {
        self.observers.len()
    }
}

impl<V: Clone + 'static, Op: CellOperator<V>> Committable for WarmCell<V, Op> {
    fn commit(&self) {
        let update = self.ongoing_update.replace(None);

        match Op::CACHE {
            CachePolicy::Uncached => {}
            CachePolicy::Momentary => {
                self.cache.replace(None);
            }
            CachePolicy::Active => {
                if let Some(update) = &update {
                    self.cache.replace(Some(update.value().clone()));
                }
            }
        }

        Op::transit(self, update.as_ref());
        self.enqueued.set(false);
    }

    fn abandon(&self) {
        self.ongoing_update.replace(None);
        if Op::CACHE == CachePolicy::Momentary {
            self.cache.replace(None);
        }
        self.enqueued.set(false);
    }
}
