//! The generic live stream vertex.

use std::cell::{Cell as StdCell, RefCell};
use std::rc::{Rc, Weak};

use super::{Emission, LiveStreamVertex, Subscriber};
use crate::graph::{Committable, Lifecycle, ListenerHandle, Listeners, VertexId};
use crate::transaction::Transaction;

/// The behavior of one kind of live stream.
pub(crate) trait StreamOperator<E: Clone + 'static>: Sized + 'static {
    const LIFECYCLE: Lifecycle;

    /// Connect to the sources and return the emission to expose right away.
    fn activate(vertex: &LiveStream<E, Self>, tx: &mut Transaction) -> Option<Emission<E>> {
        let _ = (vertex, tx);
        None
    }

    fn deactivate(vertex: &LiveStream<E, Self>) {
        let _ = vertex;
    }

    /// Operator-specific commit step; `emission` is what was in flight.
    fn transit(vertex: &LiveStream<E, Self>, emission: Option<&Emission<E>>) {
        let _ = (vertex, emission);
    }
}

/// A live stream vertex driven by the operator `Op`.
pub(crate) struct LiveStream<E, Op> {
    op: Op,
    this: Weak<Self>,
    subscribers: Listeners<Emission<E>>,
    ongoing_emission: RefCell<Option<Emission<E>>>,
    enqueued: StdCell<bool>,
}

impl<E: Clone + 'static, Op: StreamOperator<E>> LiveStream<E, Op> {
    pub fn new(op: Op) -> Rc<Self> {
        Self::new_cyclic(|_| op)
    }

    /// Build a vertex whose operator needs a weak pointer to it.
    pub fn new_cyclic(op: impl FnOnce(&Weak<Self>) -> Op) -> Rc<Self> {
        Rc::new_cyclic(|this| Self {
            op: op(this),
            this: this.clone(),
            subscribers: Listeners::new(),
            ongoing_emission: RefCell::new(None),
            enqueued: StdCell::new(false),
        })
    }

    pub fn op(&self) -> &Op {
        &self.op
    }

    pub fn rc(&self) -> Rc<Self> {
        self.this
            .upgrade()
            .expect("live stream vertex used while being dropped")
    }

    pub fn expose_emission(&self, tx: &mut Transaction, emission: Option<Emission<E>>) {
        let previous = self.ongoing_emission.replace(emission);
        drop(previous);
        self.ensure_enqueued(tx);
    }

    pub fn expose_and_propagate_emission(&self, tx: &mut Transaction, emission: Option<Emission<E>>) {
        self.expose_emission(tx, emission.clone());
        if self.subscribers.notify_all(tx, emission.as_ref()) {
            self.on_last_subscriber_lost();
        }
    }

    /// Make sure the vertex commits even if it never exposes anything.
    pub fn ensure_enqueued(&self, tx: &mut Transaction) {
        if !self.enqueued.get() {
            tx.enqueue_for_commitment(self.rc());
            self.enqueued.set(true);
        }
    }

    fn on_last_subscriber_lost(&self) {
        if Op::LIFECYCLE == Lifecycle::DemandDriven {
            tracing::trace!(vertex = ?self.id(), "deactivating stream vertex");
            Op::deactivate(self);
            let cleared = self.ongoing_emission.replace(None);
            drop(cleared);
        }
    }
}

impl<E: Clone + 'static, Op: StreamOperator<E>> LiveStreamVertex<E> for LiveStream<E, Op> {
    fn id(&self) -> VertexId {
        VertexId::of_ref(self)
    }

    fn ongoing_emission(&self) -> Option<Emission<E>> {
        self.ongoing_emission.borrow().clone()
    }

    fn register_subscriber(&self, tx: &mut Transaction, subscriber: Rc<Subscriber<E>>) -> ListenerHandle {
        let (slot, first) = self.subscribers.add(subscriber);

        if first && Op::LIFECYCLE == Lifecycle::DemandDriven {
            tracing::trace!(vertex = ?self.id(), "activating stream vertex");
            if let Some(emission) = Op::activate(self, tx) {
                self.expose_emission(tx, Some(emission));
            }
        }

        ListenerHandle::registered(self.id(), slot)
    }

    fn unregister_subscriber(&self, handle: ListenerHandle) {
        let slot = handle.into_slot(self.id());
        if self.subscribers.remove(slot) {
            self.on_last_subscriber_lost();
        }
    }

    fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}

impl<E: Clone + 'static, Op: StreamOperator<E>> Committable for LiveStream<E, Op> {
    fn commit(&self) {
        let emission = self.ongoing_emission.replace(None);
        Op::transit(self, emission.as_ref());
        self.enqueued.set(false);
    }

    fn abandon(&self) {
        self.ongoing_emission.replace(None);
        self.enqueued.set(false);
    }
}
