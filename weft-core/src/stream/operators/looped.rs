//! Forward reference to a stream defined later.

use std::cell::RefCell;
use std::rc::Rc;

use crate::graph::{Lifecycle, ListenerFn, ListenerHandle};
use crate::reactive::{EventStream, Looped};
use crate::stream::{Emission, LiveStream, StreamOperator, StreamVertex};
use crate::transaction::Transaction;

/// Passes on the emissions of the stream a [`Looped`] placeholder resolves
/// to. The placeholder is only read on activation, so the vertex can be
/// built before the stream it forwards exists.
pub(crate) struct LoopedForward<E> {
    target: Looped<EventStream<E>>,
    upstream: RefCell<Option<(StreamVertex<E>, ListenerHandle)>>,
}

impl<E: Clone + 'static> LoopedForward<E> {
    pub fn vertex(target: Looped<EventStream<E>>) -> Rc<LiveStream<E, Self>> {
        LiveStream::new(Self {
            target,
            upstream: RefCell::new(None),
        })
    }

    fn on_target_emission(vertex: &LiveStream<E, Self>, tx: &mut Transaction, emission: Option<&Emission<E>>) {
        vertex.expose_and_propagate_emission(tx, emission.cloned());
    }
}

impl<E: Clone + 'static> StreamOperator<E> for LoopedForward<E> {
    const LIFECYCLE: Lifecycle = Lifecycle::DemandDriven;

    fn activate(vertex: &LiveStream<E, Self>, tx: &mut Transaction) -> Option<Emission<E>> {
        let op = vertex.op();
        assert!(op.upstream.borrow().is_none(), "looped stream vertex is already active");

        let target = op.target.get().vertex().clone();
        let handle = target.register_subscriber(tx, ListenerFn::strong(vertex.rc(), Self::on_target_emission));
        let ongoing = target.ongoing_emission();
        *op.upstream.borrow_mut() = Some((target, handle));

        ongoing
    }

    fn deactivate(vertex: &LiveStream<E, Self>) {
        let upstream = vertex.op().upstream.borrow_mut().take();
        match upstream {
            Some((target, handle)) => target.unregister_subscriber(handle),
            None => panic!("looped stream vertex is not active"),
        }
    }
}
