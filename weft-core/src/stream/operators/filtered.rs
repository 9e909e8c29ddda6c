//! `filter` over a live stream.

use std::cell::RefCell;
use std::rc::Rc;

use crate::graph::{Lifecycle, ListenerFn, ListenerHandle};
use crate::stream::{Emission, LiveStream, LiveStreamVertex, StreamOperator};
use crate::transaction::Transaction;

pub(crate) struct Filtered<E> {
    source: Rc<dyn LiveStreamVertex<E>>,
    predicate: Box<dyn Fn(&E) -> bool>,
    upstream: RefCell<Option<ListenerHandle>>,
}

impl<E: Clone + 'static> Filtered<E> {
    pub fn vertex(source: Rc<dyn LiveStreamVertex<E>>, predicate: impl Fn(&E) -> bool + 'static) -> Rc<LiveStream<E, Self>> {
        LiveStream::new(Self {
            source,
            predicate: Box::new(predicate),
            upstream: RefCell::new(None),
        })
    }

    fn accepts(&self, emission: &Emission<E>) -> bool {
        (self.predicate)(emission.event())
    }

    fn on_source_emission(vertex: &LiveStream<E, Self>, tx: &mut Transaction, emission: Option<&Emission<E>>) {
        match emission {
            Some(emission) if vertex.op().accepts(emission) => {
                vertex.expose_and_propagate_emission(tx, Some(emission.clone()));
            }
            // Rejected or revoked: take back whatever passed earlier in this
            // transaction, stay silent otherwise.
            _ => {
                if vertex.ongoing_emission().is_some() {
                    vertex.expose_and_propagate_emission(tx, None);
                }
            }
        }
    }
}

impl<E: Clone + 'static> StreamOperator<E> for Filtered<E> {
    const LIFECYCLE: Lifecycle = Lifecycle::DemandDriven;

    fn activate(vertex: &LiveStream<E, Self>, tx: &mut Transaction) -> Option<Emission<E>> {
        let op = vertex.op();
        assert!(op.upstream.borrow().is_none(), "filtered stream vertex is already active");

        let handle = op
            .source
            .register_subscriber(tx, ListenerFn::strong(vertex.rc(), Self::on_source_emission));
        *op.upstream.borrow_mut() = Some(handle);

        op.source.ongoing_emission().filter(|emission| op.accepts(emission))
    }

    fn deactivate(vertex: &LiveStream<E, Self>) {
        let op = vertex.op();
        let handle = op.upstream.borrow_mut().take();
        match handle {
            Some(handle) => op.source.unregister_subscriber(handle),
            None => panic!("filtered stream vertex is not active"),
        }
    }
}
