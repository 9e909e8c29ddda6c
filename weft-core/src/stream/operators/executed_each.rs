//! `execute_each`: run every emitted action and emit its result.
//!
//! A running vertex keeps the revocation handle of the action it executed
//! last. A new emission revokes that action before executing the next one;
//! a revoked emission revokes it without replacement. Aborting stops
//! listening to the source and revokes the running action; restarting
//! listens again and executes the action the source is emitting right now,
//! if any.
//!
//! The vertex is registered strongly on its source, so a started stream
//! lives as long as its source does, or until it is aborted.

use std::cell::RefCell;
use std::rc::Rc;

use crate::graph::{Lifecycle, ListenerFn, ListenerHandle};
use crate::reactive::Action;
use crate::stream::{Emission, LiveStream, LiveStreamVertex, StreamOperator};
use crate::transaction::{RevocationHandle, Transaction};

pub(crate) struct ExecutedEach<E> {
    source: Rc<dyn LiveStreamVertex<Action<E>>>,
    upstream: RefCell<Option<ListenerHandle>>,
    running: RefCell<Option<RevocationHandle>>,
}

impl<E: Clone + 'static> ExecutedEach<E> {
    pub fn start(tx: &mut Transaction, source: Rc<dyn LiveStreamVertex<Action<E>>>) -> Rc<LiveStream<E, Self>> {
        let vertex = LiveStream::new(Self {
            source,
            upstream: RefCell::new(None),
            running: RefCell::new(None),
        });
        Self::connect(&vertex, tx);
        vertex
    }

    /// Stop consuming the source and revoke the running action.
    ///
    /// # Panics
    ///
    /// Panics if the vertex is already aborted.
    pub fn abort(vertex: &LiveStream<E, Self>, tx: &mut Transaction) {
        let op = vertex.op();
        op.revoke_running(tx);

        let handle = op.upstream.borrow_mut().take();
        match handle {
            Some(handle) => op.source.unregister_subscriber(handle),
            None => panic!("executed-each stream vertex is already aborted"),
        }
    }

    /// Resume consuming the source after [`abort`](Self::abort).
    ///
    /// # Panics
    ///
    /// Panics if the vertex is running.
    pub fn restart(vertex: &LiveStream<E, Self>, tx: &mut Transaction) {
        Self::connect(vertex, tx);
    }

    fn connect(vertex: &LiveStream<E, Self>, tx: &mut Transaction) {
        let op = vertex.op();
        assert!(op.upstream.borrow().is_none(), "executed-each stream vertex is already running");

        let handle = op
            .source
            .register_subscriber(tx, ListenerFn::strong(vertex.rc(), Self::on_source_emission));
        *op.upstream.borrow_mut() = Some(handle);

        if let Some(emission) = op.source.ongoing_emission() {
            let event = op.execute(tx, emission.event());
            vertex.expose_and_propagate_emission(tx, Some(Emission::new(event)));
        }
    }

    fn execute(&self, tx: &mut Transaction, action: &Action<E>) -> E {
        self.revoke_running(tx);
        let (event, revocation) = action.execute(tx);
        *self.running.borrow_mut() = Some(revocation);
        event
    }

    fn revoke_running(&self, tx: &mut Transaction) {
        let running = self.running.borrow_mut().take();
        if let Some(running) = running {
            running.revoke(tx);
        }
    }

    fn on_source_emission(vertex: &LiveStream<E, Self>, tx: &mut Transaction, emission: Option<&Emission<Action<E>>>) {
        let op = vertex.op();
        match emission {
            Some(emission) => {
                let event = op.execute(tx, emission.event());
                vertex.expose_and_propagate_emission(tx, Some(Emission::new(event)));
            }
            None => {
                let running = op.running.borrow_mut().take();
                running
                    .expect("revoked emission without an executed action")
                    .revoke(tx);
                vertex.expose_and_propagate_emission(tx, None);
            }
        }
    }
}

impl<E: Clone + 'static> StreamOperator<E> for ExecutedEach<E> {
    const LIFECYCLE: Lifecycle = Lifecycle::Autonomous;
}
