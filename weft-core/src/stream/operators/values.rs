//! `values`: the stream of a cell's new values.
//!
//! In the transaction that spawns it the stream emits the cell's current
//! value, so subscribers start from a known state. Afterwards it emits each
//! update. The spawning case matters for revocations: a cell update revoked
//! while spawning falls back to emitting the cell's old value.

use std::cell::{Cell as StdCell, RefCell};
use std::rc::Rc;

use crate::cell::{CellVertex, Update};
use crate::graph::{Lifecycle, ListenerFn, ListenerHandle};
use crate::stream::{Emission, LiveStream, StreamOperator};
use crate::transaction::Transaction;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Spawning,
    Spawned,
}

pub(crate) struct Values<V> {
    source: CellVertex<V>,
    phase: StdCell<Phase>,
    upstream: RefCell<Option<ListenerHandle>>,
}

impl<V: Clone + 'static> Values<V> {
    pub fn spawn(tx: &mut Transaction, source: CellVertex<V>) -> Rc<LiveStream<V, Self>> {
        let vertex = LiveStream::new(Self {
            source,
            phase: StdCell::new(Phase::Spawning),
            upstream: RefCell::new(None),
        });
        // Commit at the end of this transaction even if nothing subscribes,
        // so the phase moves on.
        vertex.ensure_enqueued(tx);
        vertex
    }

    fn on_source_update(vertex: &LiveStream<V, Self>, tx: &mut Transaction, update: Option<&Update<V>>) {
        let op = vertex.op();
        let emission = match update {
            Some(update) => Some(Emission::new(update.value().clone())),
            None => match op.phase.get() {
                Phase::Spawning => Some(Emission::new(op.source.old_value(tx))),
                Phase::Spawned => None,
            },
        };
        vertex.expose_and_propagate_emission(tx, emission);
    }
}

impl<V: Clone + 'static> StreamOperator<V> for Values<V> {
    const LIFECYCLE: Lifecycle = Lifecycle::DemandDriven;

    fn activate(vertex: &LiveStream<V, Self>, tx: &mut Transaction) -> Option<Emission<V>> {
        let op = vertex.op();
        assert!(op.upstream.borrow().is_none(), "values stream vertex is already active");

        let handle = op
            .source
            .register_observer(tx, ListenerFn::strong(vertex.rc(), Self::on_source_update));
        *op.upstream.borrow_mut() = Some(handle);

        match op.phase.get() {
            Phase::Spawning => Some(Emission::new(op.source.new_value(tx))),
            Phase::Spawned => op
                .source
                .ongoing_update()
                .map(|update| Emission::new(update.into_value())),
        }
    }

    fn deactivate(vertex: &LiveStream<V, Self>) {
        let op = vertex.op();
        let handle = op.upstream.borrow_mut().take();
        match handle {
            Some(handle) => op.source.unregister_observer(handle),
            None => panic!("values stream vertex is not active"),
        }
    }

    fn transit(vertex: &LiveStream<V, Self>, _emission: Option<&Emission<V>>) {
        vertex.op().phase.set(Phase::Spawned);
    }
}
