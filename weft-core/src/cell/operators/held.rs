//! `hold`: a cell taking on each value its stream emits.

use std::rc::Rc;

use crate::cell::{CachePolicy, CellOperator, Update, WarmCell};
use crate::graph::{register_weakly, Lifecycle, Lifeline};
use crate::stream::{Emission, LiveStreamVertex, StreamVertex};
use crate::transaction::Transaction;

pub(crate) struct Held<V> {
    source: StreamVertex<V>,
    lifeline: Lifeline,
}

impl<V: Clone + 'static> Held<V> {
    /// Create the cell now and subscribe to `source` once the current
    /// transaction has finished propagating.
    ///
    /// Deferring the subscription lets `source` depend on the new cell, as
    /// in an accumulator.
    pub fn spawn(tx: &mut Transaction, source: Rc<dyn LiveStreamVertex<V>>, initial: V) -> Rc<WarmCell<V, Self>> {
        let vertex = WarmCell::new_stateful(
            initial,
            Self {
                source: StreamVertex::Live(source),
                lifeline: Lifeline::new(),
            },
        );

        let pending = vertex.clone();
        tx.enqueue_for_wrap_up(move |tx| Self::connect(&pending, tx));

        vertex
    }

    fn connect(vertex: &Rc<WarmCell<V, Self>>, tx: &mut Transaction) {
        let op = vertex.op();
        let _ = register_weakly(&op.source, tx, &op.lifeline, vertex, Self::on_source_emission);

        if let Some(emission) = op.source.ongoing_emission() {
            vertex.expose_and_propagate_update(tx, Some(Update::new(emission.into_event())));
        }
    }

    fn on_source_emission(vertex: &WarmCell<V, Self>, tx: &mut Transaction, emission: Option<&Emission<V>>) {
        let update = emission.map(|emission| Update::new(emission.event().clone()));
        vertex.expose_and_propagate_update(tx, update);
    }
}

impl<V: Clone + 'static> CellOperator<V> for Held<V> {
    const CACHE: CachePolicy = CachePolicy::Active;
    const LIFECYCLE: Lifecycle = Lifecycle::Autonomous;
}
