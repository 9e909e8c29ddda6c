//! `map_at`: a stateful mapping whose transform may sample other cells.
//!
//! Unlike `map`, the transform runs once per source update, at the moment
//! of the update, and its result becomes stable state.

use std::rc::Rc;

use crate::cell::{CachePolicy, CellOperator, CellVertex, Update, WarmCell, WarmCellVertex};
use crate::graph::{register_weakly, Lifecycle, Lifeline};
use crate::transaction::Transaction;

type Transform<S, V> = Box<dyn Fn(&mut Transaction, &S) -> V>;

pub(crate) struct MappedAt<S, V> {
    source: CellVertex<S>,
    transform: Transform<S, V>,
    lifeline: Lifeline,
}

impl<S: Clone + 'static, V: Clone + 'static> MappedAt<S, V> {
    pub fn spawn(
        tx: &mut Transaction,
        source: Rc<dyn WarmCellVertex<S>>,
        transform: impl Fn(&mut Transaction, &S) -> V + 'static,
    ) -> Rc<WarmCell<V, Self>> {
        let old_value = source.old_value(tx);
        let initial = transform(tx, &old_value);
        let vertex = WarmCell::new_stateful(
            initial,
            Self {
                source: CellVertex::Warm(source),
                transform: Box::new(transform),
                lifeline: Lifeline::new(),
            },
        );

        let op = vertex.op();
        let _ = register_weakly(&op.source, tx, &op.lifeline, &vertex, Self::on_source_update);

        if let Some(update) = op.source.ongoing_update() {
            let value = (op.transform)(tx, update.value());
            vertex.expose_update(tx, Some(Update::new(value)));
        }

        vertex
    }

    fn on_source_update(vertex: &WarmCell<V, Self>, tx: &mut Transaction, update: Option<&Update<S>>) {
        let update = match update {
            Some(update) => Some(Update::new((vertex.op().transform)(tx, update.value()))),
            None => None,
        };
        vertex.expose_and_propagate_update(tx, update);
    }
}

impl<S: Clone + 'static, V: Clone + 'static> CellOperator<V> for MappedAt<S, V> {
    const CACHE: CachePolicy = CachePolicy::Active;
    const LIFECYCLE: Lifecycle = Lifecycle::Autonomous;
}
