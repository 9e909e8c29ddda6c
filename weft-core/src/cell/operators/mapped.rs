//! `map` over a warm cell.

use std::cell::RefCell;
use std::rc::Rc;

use crate::cell::{CachePolicy, CellOperator, Update, WarmCell, WarmCellVertex};
use crate::graph::{Lifecycle, ListenerFn, ListenerHandle};
use crate::transaction::Transaction;

pub(crate) struct Mapped<S, V> {
    source: Rc<dyn WarmCellVertex<S>>,
    transform: Box<dyn Fn(&S) -> V>,
    upstream: RefCell<Option<ListenerHandle>>,
}

impl<S: Clone + 'static, V: Clone + 'static> Mapped<S, V> {
    pub fn vertex(source: Rc<dyn WarmCellVertex<S>>, transform: impl Fn(&S) -> V + 'static) -> Rc<WarmCell<V, Self>> {
        WarmCell::new(Self {
            source,
            transform: Box::new(transform),
            upstream: RefCell::new(None),
        })
    }

    fn on_source_update(vertex: &WarmCell<V, Self>, tx: &mut Transaction, update: Option<&Update<S>>) {
        let transform = &vertex.op().transform;
        let update = update.map(|update| update.map(|value| transform(value)));
        vertex.expose_and_propagate_update(tx, update);
    }
}

impl<S: Clone + 'static, V: Clone + 'static> CellOperator<V> for Mapped<S, V> {
    const CACHE: CachePolicy = CachePolicy::Momentary;
    const LIFECYCLE: Lifecycle = Lifecycle::DemandDriven;

    fn activate(vertex: &WarmCell<V, Self>, tx: &mut Transaction) -> Option<Update<V>> {
        let op = vertex.op();
        assert!(op.upstream.borrow().is_none(), "mapped cell vertex is already active");

        let handle = op
            .source
            .register_observer(tx, ListenerFn::strong(vertex.rc(), Self::on_source_update));
        *op.upstream.borrow_mut() = Some(handle);

        op.source
            .ongoing_update()
            .map(|update| update.map(|value| (op.transform)(value)))
    }

    fn deactivate(vertex: &WarmCell<V, Self>) {
        let op = vertex.op();
        let handle = op.upstream.borrow_mut().take();
        match handle {
            Some(handle) => op.source.unregister_observer(handle),
            None => panic!("mapped cell vertex is not active"),
        }
    }

    fn compute_old_value(vertex: &WarmCell<V, Self>, tx: &mut Transaction) -> V {
        let op = vertex.op();
        (op.transform)(&op.source.old_value(tx))
    }
}
