//! `map2`: combine two cells, either of which may be frozen.

use std::cell::RefCell;
use std::rc::Rc;

use crate::cell::{CachePolicy, CellOperator, CellVertex, Update, WarmCell};
use crate::graph::{Lifecycle, ListenerFn, ListenerHandle};
use crate::transaction::Transaction;

pub(crate) struct Mapped2<A, B, V> {
    first: CellVertex<A>,
    second: CellVertex<B>,
    transform: Box<dyn Fn(&A, &B) -> V>,
    upstream: RefCell<Option<(ListenerHandle, ListenerHandle)>>,
}

impl<A, B, V> Mapped2<A, B, V>
where
    A: Clone + 'static,
    B: Clone + 'static,
    V: Clone + 'static,
{
    pub fn vertex(
        first: CellVertex<A>,
        second: CellVertex<B>,
        transform: impl Fn(&A, &B) -> V + 'static,
    ) -> Rc<WarmCell<V, Self>> {
        WarmCell::new(Self {
            first,
            second,
            transform: Box::new(transform),
            upstream: RefCell::new(None),
        })
    }

    /// The combined update, present if either source is updating. A source
    /// that is not updating contributes its old value.
    fn build_update(&self, tx: &mut Transaction) -> Option<Update<V>> {
        if self.first.ongoing_update().is_none() && self.second.ongoing_update().is_none() {
            return None;
        }
        let first = self.first.new_value(tx);
        let second = self.second.new_value(tx);
        Some(Update::new((self.transform)(&first, &second)))
    }

    fn on_source_update<S>(vertex: &WarmCell<V, Self>, tx: &mut Transaction, _update: Option<&Update<S>>) {
        let update = vertex.op().build_update(tx);
        vertex.expose_and_propagate_update(tx, update);
    }
}

impl<A, B, V> CellOperator<V> for Mapped2<A, B, V>
where
    A: Clone + 'static,
    B: Clone + 'static,
    V: Clone + 'static,
{
    const CACHE: CachePolicy = CachePolicy::Momentary;
    const LIFECYCLE: Lifecycle = Lifecycle::DemandDriven;

    fn activate(vertex: &WarmCell<V, Self>, tx: &mut Transaction) -> Option<Update<V>> {
        let op = vertex.op();
        assert!(op.upstream.borrow().is_none(), "mapped cell vertex is already active");

        let first = op
            .first
            .register_observer(tx, ListenerFn::strong(vertex.rc(), Self::on_source_update::<A>));
        let second = op
            .second
            .register_observer(tx, ListenerFn::strong(vertex.rc(), Self::on_source_update::<B>));
        *op.upstream.borrow_mut() = Some((first, second));

        op.build_update(tx)
    }

    fn deactivate(vertex: &WarmCell<V, Self>) {
        let op = vertex.op();
        let handles = op.upstream.borrow_mut().take();
        let Some((first, second)) = handles else {
            panic!("mapped cell vertex is not active");
        };
        op.first.unregister_observer(first);
        op.second.unregister_observer(second);
    }

    fn compute_old_value(vertex: &WarmCell<V, Self>, tx: &mut Transaction) -> V {
        let op = vertex.op();
        let first = op.first.old_value(tx);
        let second = op.second.old_value(tx);
        (op.transform)(&first, &second)
    }
}
