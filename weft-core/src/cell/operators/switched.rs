//! `switch`: flatten a cell of cells.
//!
//! The switched cell follows whichever inner cell the outer cell currently
//! holds. While the outer cell is updating, the vertex listens to the inner
//! cell it is switching to; the inner cell it is switching away from is
//! ignored, even if it updates in the same transaction.

use std::cell::RefCell;
use std::rc::Rc;

use crate::cell::{CachePolicy, CellOperator, CellVertex, Observer, Update, WarmCell};
use crate::graph::{Lifecycle, ListenerFn, ListenerHandle};
use crate::reactive::Cell;
use crate::transaction::Transaction;

pub(crate) struct Switched<V> {
    outer: CellVertex<Cell<V>>,
    state: RefCell<Option<Switch<V>>>,
}

/// Connections of an active switched vertex.
struct Switch<V> {
    outer_handle: ListenerHandle,
    /// Inner vertex held by the outer cell before this transaction.
    stable_inner: CellVertex<V>,
    /// Inner vertex the outer cell is switching to in this transaction.
    updated_inner: Option<CellVertex<V>>,
    /// Registration on `updated_inner`, or on `stable_inner` if there is none.
    inner_handle: Option<ListenerHandle>,
}

impl<V> Switch<V> {
    fn listened_inner(&self) -> &CellVertex<V> {
        self.updated_inner.as_ref().unwrap_or(&self.stable_inner)
    }
}

impl<V: Clone + 'static> Switched<V> {
    pub fn vertex(outer: CellVertex<Cell<V>>) -> Rc<WarmCell<V, Self>> {
        WarmCell::new(Self {
            outer,
            state: RefCell::new(None),
        })
    }

    fn inner_observer(vertex: &WarmCell<V, Self>) -> Rc<Observer<V>> {
        ListenerFn::strong(vertex.rc(), Self::on_inner_update)
    }

    fn set_inner_handle(&self, handle: ListenerHandle) {
        let mut state = self.state.borrow_mut();
        let state = state.as_mut().expect("switched cell vertex is not active");
        debug_assert!(state.inner_handle.is_none());
        state.inner_handle = Some(handle);
    }

    fn on_outer_update(vertex: &WarmCell<V, Self>, tx: &mut Transaction, update: Option<&Update<Cell<V>>>) {
        match update {
            Some(update) => Self::switch_to(vertex, tx, update.value().vertex().clone()),
            None => Self::switch_back(vertex, tx),
        }
    }

    fn switch_to(vertex: &WarmCell<V, Self>, tx: &mut Transaction, new_inner: CellVertex<V>) {
        let op = vertex.op();
        let (previous, handle) = {
            let mut state = op.state.borrow_mut();
            let state = state.as_mut().expect("switched cell vertex is not active");
            let previous = state.listened_inner().clone();
            if previous.ptr_eq(&new_inner) {
                return;
            }
            state.updated_inner = Some(new_inner.clone());
            (previous, state.inner_handle.take())
        };

        if let Some(handle) = handle {
            previous.unregister_observer(handle);
        }
        op.set_inner_handle(new_inner.register_observer(tx, Self::inner_observer(vertex)));

        let value = new_inner.new_value(tx);
        vertex.expose_and_propagate_update(tx, Some(Update::new(value)));
    }

    fn switch_back(vertex: &WarmCell<V, Self>, tx: &mut Transaction) {
        let op = vertex.op();
        let (updated, handle, stable) = {
            let mut state = op.state.borrow_mut();
            let state = state.as_mut().expect("switched cell vertex is not active");
            let Some(updated) = state.updated_inner.take() else {
                // The revoked update pointed at the inner cell already followed.
                return;
            };
            (updated, state.inner_handle.take(), state.stable_inner.clone())
        };

        if let Some(handle) = handle {
            updated.unregister_observer(handle);
        }
        op.set_inner_handle(stable.register_observer(tx, Self::inner_observer(vertex)));

        vertex.expose_and_propagate_update(tx, stable.ongoing_update());
    }

    fn on_inner_update(vertex: &WarmCell<V, Self>, tx: &mut Transaction, update: Option<&Update<V>>) {
        let update = match update {
            Some(update) => Some(update.clone()),
            None => {
                let updated = vertex
                    .op()
                    .state
                    .borrow()
                    .as_ref()
                    .and_then(|state| state.updated_inner.clone());
                // Still switching: the value changes to the new inner cell's
                // old value even though that cell stopped updating.
                updated.map(|updated| Update::new(updated.old_value(tx)))
            }
        };
        vertex.expose_and_propagate_update(tx, update);
    }
}

impl<V: Clone + 'static> CellOperator<V> for Switched<V> {
    const CACHE: CachePolicy = CachePolicy::Uncached;
    const LIFECYCLE: Lifecycle = Lifecycle::DemandDriven;

    fn activate(vertex: &WarmCell<V, Self>, tx: &mut Transaction) -> Option<Update<V>> {
        let op = vertex.op();
        assert!(op.state.borrow().is_none(), "switched cell vertex is already active");

        let outer_handle = op
            .outer
            .register_observer(tx, ListenerFn::strong(vertex.rc(), Self::on_outer_update));

        let stable_inner = op.outer.old_value(tx).vertex().clone();
        let updated_inner = op
            .outer
            .ongoing_update()
            .map(|update| update.value().vertex().clone())
            .filter(|updated| !updated.ptr_eq(&stable_inner));

        let listened = updated_inner.clone().unwrap_or_else(|| stable_inner.clone());
        let inner_handle = listened.register_observer(tx, Self::inner_observer(vertex));

        let update = match &updated_inner {
            Some(updated) => Some(Update::new(updated.new_value(tx))),
            None => stable_inner.ongoing_update(),
        };

        *op.state.borrow_mut() = Some(Switch {
            outer_handle,
            stable_inner,
            updated_inner,
            inner_handle: Some(inner_handle),
        });

        update
    }

    fn deactivate(vertex: &WarmCell<V, Self>) {
        let op = vertex.op();
        let state = op.state.borrow_mut().take();
        let Some(Switch {
            outer_handle,
            stable_inner,
            updated_inner,
            inner_handle,
        }) = state
        else {
            panic!("switched cell vertex is not active");
        };

        op.outer.unregister_observer(outer_handle);
        if let Some(handle) = inner_handle {
            updated_inner.unwrap_or(stable_inner).unregister_observer(handle);
        }
    }

    fn compute_old_value(vertex: &WarmCell<V, Self>, tx: &mut Transaction) -> V {
        let op = vertex.op();
        let stable = op.state.borrow().as_ref().map(|state| state.stable_inner.clone());
        match stable {
            Some(stable) => stable.old_value(tx),
            None => op.outer.old_value(tx).vertex().old_value(tx),
        }
    }

    fn transit(vertex: &WarmCell<V, Self>, _update: Option<&Update<V>>) {
        let replaced = {
            let mut state = vertex.op().state.borrow_mut();
            match state.as_mut() {
                Some(state) => state
                    .updated_inner
                    .take()
                    .map(|updated| std::mem::replace(&mut state.stable_inner, updated)),
                None => None,
            }
        };
        drop(replaced);
    }
}
