//! Frozen cell vertices.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use super::FrozenCellVertex;
use crate::graph::Committable;
use crate::transaction::Transaction;

/// A constant.
pub(crate) struct PureCell<V> {
    value: V,
}

impl<V> PureCell<V> {
    pub fn new(value: V) -> Rc<Self> {
        Rc::new(Self { value })
    }
}

impl<V: Clone> FrozenCellVertex<V> for PureCell<V> {
    fn old_value(&self, _tx: &mut Transaction) -> V {
        self.value.clone()
    }
}

/// A constant derived from other frozen vertices.
///
/// The value is recomputed on demand and cached only for the rest of the
/// transaction that needed it.
pub(crate) struct DerivedFrozenCell<V> {
    this: Weak<Self>,
    compute: Box<dyn Fn(&mut Transaction) -> V>,
    cache: RefCell<Option<V>>,
}

impl<V: Clone + 'static> DerivedFrozenCell<V> {
    pub fn new(compute: impl Fn(&mut Transaction) -> V + 'static) -> Rc<Self> {
        Rc::new_cyclic(|this| Self {
            this: this.clone(),
            compute: Box::new(compute),
            cache: RefCell::new(None),
        })
    }
}

impl<V: Clone + 'static> FrozenCellVertex<V> for DerivedFrozenCell<V> {
    fn old_value(&self, tx: &mut Transaction) -> V {
        let cached = self.cache.borrow().clone();
        if let Some(value) = cached {
            return value;
        }

        let value = (self.compute)(tx);
        *self.cache.borrow_mut() = Some(value.clone());
        if let Some(this) = self.this.upgrade() {
            tx.enqueue_for_commitment(this);
        }
        value
    }
}

impl<V> Committable for DerivedFrozenCell<V> {
    fn commit(&self) {
        self.cache.borrow_mut().take();
    }

    fn abandon(&self) {
        self.commit();
    }
}
