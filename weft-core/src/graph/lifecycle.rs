//! Lifelines and weak registration.
//!
//! A vertex that subscribes to its source at construction (a held cell, a
//! `map_at` cell, a one-shot stream) must not be kept alive by that source.
//! It registers a listener that references it weakly, and owns a [`Lifeline`]
//! whose end unregisters that listener again. Listeners whose target is
//! already gone report themselves unreachable and are purged by the source
//! on its next propagation, so nothing has to scan for them.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use super::{Bag, BagHandle, ListenerFn, Observable};
use crate::transaction::Transaction;

type Finalizer = Box<dyn FnOnce()>;

/// Finalization callbacks bound to the lifetime of their owner.
///
/// When the lifeline is dropped every callback still registered runs once,
/// newest first.
pub(crate) struct Lifeline {
    finalizers: Rc<RefCell<Bag<Finalizer>>>,
}

impl Lifeline {
    pub fn new() -> Self {
        Self {
            finalizers: Rc::new(RefCell::new(Bag::new())),
        }
    }

    /// Run `callback` when this lifeline ends, unless the returned handle is
    /// disarmed first.
    pub fn on_end(&self, callback: impl FnOnce() + 'static) -> FinalizationHandle {
        let slot = self.finalizers.borrow_mut().insert(Box::new(callback));
        FinalizationHandle {
            finalizers: Rc::downgrade(&self.finalizers),
            slot,
        }
    }
}

impl Drop for Lifeline {
    fn drop(&mut self) {
        let finalizers = self.finalizers.borrow_mut().drain();
        if !finalizers.is_empty() {
            tracing::trace!(count = finalizers.len(), "lifeline ended, running finalizers");
        }
        for finalize in finalizers {
            finalize();
        }
    }
}

/// Disarms one finalization callback.
pub(crate) struct FinalizationHandle {
    finalizers: Weak<RefCell<Bag<Finalizer>>>,
    slot: BagHandle,
}

impl FinalizationHandle {
    pub fn disarm(self) {
        if let Some(finalizers) = self.finalizers.upgrade() {
            let removed = finalizers.borrow_mut().try_remove(self.slot);
            drop(removed);
        }
    }
}

/// A listener registered through [`register_weakly`].
///
/// Dropping the registration leaves the listener in place; it is removed
/// either by [`cancel`](WeakRegistration::cancel) or when the dependent's
/// lifeline ends.
pub(crate) struct WeakRegistration {
    unregister: Rc<RefCell<Option<Box<dyn FnOnce()>>>>,
    finalization: FinalizationHandle,
}

impl WeakRegistration {
    /// Unregister now and disarm the finalization callback.
    pub fn cancel(self) {
        let unregister = self.unregister.borrow_mut().take();
        if let Some(unregister) = unregister {
            unregister();
        }
        self.finalization.disarm();
    }
}

/// Register `notify` on `source`, holding `target` only weakly.
///
/// The listener is unregistered when `lifeline` ends. `lifeline` is normally
/// owned by `target` itself; a one-shot dependent may instead cancel the
/// returned registration on its own terms.
pub(crate) fn register_weakly<S, P, T>(
    source: &S,
    tx: &mut Transaction,
    lifeline: &Lifeline,
    target: &Rc<T>,
    notify: fn(&T, &mut Transaction, Option<&P>),
) -> WeakRegistration
where
    S: Observable<P> + Clone + 'static,
    P: 'static,
    T: 'static,
{
    let handle = source.register_listener(tx, ListenerFn::weak(target, notify));

    let unregister: Rc<RefCell<Option<Box<dyn FnOnce()>>>> = {
        let source = source.clone();
        Rc::new(RefCell::new(Some(Box::new(move || source.unregister_listener(handle)))))
    };

    let finalization = {
        let unregister = unregister.clone();
        lifeline.on_end(move || {
            let pending = unregister.borrow_mut().take();
            if let Some(unregister) = pending {
                unregister();
            }
        })
    };

    WeakRegistration {
        unregister,
        finalization,
    }
}
