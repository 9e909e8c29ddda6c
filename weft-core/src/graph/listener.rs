//! Listeners
//!
//! A listener is notified whenever the vertex it is registered on exposes a
//! payload (an update or an emission) or revokes one it exposed earlier in
//! the same transaction. Cells and streams share this machinery; they only
//! differ in the payload type.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use smallvec::SmallVec;

use super::{Bag, BagHandle, VertexId};
use crate::transaction::Transaction;

/// Receiver of notifications from a single vertex.
///
/// `payload` is `None` when the vertex revoked what it exposed earlier in
/// the transaction.
pub trait Listener<P> {
    fn notify(&self, tx: &mut Transaction, payload: Option<&P>) -> ListenerStatus;
}

/// Whether a listener still wants notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerStatus {
    Reachable,
    /// The listener's target is gone; the vertex drops it immediately.
    Unreachable,
}

/// Wrap a closure as a strongly held listener.
pub fn listener<P, F>(notify: F) -> Rc<dyn Listener<P>>
where
    P: 'static,
    F: Fn(&mut Transaction, Option<&P>) + 'static,
{
    Rc::new(FnListener(notify))
}

struct FnListener<F>(F);

impl<P, F> Listener<P> for FnListener<F>
where
    F: Fn(&mut Transaction, Option<&P>),
{
    fn notify(&self, tx: &mut Transaction, payload: Option<&P>) -> ListenerStatus {
        (self.0)(tx, payload);
        ListenerStatus::Reachable
    }
}

/// Capability to unregister a listener.
///
/// Handles are issued by the vertex the listener was registered on and must
/// be returned to that same vertex. Frozen and terminated vertices hand out
/// detached handles, which they accept back as a no-op.
#[must_use = "a listener can only be unregistered with its handle"]
pub struct ListenerHandle {
    kind: HandleKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HandleKind {
    Detached,
    Registered { owner: VertexId, slot: BagHandle },
}

impl ListenerHandle {
    pub(crate) fn detached() -> Self {
        Self {
            kind: HandleKind::Detached,
        }
    }

    pub(crate) fn registered(owner: VertexId, slot: BagHandle) -> Self {
        Self {
            kind: HandleKind::Registered { owner, slot },
        }
    }

    /// Whether this handle came from a vertex that never notifies.
    pub fn is_detached(&self) -> bool {
        self.kind == HandleKind::Detached
    }

    /// Redeem the handle at the vertex `owner`.
    ///
    /// # Panics
    ///
    /// Panics if the handle was issued by another vertex or is detached.
    pub(crate) fn into_slot(self, owner: VertexId) -> BagHandle {
        match self.kind {
            HandleKind::Registered { owner: issuer, slot } if issuer == owner => slot,
            other => panic!("listener handle {other:?} was not issued by vertex {owner:?}"),
        }
    }

    /// Redeem the handle at a vertex that never registers listeners.
    pub(crate) fn into_detached(self) {
        if let HandleKind::Registered { owner, .. } = self.kind {
            panic!("listener handle of vertex {owner:?} returned to a vertex without listeners");
        }
    }
}

impl fmt::Debug for ListenerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerHandle").field("kind", &self.kind).finish()
    }
}

/// A vertex that accepts listeners for payloads of type `P`.
pub(crate) trait Observable<P> {
    fn register_listener(&self, tx: &mut Transaction, listener: Rc<dyn Listener<P>>) -> ListenerHandle;

    fn unregister_listener(&self, handle: ListenerHandle);
}

/// The listener set of one vertex.
pub(crate) struct Listeners<P> {
    bag: RefCell<Bag<Rc<dyn Listener<P>>>>,
}

impl<P> Listeners<P> {
    pub fn new() -> Self {
        Self {
            bag: RefCell::new(Bag::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.bag.borrow().len()
    }

    /// Add a listener. The flag is set when this is the first one.
    pub fn add(&self, listener: Rc<dyn Listener<P>>) -> (BagHandle, bool) {
        let mut bag = self.bag.borrow_mut();
        let slot = bag.insert(listener);
        (slot, bag.len() == 1)
    }

    /// Remove a listener. Returns whether the set is now empty.
    ///
    /// # Panics
    ///
    /// Panics if the listener was already removed.
    pub fn remove(&self, slot: BagHandle) -> bool {
        let (listener, now_empty) = {
            let mut bag = self.bag.borrow_mut();
            let listener = bag.remove(slot);
            (listener, bag.is_empty())
        };
        // Dropped outside the borrow: this may release a dependent vertex.
        drop(listener);
        now_empty
    }

    /// Notify every listener registered when the call starts.
    ///
    /// Listeners removed by an earlier notification are skipped; unreachable
    /// ones are purged. Returns `true` if purging emptied the set.
    pub fn notify_all(&self, tx: &mut Transaction, payload: Option<&P>) -> bool {
        let snapshot: SmallVec<[(BagHandle, Rc<dyn Listener<P>>); 4]> = self
            .bag
            .borrow()
            .iter()
            .map(|(slot, listener)| (slot, listener.clone()))
            .collect();

        let mut purged = false;
        for (slot, listener) in snapshot {
            if !self.bag.borrow().contains(slot) {
                continue;
            }
            if listener.notify(tx, payload) == ListenerStatus::Unreachable {
                let removed = self.bag.borrow_mut().try_remove(slot);
                purged |= removed.is_some();
            }
        }

        purged && self.bag.borrow().is_empty()
    }
}

enum Target<T> {
    Strong(Rc<T>),
    Weak(Weak<T>),
}

/// Listener forwarding to a method of a vertex.
///
/// Holding the target weakly makes the listener report
/// [`ListenerStatus::Unreachable`] once the target is dropped.
pub(crate) struct ListenerFn<T, P> {
    target: Target<T>,
    notify: fn(&T, &mut Transaction, Option<&P>),
}

impl<T: 'static, P: 'static> ListenerFn<T, P> {
    pub fn strong(target: Rc<T>, notify: fn(&T, &mut Transaction, Option<&P>)) -> Rc<dyn Listener<P>> {
        Rc::new(Self {
            target: Target::Strong(target),
            notify,
        })
    }

    pub fn weak(target: &Rc<T>, notify: fn(&T, &mut Transaction, Option<&P>)) -> Rc<dyn Listener<P>> {
        Rc::new(Self {
            target: Target::Weak(Rc::downgrade(target)),
            notify,
        })
    }
}

impl<T, P> Listener<P> for ListenerFn<T, P> {
    fn notify(&self, tx: &mut Transaction, payload: Option<&P>) -> ListenerStatus {
        let target = match &self.target {
            Target::Strong(target) => target.clone(),
            Target::Weak(target) => match target.upgrade() {
                Some(target) => target,
                None => return ListenerStatus::Unreachable,
            },
        };
        (self.notify)(&target, tx, payload);
        ListenerStatus::Reachable
    }
}
