//! Vertex Graph Plumbing
//!
//! This module holds the pieces every vertex of the graph is built from,
//! independent of whether it is a cell or an event stream.
//!
//! # Overview
//!
//! The graph is not stored centrally. Each vertex owns the set of listeners
//! registered on it and references its own sources directly:
//!
//! - A source notifies its listeners synchronously while a transaction is
//!   propagating, passing either a payload or "nothing" (a revocation).
//! - A listener reports back whether it is still reachable; unreachable ones
//!   are purged on the spot.
//! - Dependents that must not be kept alive by their sources register weakly
//!   and unregister themselves when their [`Lifeline`] ends.
//!
//! # Design Decisions
//!
//! 1. Listener sets are [`Bag`]s with generation-checked handles, so
//!    unregistration is O(1) and a stale handle is detected instead of
//!    silently removing someone else's listener.
//!
//! 2. Vertex identity is the address of the shared allocation. A vertex is
//!    kept alive by the commit queue for as long as its identity is used as
//!    a key there.

mod bag;
mod lifecycle;
mod listener;

use std::rc::Rc;

pub(crate) use bag::{Bag, BagHandle};
pub(crate) use lifecycle::{register_weakly, Lifeline, WeakRegistration};
pub(crate) use listener::{ListenerFn, Listeners, Observable};
pub use listener::{listener, Listener, ListenerHandle, ListenerStatus};

/// Identity of a vertex, derived from the address of its allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VertexId(usize);

impl VertexId {
    /// Identity of the vertex behind a shared pointer.
    pub(crate) fn of<T: ?Sized>(vertex: &Rc<T>) -> Self {
        Self(Rc::as_ptr(vertex) as *const () as usize)
    }

    /// Identity of a vertex seen through a plain reference into its `Rc`.
    pub(crate) fn of_ref<T>(vertex: &T) -> Self {
        Self(vertex as *const T as *const () as usize)
    }
}

/// When a vertex is connected to its sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Lifecycle {
    /// Connected exactly while it has at least one listener.
    DemandDriven,
    /// Connects itself at construction and manages its own subscriptions.
    Autonomous,
}

/// A vertex that holds transient per-transaction state.
///
/// The transaction calls [`commit`](Committable::commit) exactly once on every
/// vertex enqueued during propagation, after propagation and wrap-up finish.
/// A transaction that unwinds before committing calls
/// [`abandon`](Committable::abandon) instead.
pub(crate) trait Committable {
    /// Make the in-flight state stable and clear everything transient.
    fn commit(&self);

    /// Clear everything transient and keep the stable state as it was.
    ///
    /// Operator state outside the vertex is left alone.
    fn abandon(&self);
}
