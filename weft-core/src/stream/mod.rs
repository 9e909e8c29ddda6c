//! Event Stream Vertices
//!
//! A stream vertex carries discrete events. It has no value between
//! transactions; within a transaction it may expose a single [`Emission`].
//!
//! A **terminated** stream never emits again and keeps no subscribers. A
//! **live** stream may emit, correct and revoke emissions while a
//! transaction propagates.

mod live;
pub(crate) mod operators;

use std::fmt;
use std::rc::Rc;

use crate::graph::{Listener, ListenerHandle, Observable, VertexId};
use crate::transaction::Transaction;
pub(crate) use live::{LiveStream, StreamOperator};

/// An event occurring in the current transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Emission<E>(E);

impl<E> Emission<E> {
    pub fn new(event: E) -> Self {
        Self(event)
    }

    pub fn event(&self) -> &E {
        &self.0
    }

    pub fn into_event(self) -> E {
        self.0
    }

    pub fn map<U>(&self, transform: impl FnOnce(&E) -> U) -> Emission<U> {
        Emission(transform(&self.0))
    }
}

/// Listener on a live stream vertex.
pub type Subscriber<E> = dyn Listener<Emission<E>>;

/// A stream vertex that may still emit.
pub trait LiveStreamVertex<E> {
    fn id(&self) -> VertexId;

    /// The emission exposed in the current transaction, if any.
    fn ongoing_emission(&self) -> Option<Emission<E>>;

    /// Register a subscriber. The first subscriber of a demand-driven vertex
    /// activates it.
    fn register_subscriber(&self, tx: &mut Transaction, subscriber: Rc<Subscriber<E>>) -> ListenerHandle;

    /// Unregister a subscriber. The last one leaving deactivates a
    /// demand-driven vertex.
    ///
    /// # Panics
    ///
    /// Panics if `handle` was not issued by this vertex or was already used.
    fn unregister_subscriber(&self, handle: ListenerHandle);

    fn subscriber_count(&self) -> usize;
}

/// A vertex of the stream family.
pub enum StreamVertex<E> {
    Terminated,
    Live(Rc<dyn LiveStreamVertex<E>>),
}

impl<E: Clone + 'static> StreamVertex<E> {
    pub fn is_terminated(&self) -> bool {
        matches!(self, StreamVertex::Terminated)
    }

    pub fn ongoing_emission(&self) -> Option<Emission<E>> {
        match self {
            StreamVertex::Terminated => None,
            StreamVertex::Live(vertex) => vertex.ongoing_emission(),
        }
    }

    pub fn register_subscriber(&self, tx: &mut Transaction, subscriber: Rc<Subscriber<E>>) -> ListenerHandle {
        match self {
            StreamVertex::Terminated => ListenerHandle::detached(),
            StreamVertex::Live(vertex) => vertex.register_subscriber(tx, subscriber),
        }
    }

    pub fn unregister_subscriber(&self, handle: ListenerHandle) {
        match self {
            StreamVertex::Terminated => handle.into_detached(),
            StreamVertex::Live(vertex) => vertex.unregister_subscriber(handle),
        }
    }
}

impl<E> Clone for StreamVertex<E> {
    fn clone(&self) -> Self {
        match self {
            StreamVertex::Terminated => StreamVertex::Terminated,
            StreamVertex::Live(vertex) => StreamVertex::Live(vertex.clone()),
        }
    }
}

impl<E> fmt::Debug for StreamVertex<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamVertex::Terminated => f.write_str("Terminated"),
            StreamVertex::Live(vertex) => f.debug_tuple("Live").field(&vertex.id()).finish(),
        }
    }
}

impl<E: Clone + 'static> Observable<Emission<E>> for StreamVertex<E> {
    fn register_listener(&self, tx: &mut Transaction, listener: Rc<Subscriber<E>>) -> ListenerHandle {
        self.register_subscriber(tx, listener)
    }

    fn unregister_listener(&self, handle: ListenerHandle) {
        self.unregister_subscriber(handle)
    }
}
