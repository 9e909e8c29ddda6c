//! The public event stream type.

use std::fmt;
use std::rc::Rc;

use super::{looped, Action, Cell, Effect, EffectHandle, ExternalSourceAdapter, Moment, Schedule, Trigger};
use crate::cell::operators::Held;
use crate::cell::CellVertex;
use crate::stream::operators::{ExecutedEach, Filtered, LoopedForward, Mapped, Single, Wrapped};
use crate::stream::StreamVertex;
use crate::transaction::{RevocationHandle, Transaction};

/// Discrete events, at most one per transaction.
///
/// Like cells, streams are built lazily: a derived stream subscribes to its
/// source only while something subscribes to it.
pub struct EventStream<E> {
    vertex: StreamVertex<E>,
}

impl<E: Clone + 'static> EventStream<E> {
    /// A stream that never emits.
    pub fn never() -> Self {
        Self::from_vertex(StreamVertex::Terminated)
    }

    pub(crate) fn from_vertex(vertex: StreamVertex<E>) -> Self {
        Self { vertex }
    }

    pub(crate) fn vertex(&self) -> &StreamVertex<E> {
        &self.vertex
    }

    /// Whether the stream is known never to emit.
    pub fn is_never(&self) -> bool {
        self.vertex.is_terminated()
    }

    /// A stream emitting the events of an external source, each in a
    /// transaction of its own.
    pub fn wrap(adapter: &dyn ExternalSourceAdapter<E>) -> Self {
        Self::from_vertex(StreamVertex::Live(Wrapped::vertex(adapter)))
    }

    pub fn map<U: Clone + 'static>(&self, transform: impl Fn(&E) -> U + 'static) -> EventStream<U> {
        self.map_at(move |_, event| transform(event))
    }

    /// Like [`map`](Self::map), but `transform` gets the transaction and may
    /// sample cells.
    pub fn map_at<U: Clone + 'static>(
        &self,
        transform: impl Fn(&mut Transaction, &E) -> U + 'static,
    ) -> EventStream<U> {
        match &self.vertex {
            StreamVertex::Terminated => EventStream::never(),
            StreamVertex::Live(source) => {
                EventStream::from_vertex(StreamVertex::Live(Mapped::vertex(source.clone(), transform)))
            }
        }
    }

    pub fn filter(&self, predicate: impl Fn(&E) -> bool + 'static) -> Self {
        match &self.vertex {
            StreamVertex::Terminated => Self::never(),
            StreamVertex::Live(source) => Self::from_vertex(StreamVertex::Live(Filtered::vertex(source.clone(), predicate))),
        }
    }

    /// A stream emitting only the first event of this stream that commits
    /// from now on.
    pub fn single(&self, tx: &mut Transaction) -> Self {
        match &self.vertex {
            StreamVertex::Terminated => Self::never(),
            StreamVertex::Live(source) => Self::from_vertex(StreamVertex::Live(Single::spawn(tx, source.clone()))),
        }
    }

    /// A cell starting at `initial` and taking on each emitted event.
    ///
    /// An event emitted in the current transaction already counts.
    pub fn hold(&self, tx: &mut Transaction, initial: E) -> Cell<E> {
        match &self.vertex {
            StreamVertex::Terminated => Cell::constant(initial),
            StreamVertex::Live(source) => Cell::from_vertex(CellVertex::Warm(Held::spawn(tx, source.clone(), initial))),
        }
    }

    pub fn holding(&self, initial: E) -> Moment<Cell<E>> {
        let stream = self.clone();
        Moment::new(move |tx| stream.hold(tx, initial.clone()))
    }

    /// A cell folding each event into an accumulator with `transform`.
    pub fn accumulate<A: Clone + 'static>(
        &self,
        tx: &mut Transaction,
        initial: A,
        transform: impl Fn(&A, &E) -> A + 'static,
    ) -> Cell<A> {
        if self.is_never() {
            return Cell::constant(initial);
        }

        EventStream::<A>::looped(|new_values| {
            let accumulator = new_values.hold(tx, initial);
            let CellVertex::Warm(held) = accumulator.vertex() else {
                unreachable!("holding a live stream yields a warm cell");
            };
            // The new values depend on the accumulator; refer back to it
            // weakly so the two do not keep each other alive.
            let held = Rc::downgrade(held);
            let next = self.map_at(move |tx, event| {
                let held = held.upgrade().expect("accumulator updated after it was dropped");
                transform(&held.old_value(tx), event)
            });
            (accumulator, next)
        })
    }

    /// Build a stream that refers to itself.
    ///
    /// `define` gets a stand-in for the stream it returns second. The
    /// stand-in emits whatever that stream emits once something subscribes.
    pub fn looped<R>(define: impl FnOnce(EventStream<E>) -> (R, EventStream<E>)) -> R {
        looped(|placeholder| {
            let forward = EventStream::from_vertex(StreamVertex::Live(LoopedForward::vertex(placeholder)));
            define(forward)
        })
    }
}

impl<E: Clone + 'static> EventStream<Action<E>> {
    /// Execute each emitted action, revoking the one executed before it.
    ///
    /// The resulting stream emits the results. Cancelling the effect stops
    /// execution and revokes the running action; revoking the cancellation
    /// resumes, executing the action emitted at that moment, if any.
    pub fn execute_each(&self) -> Effect<EventStream<E>> {
        let source = self.vertex.clone();
        Effect::new(Action::new(move |tx| {
            let StreamVertex::Live(source) = &source else {
                return ((EventStream::never(), EffectHandle::noop()), RevocationHandle::noop());
            };

            let vertex = ExecutedEach::start(tx, source.clone());
            let cancel = {
                let vertex = vertex.clone();
                Action::new(move |tx| {
                    ExecutedEach::abort(&vertex, tx);
                    let vertex = vertex.clone();
                    ((), RevocationHandle::new(move |tx| ExecutedEach::restart(&vertex, tx)))
                })
            };
            let revocation = {
                let vertex = vertex.clone();
                RevocationHandle::new(move |tx| ExecutedEach::abort(&vertex, tx))
            };

            let results = EventStream::from_vertex(StreamVertex::Live(vertex));
            ((results, EffectHandle::new(cancel)), revocation)
        }))
    }

    /// Start executing each action with no way to cancel.
    pub fn execute_each_forever(&self) -> Action<EventStream<E>> {
        self.execute_each().start().map(|(results, _handle)| results)
    }
}

impl EventStream<Trigger> {
    pub fn trigger_each(&self) -> Schedule {
        self.execute_each().map(|_| ())
    }

    pub fn trigger_each_forever(&self) -> Trigger {
        self.execute_each_forever().map(|_| ())
    }
}

impl<E> Clone for EventStream<E> {
    fn clone(&self) -> Self {
        Self {
            vertex: self.vertex.clone(),
        }
    }
}

impl<E> fmt::Debug for EventStream<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("EventStream").field(&self.vertex).finish()
    }
}
