//! Test harness for vertex-level tests.
//!
//! Input vertices can be stimulated with updates, corrections and
//! revocations inside a transaction. Verifiers stay registered on the vertex
//! under test and check, for one stimulation, the value sampled during the
//! transaction, the last notification received and the value at rest
//! afterwards.

use std::cell::RefCell;
use std::fmt::Debug;
use std::rc::Rc;

use crate::cell::{CachePolicy, CellOperator, CellVertex, Update, WarmCell, WarmCellVertex};
use crate::error::SideEffectError;
use crate::graph::{listener, Lifecycle, Listener, ListenerHandle, ListenerStatus};
use crate::reactive::{Cell, EventStream};
use crate::stream::{Emission, LiveStream, LiveStreamVertex, StreamOperator, StreamVertex};
use crate::transaction::{ExternalSideEffect, Transaction};

/// Something done to the graph inside a transaction.
pub type Stimulation = Box<dyn Fn(&mut Transaction)>;

pub fn stimulate(stimulation: &Stimulation) {
    Transaction::execute(|tx| stimulation(tx)).unwrap();
}

/// Apply all stimulations, in order, in one transaction.
pub fn combine(stimulations: Vec<Stimulation>) -> Stimulation {
    Box::new(move |tx| {
        for stimulation in &stimulations {
            stimulation(tx);
        }
    })
}

/// Run `read` in a transaction of its own.
pub fn sample<R>(read: impl FnOnce(&mut Transaction) -> R) -> R {
    Transaction::execute(read).unwrap()
}

/// Apply `stimulation` in a transaction that then panics before commit.
pub fn stimulate_and_panic(stimulation: &Stimulation) {
    let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        Transaction::execute(|tx| {
            stimulation(tx);
            panic!("transaction panicked after stimulation");
        })
    }));
    assert!(outcome.is_err(), "transaction did not panic");
}

// ---- Inputs ----

pub struct Input;

impl<V: Clone + 'static> CellOperator<V> for Input {
    const CACHE: CachePolicy = CachePolicy::Active;
    const LIFECYCLE: Lifecycle = Lifecycle::Autonomous;
}

/// A warm cell stimulated directly by tests.
pub struct InputCell<V: Clone + 'static> {
    vertex: Rc<WarmCell<V, Input>>,
}

impl<V: Clone + Debug + 'static> InputCell<V> {
    pub fn new(initial: V) -> Self {
        Self {
            vertex: WarmCell::new_stateful(initial, Input),
        }
    }

    pub fn vertex(&self) -> CellVertex<V> {
        CellVertex::Warm(self.vertex.clone())
    }

    pub fn cell(&self) -> Cell<V> {
        Cell::from_vertex(self.vertex())
    }

    pub fn observer_count(&self) -> usize {
        self.vertex.observer_count()
    }

    pub fn update(&self, value: V) -> Stimulation {
        let vertex = self.vertex.clone();
        Box::new(move |tx| {
            assert!(vertex.ongoing_update().is_none(), "input cell already updated");
            vertex.expose_and_propagate_update(tx, Some(Update::new(value.clone())));
        })
    }

    pub fn correct(&self, value: V) -> Stimulation {
        let vertex = self.vertex.clone();
        Box::new(move |tx| {
            assert!(vertex.ongoing_update().is_some(), "no update to correct");
            vertex.expose_and_propagate_update(tx, Some(Update::new(value.clone())));
        })
    }

    pub fn revoke(&self) -> Stimulation {
        let vertex = self.vertex.clone();
        Box::new(move |tx| {
            assert!(vertex.ongoing_update().is_some(), "no update to revoke");
            vertex.expose_and_propagate_update(tx, None);
        })
    }
}

pub struct Source;

impl<E: Clone + 'static> StreamOperator<E> for Source {
    const LIFECYCLE: Lifecycle = Lifecycle::Autonomous;
}

/// A live stream stimulated directly by tests.
pub struct InputStream<E: Clone + 'static> {
    vertex: Rc<LiveStream<E, Source>>,
}

impl<E: Clone + Debug + 'static> InputStream<E> {
    pub fn new() -> Self {
        Self {
            vertex: LiveStream::new(Source),
        }
    }

    pub fn vertex(&self) -> StreamVertex<E> {
        StreamVertex::Live(self.vertex.clone())
    }

    pub fn stream(&self) -> EventStream<E> {
        EventStream::from_vertex(self.vertex())
    }

    pub fn subscriber_count(&self) -> usize {
        self.vertex.subscriber_count()
    }

    pub fn emit(&self, event: E) -> Stimulation {
        let vertex = self.vertex.clone();
        Box::new(move |tx| {
            assert!(vertex.ongoing_emission().is_none(), "input stream already emitted");
            vertex.expose_and_propagate_emission(tx, Some(Emission::new(event.clone())));
        })
    }

    pub fn correct(&self, event: E) -> Stimulation {
        let vertex = self.vertex.clone();
        Box::new(move |tx| {
            assert!(vertex.ongoing_emission().is_some(), "no emission to correct");
            vertex.expose_and_propagate_emission(tx, Some(Emission::new(event.clone())));
        })
    }

    pub fn revoke(&self) -> Stimulation {
        let vertex = self.vertex.clone();
        Box::new(move |tx| {
            assert!(vertex.ongoing_emission().is_some(), "no emission to revoke");
            vertex.expose_and_propagate_emission(tx, None);
        })
    }
}

// ---- Verifiers ----

/// Records every notification since the last reset.
pub struct Recorder<P> {
    received: RefCell<Vec<Option<P>>>,
}

impl<P: Clone> Recorder<P> {
    pub fn new() -> Rc<Self> {
        Rc::new(Self {
            received: RefCell::new(Vec::new()),
        })
    }

    pub fn take(&self) -> Vec<Option<P>> {
        std::mem::take(&mut *self.received.borrow_mut())
    }
}

impl<P: Clone> Listener<P> for Recorder<P> {
    fn notify(&self, _tx: &mut Transaction, payload: Option<&P>) -> ListenerStatus {
        self.received.borrow_mut().push(payload.cloned());
        ListenerStatus::Reachable
    }
}

/// Observes a cell vertex for the duration of a test.
pub struct ObservingVerifier<V: Clone + 'static> {
    vertex: CellVertex<V>,
    recorder: Rc<Recorder<Update<V>>>,
    handle: Option<ListenerHandle>,
}

impl<V: Clone + PartialEq + Debug + 'static> ObservingVerifier<V> {
    pub fn start(vertex: &CellVertex<V>) -> Self {
        let recorder = Recorder::new();
        let handle = sample(|tx| vertex.register_observer(tx, recorder.clone()));
        Self {
            vertex: vertex.clone(),
            recorder,
            handle: Some(handle),
        }
    }

    pub fn start_in(tx: &mut Transaction, vertex: &CellVertex<V>) -> Self {
        let recorder = Recorder::new();
        let handle = vertex.register_observer(tx, recorder.clone());
        Self {
            vertex: vertex.clone(),
            recorder,
            handle: Some(handle),
        }
    }

    /// Notifications received so far, oldest first.
    pub fn received(&self) -> Vec<Option<Update<V>>> {
        self.recorder.take()
    }

    pub fn verify_updates(&self, stimulation: &Stimulation, expected_old: V, expected_new: V) {
        self.recorder.take();
        let (old, ongoing) = sample(|tx| {
            stimulation(tx);
            (self.vertex.old_value(tx), self.vertex.ongoing_update())
        });

        assert_eq!(old, expected_old, "value sampled during the transaction");
        assert_eq!(ongoing, Some(Update::new(expected_new.clone())), "ongoing update");
        let received = self.recorder.take();
        assert_eq!(
            received.last(),
            Some(&Some(Update::new(expected_new.clone()))),
            "last notification, all: {received:?}"
        );
        verify_at_rest(&self.vertex, expected_new);
    }

    pub fn verify_does_not_update_at_all(&self, stimulation: &Stimulation, expected: V) {
        self.recorder.take();
        let (old, ongoing) = sample(|tx| {
            stimulation(tx);
            (self.vertex.old_value(tx), self.vertex.ongoing_update())
        });

        assert_eq!(old, expected);
        assert_eq!(ongoing, None);
        let received = self.recorder.take();
        assert!(received.is_empty(), "unexpected notifications: {received:?}");
        verify_at_rest(&self.vertex, expected);
    }

    pub fn verify_does_not_update_effectively(&self, stimulation: &Stimulation, expected: V) {
        self.recorder.take();
        let (old, ongoing) = sample(|tx| {
            stimulation(tx);
            (self.vertex.old_value(tx), self.vertex.ongoing_update())
        });

        assert_eq!(old, expected);
        assert_eq!(ongoing, None);
        let received = self.recorder.take();
        assert_eq!(received.last(), Some(&None), "last notification, all: {received:?}");
        verify_at_rest(&self.vertex, expected);
    }

    pub fn stop(mut self) {
        if let Some(handle) = self.handle.take() {
            self.vertex.unregister_observer(handle);
        }
    }
}

/// Subscribes to a stream vertex for the duration of a test.
pub struct SubscribingVerifier<E: Clone + 'static> {
    vertex: StreamVertex<E>,
    recorder: Rc<Recorder<Emission<E>>>,
    handle: Option<ListenerHandle>,
}

impl<E: Clone + PartialEq + Debug + 'static> SubscribingVerifier<E> {
    pub fn start(vertex: &StreamVertex<E>) -> Self {
        let recorder = Recorder::new();
        let handle = sample(|tx| vertex.register_subscriber(tx, recorder.clone()));
        Self {
            vertex: vertex.clone(),
            recorder,
            handle: Some(handle),
        }
    }

    pub fn start_in(tx: &mut Transaction, vertex: &StreamVertex<E>) -> Self {
        let recorder = Recorder::new();
        let handle = vertex.register_subscriber(tx, recorder.clone());
        Self {
            vertex: vertex.clone(),
            recorder,
            handle: Some(handle),
        }
    }

    pub fn received(&self) -> Vec<Option<Emission<E>>> {
        self.recorder.take()
    }

    pub fn verify_emits(&self, stimulation: &Stimulation, expected: E) {
        self.recorder.take();
        let ongoing = sample(|tx| {
            stimulation(tx);
            self.vertex.ongoing_emission()
        });

        assert_eq!(ongoing, Some(Emission::new(expected.clone())), "ongoing emission");
        let received = self.recorder.take();
        assert_eq!(
            received.last(),
            Some(&Some(Emission::new(expected))),
            "last notification, all: {received:?}"
        );
        assert_eq!(sample(|_| self.vertex.ongoing_emission()), None);
    }

    pub fn verify_does_not_emit_at_all(&self, stimulation: &Stimulation) {
        self.recorder.take();
        let ongoing = sample(|tx| {
            stimulation(tx);
            self.vertex.ongoing_emission()
        });

        assert_eq!(ongoing, None);
        let received = self.recorder.take();
        assert!(received.is_empty(), "unexpected notifications: {received:?}");
    }

    pub fn verify_does_not_emit_effectively(&self, stimulation: &Stimulation) {
        self.recorder.take();
        let ongoing = sample(|tx| {
            stimulation(tx);
            self.vertex.ongoing_emission()
        });

        assert_eq!(ongoing, None);
        let received = self.recorder.take();
        assert_eq!(received.last(), Some(&None), "last notification, all: {received:?}");
    }

    pub fn stop(mut self) {
        if let Some(handle) = self.handle.take() {
            self.vertex.unregister_subscriber(handle);
        }
    }
}

/// Check the value of a vertex outside any stimulation, both without and
/// with an observer registered.
pub fn verify_at_rest<V: Clone + PartialEq + Debug + 'static>(vertex: &CellVertex<V>, expected: V) {
    let passive = sample(|tx| {
        assert_eq!(vertex.ongoing_update(), None, "update outside its transaction");
        vertex.old_value(tx)
    });
    assert_eq!(passive, expected, "passively sampled value");

    let active = sample(|tx| {
        let handle = vertex.register_observer(tx, listener(|_, _| {}));
        let value = vertex.old_value(tx);
        vertex.unregister_observer(handle);
        value
    });
    assert_eq!(active, expected, "actively sampled value");
}

pub fn verify_frozen<V: Clone + PartialEq + Debug + 'static>(vertex: &CellVertex<V>, expected: V) {
    assert!(vertex.is_frozen(), "expected a frozen vertex, got {vertex:?}");
    assert_eq!(sample(|tx| vertex.old_value(tx)), expected);
}

// ---- Side effects ----

/// Side effect counting its executions.
pub struct MockSideEffect {
    executions: RefCell<u32>,
}

impl MockSideEffect {
    pub fn new() -> Rc<Self> {
        Rc::new(Self {
            executions: RefCell::new(0),
        })
    }

    pub fn executions(&self) -> u32 {
        *self.executions.borrow()
    }
}

impl ExternalSideEffect for MockSideEffect {
    fn execute_externally(&self) -> Result<(), SideEffectError> {
        *self.executions.borrow_mut() += 1;
        Ok(())
    }
}
