//! `map` and `map_at` over a live stream.

use std::cell::RefCell;
use std::rc::Rc;

use crate::graph::{Lifecycle, ListenerFn, ListenerHandle};
use crate::stream::{Emission, LiveStream, LiveStreamVertex, StreamOperator};
use crate::transaction::Transaction;

type Transform<S, E> = Box<dyn Fn(&mut Transaction, &S) -> E>;

pub(crate) struct Mapped<S, E> {
    source: Rc<dyn LiveStreamVertex<S>>,
    transform: Transform<S, E>,
    upstream: RefCell<Option<ListenerHandle>>,
}

impl<S: Clone + 'static, E: Clone + 'static> Mapped<S, E> {
    /// The transform runs inside the transaction and may sample cells.
    pub fn vertex(
        source: Rc<dyn LiveStreamVertex<S>>,
        transform: impl Fn(&mut Transaction, &S) -> E + 'static,
    ) -> Rc<LiveStream<E, Self>> {
        LiveStream::new(Self {
            source,
            transform: Box::new(transform),
            upstream: RefCell::new(None),
        })
    }

    fn transform(&self, tx: &mut Transaction, emission: &Emission<S>) -> Emission<E> {
        Emission::new((self.transform)(tx, emission.event()))
    }

    fn on_source_emission(vertex: &LiveStream<E, Self>, tx: &mut Transaction, emission: Option<&Emission<S>>) {
        let emission = match emission {
            Some(emission) => Some(vertex.op().transform(tx, emission)),
            None => None,
        };
        vertex.expose_and_propagate_emission(tx, emission);
    }
}

impl<S: Clone + 'static, E: Clone + 'static> StreamOperator<E> for Mapped<S, E> {
    const LIFECYCLE: Lifecycle = Lifecycle::DemandDriven;

    fn activate(vertex: &LiveStream<E, Self>, tx: &mut Transaction) -> Option<Emission<E>> {
        let op = vertex.op();
        assert!(op.upstream.borrow().is_none(), "mapped stream vertex is already active");

        let handle = op
            .source
            .register_subscriber(tx, ListenerFn::strong(vertex.rc(), Self::on_source_emission));
        *op.upstream.borrow_mut() = Some(handle);

        let ongoing = op.source.ongoing_emission();
        ongoing.map(|emission| op.transform(tx, &emission))
    }

    fn deactivate(vertex: &LiveStream<E, Self>) {
        let op = vertex.op();
        let handle = op.upstream.borrow_mut().take();
        match handle {
            Some(handle) => op.source.unregister_subscriber(handle),
            None => panic!("mapped stream vertex is not active"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::StreamVertex;
    use crate::test_utils::*;

    fn mapped(input: &InputStream<i32>) -> StreamVertex<String> {
        let source = match input.vertex() {
            StreamVertex::Live(source) => source,
            StreamVertex::Terminated => unreachable!(),
        };
        StreamVertex::Live(Mapped::vertex(source, |_, event: &i32| event.to_string()))
    }

    #[test]
    fn emission() {
        let input = InputStream::new();
        let mapped = mapped(&input);
        let verifier = SubscribingVerifier::start(&mapped);

        verifier.verify_emits(&input.emit(7), "7".to_string());
    }

    #[test]
    fn correction_and_revocation() {
        let input = InputStream::new();
        let mapped = mapped(&input);
        let verifier = SubscribingVerifier::start(&mapped);

        verifier.verify_emits(&combine(vec![input.emit(1), input.correct(2)]), "2".to_string());
        verifier.verify_does_not_emit_effectively(&combine(vec![input.emit(3), input.revoke()]));
    }

    #[test]
    fn demand_driven_lifecycle() {
        let input = InputStream::new();
        let mapped = mapped(&input);
        assert_eq!(input.subscriber_count(), 0);

        let verifier = SubscribingVerifier::start(&mapped);
        assert_eq!(input.subscriber_count(), 1);

        verifier.stop();
        assert_eq!(input.subscriber_count(), 0);
    }

    #[test]
    fn subscription_during_emission() {
        let input = InputStream::new();
        let mapped = mapped(&input);

        let ongoing = sample(|tx| {
            input.emit(5)(tx);
            let verifier = SubscribingVerifier::start_in(tx, &mapped);
            let ongoing = mapped.ongoing_emission();
            verifier.stop();
            ongoing
        });

        assert_eq!(ongoing, Some(Emission::new("5".to_string())));
    }
}
