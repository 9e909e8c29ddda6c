//! `single`: pass on only the first emission that commits.

use std::cell::RefCell;
use std::rc::Rc;

use crate::graph::{register_weakly, Lifecycle, Lifeline, WeakRegistration};
use crate::stream::{Emission, LiveStream, LiveStreamVertex, StreamOperator, StreamVertex};
use crate::transaction::Transaction;

pub(crate) struct Single<E> {
    lifeline: Lifeline,
    source: StreamVertex<E>,
    /// Present until an emission commits.
    registration: RefCell<Option<WeakRegistration>>,
}

impl<E: Clone + 'static> Single<E> {
    pub fn spawn(tx: &mut Transaction, source: Rc<dyn LiveStreamVertex<E>>) -> Rc<LiveStream<E, Self>> {
        let vertex = LiveStream::new(Self {
            lifeline: Lifeline::new(),
            source: StreamVertex::Live(source),
            registration: RefCell::new(None),
        });

        let op = vertex.op();
        let registration = register_weakly(&op.source, tx, &op.lifeline, &vertex, Self::on_source_emission);
        *op.registration.borrow_mut() = Some(registration);

        if let Some(emission) = op.source.ongoing_emission() {
            vertex.expose_emission(tx, Some(emission));
        }

        vertex
    }

    fn on_source_emission(vertex: &LiveStream<E, Self>, tx: &mut Transaction, emission: Option<&Emission<E>>) {
        vertex.expose_and_propagate_emission(tx, emission.cloned());
    }
}

impl<E: Clone + 'static> StreamOperator<E> for Single<E> {
    const LIFECYCLE: Lifecycle = Lifecycle::Autonomous;

    fn transit(vertex: &LiveStream<E, Self>, emission: Option<&Emission<E>>) {
        if emission.is_none() {
            return;
        }
        let registration = vertex.op().registration.borrow_mut().take();
        if let Some(registration) = registration {
            registration.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::*;

    fn single(input: &InputStream<i32>) -> StreamVertex<i32> {
        let source = match input.vertex() {
            StreamVertex::Live(source) => source,
            StreamVertex::Terminated => unreachable!(),
        };
        sample(|tx| StreamVertex::Live(Single::spawn(tx, source)))
    }

    #[test]
    fn first_emission_only() {
        let input = InputStream::new();
        let single = single(&input);
        let verifier = SubscribingVerifier::start(&single);

        verifier.verify_emits(&input.emit(1), 1);
        verifier.verify_does_not_emit_at_all(&input.emit(2));
        assert_eq!(input.subscriber_count(), 0);
    }

    #[test]
    fn revoked_first_emission_does_not_count() {
        let input = InputStream::new();
        let single = single(&input);
        let verifier = SubscribingVerifier::start(&single);

        verifier.verify_does_not_emit_effectively(&combine(vec![input.emit(11), input.revoke()]));
        verifier.verify_emits(&input.emit(12), 12);
        verifier.verify_does_not_emit_at_all(&input.emit(13));
    }

    #[test]
    fn correction_before_commit() {
        let input = InputStream::new();
        let single = single(&input);
        let verifier = SubscribingVerifier::start(&single);

        verifier.verify_emits(&combine(vec![input.emit(1), input.correct(2)]), 2);
    }

    #[test]
    fn spawn_during_emission() {
        let input = InputStream::new();
        let source = match input.vertex() {
            StreamVertex::Live(source) => source,
            StreamVertex::Terminated => unreachable!(),
        };

        let ongoing = sample(|tx| {
            input.emit(9)(tx);
            let single = Single::spawn(tx, source);
            single.ongoing_emission()
        });

        assert_eq!(ongoing, Some(Emission::new(9)));
        assert_eq!(input.subscriber_count(), 0);
    }

    #[test]
    fn dropped_stream_releases_its_source() {
        let input = InputStream::new();
        let single = single(&input);
        assert_eq!(input.subscriber_count(), 1);

        drop(single);

        assert_eq!(input.subscriber_count(), 0);
    }
}
