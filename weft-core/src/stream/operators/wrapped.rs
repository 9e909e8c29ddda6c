//! A stream fed by an external event source.

use std::marker::PhantomData;
use std::rc::Rc;

use crate::graph::Lifecycle;
use crate::reactive::{EventDistributor, ExternalSourceAdapter, SubscriptionHandle};
use crate::stream::{Emission, LiveStream, StreamOperator};
use crate::transaction::Transaction;

pub(crate) struct Wrapped<E> {
    subscription: Box<dyn SubscriptionHandle>,
    events: PhantomData<fn(E)>,
}

impl<E: Clone + 'static> Wrapped<E> {
    /// Bind `adapter` to a new vertex. The external subscription is only
    /// registered while the vertex has subscribers.
    pub fn vertex(adapter: &dyn ExternalSourceAdapter<E>) -> Rc<LiveStream<E, Self>> {
        LiveStream::new_cyclic(|this| Self {
            subscription: adapter.bind(EventDistributor::new(this.clone())),
            events: PhantomData,
        })
    }

    pub fn distribute(vertex: &LiveStream<E, Self>, tx: &mut Transaction, event: E) {
        vertex.expose_and_propagate_emission(tx, Some(Emission::new(event)));
    }
}

impl<E: Clone + 'static> StreamOperator<E> for Wrapped<E> {
    const LIFECYCLE: Lifecycle = Lifecycle::DemandDriven;

    fn activate(vertex: &LiveStream<E, Self>, _tx: &mut Transaction) -> Option<Emission<E>> {
        vertex.op().subscription.register();
        None
    }

    fn deactivate(vertex: &LiveStream<E, Self>) {
        vertex.op().subscription.unregister();
    }
}
