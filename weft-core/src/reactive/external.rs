//! Feeding external events into the graph.

use std::rc::Weak;

use crate::error::TransactionError;
use crate::stream::operators::Wrapped;
use crate::stream::LiveStream;
use crate::transaction::Transaction;

/// Bookkeeping for an external subscription.
///
/// Registering and unregistering must not change the external system's
/// observable behavior. Both are called as the wrapping stream gains its
/// first subscriber and loses its last one.
pub trait SubscriptionHandle {
    fn register(&self);

    fn unregister(&self);
}

/// An external source of events, such as a UI toolkit callback or a
/// channel.
pub trait ExternalSourceAdapter<E> {
    /// Bind the source to `distributor`, which the source calls for each
    /// event from then on.
    fn bind(&self, distributor: EventDistributor<E>) -> Box<dyn SubscriptionHandle>;
}

/// Emits external events on the stream it was created for.
pub struct EventDistributor<E> {
    target: Weak<LiveStream<E, Wrapped<E>>>,
}

impl<E: Clone + 'static> EventDistributor<E> {
    pub(crate) fn new(target: Weak<LiveStream<E, Wrapped<E>>>) -> Self {
        Self { target }
    }

    /// Emit `event` in a new transaction. Events for a stream that no longer
    /// exists are dropped.
    ///
    /// # Errors
    ///
    /// Fails like [`Transaction::execute`], notably when called from inside
    /// a propagating transaction.
    pub fn distribute(&self, event: E) -> Result<(), TransactionError> {
        let Some(target) = self.target.upgrade() else {
            tracing::trace!("event distributed to a dropped stream");
            return Ok(());
        };
        Transaction::execute(|tx| Wrapped::distribute(&target, tx, event))
    }
}

impl<E> Clone for EventDistributor<E> {
    fn clone(&self) -> Self {
        Self {
            target: self.target.clone(),
        }
    }
}
