//! Moments: reads deferred until a transaction is open.

use std::fmt;
use std::rc::Rc;

use super::{looped, Action, Looped};
use crate::error::TransactionError;
use crate::transaction::{RevocationHandle, Transaction};

/// A computation that reads the graph at the moment it is pulled.
///
/// Pulling may sample cells and build stateful vertices, but has no effect
/// that would need revoking.
pub struct Moment<R>(Rc<dyn Fn(&mut Transaction) -> R>);

impl<R: 'static> Moment<R> {
    pub fn new(pull: impl Fn(&mut Transaction) -> R + 'static) -> Self {
        Self(Rc::new(pull))
    }

    pub fn pure(result: R) -> Self
    where
        R: Clone,
    {
        Self::new(move |_| result.clone())
    }

    pub fn pull(&self, tx: &mut Transaction) -> R {
        (self.0)(tx)
    }

    /// Pull in a transaction of its own.
    ///
    /// # Errors
    ///
    /// Fails like [`Transaction::execute`].
    pub fn pull_separately(&self) -> Result<R, TransactionError> {
        Transaction::execute(|tx| self.pull(tx))
    }

    pub fn map<U: 'static>(&self, transform: impl Fn(R) -> U + 'static) -> Moment<U> {
        let this = self.clone();
        Moment::new(move |tx| transform(this.pull(tx)))
    }

    /// Pull this moment, then the moment built from its result.
    pub fn join_of<U: 'static>(&self, transform: impl Fn(R) -> Moment<U> + 'static) -> Moment<U> {
        let this = self.clone();
        Moment::new(move |tx| {
            let result = this.pull(tx);
            transform(result).pull(tx)
        })
    }

    /// A moment whose definition refers to a value it produces itself.
    pub fn looped<L: 'static>(define: impl Fn(Looped<L>) -> Moment<(R, L)> + 'static) -> Self {
        Self::new(move |tx| looped(|placeholder| define(placeholder).pull(tx)))
    }

    /// The action pulling this moment, with nothing to revoke.
    pub fn as_action(&self) -> Action<R> {
        let this = self.clone();
        Action::new(move |tx| (this.pull(tx), RevocationHandle::noop()))
    }
}

impl<R> Clone for Moment<R> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<R> fmt::Debug for Moment<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Moment").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::Cell;
    use crate::test_utils::*;

    #[test]
    fn pull_samples_at_the_moment_of_pulling() {
        let input = InputCell::new(1);
        let doubled = input.cell().sampling().map(|value| value * 2);

        assert_eq!(doubled.pull_separately().unwrap(), 2);
        stimulate(&input.update(5));
        assert_eq!(doubled.pull_separately().unwrap(), 10);
    }

    #[test]
    fn pull_during_an_update_sees_the_old_value() {
        let input = InputCell::new(1);
        let sampling = input.cell().sampling();

        let pulled = sample(|tx| {
            input.update(2)(tx);
            sampling.pull(tx)
        });

        assert_eq!(pulled, 1);
    }

    #[test]
    fn join_of_pulls_both_moments() {
        let first = Cell::constant(3);
        let second = Cell::constant(4);
        let sum = first
            .sampling()
            .join_of(move |a| second.sampling().map(move |b| a + b));

        assert_eq!(sum.pull_separately().unwrap(), 7);
    }

    #[test]
    fn as_action_has_nothing_to_revoke() {
        let action = Moment::pure("now").as_action();

        let result = sample(|tx| {
            let (result, revocation) = action.execute(tx);
            revocation.revoke(tx);
            result
        });

        assert_eq!(result, "now");
    }

    #[test]
    fn looped_moment_resolves_per_pull() {
        let moment = Moment::looped(|later: Looped<i32>| {
            Moment::new(move |_| {
                let later = later.clone();
                let read = move || *later.get() + 1;
                (read, 9)
            })
        });

        let read = moment.pull_separately().unwrap();

        assert_eq!(read(), 10);
    }
}
