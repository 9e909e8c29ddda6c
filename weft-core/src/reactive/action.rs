//! Actions: things done inside a transaction that can be taken back.

use std::fmt;
use std::rc::Rc;

use super::{looped, Looped};
use crate::error::{SideEffectError, TransactionError};
use crate::transaction::{ExternalSideEffect, RevocationHandle, Transaction};

/// A unit of work run in a transaction, producing a result and a handle
/// that revokes whatever the work did.
///
/// An action describes the work; nothing happens until it is executed.
/// Executing the same action twice does the work twice.
pub struct Action<R>(Rc<dyn Fn(&mut Transaction) -> (R, RevocationHandle)>);

/// An action without a result.
pub type Trigger = Action<()>;

impl<R: 'static> Action<R> {
    pub fn new(execute: impl Fn(&mut Transaction) -> (R, RevocationHandle) + 'static) -> Self {
        Self(Rc::new(execute))
    }

    /// An action doing nothing but returning `result`.
    pub fn pure(result: R) -> Self
    where
        R: Clone,
    {
        Self::new(move |_| (result.clone(), RevocationHandle::noop()))
    }

    pub fn execute(&self, tx: &mut Transaction) -> (R, RevocationHandle) {
        (self.0)(tx)
    }

    /// Execute in a transaction of its own and keep the effects.
    ///
    /// # Errors
    ///
    /// Fails like [`Transaction::execute`].
    pub fn execute_separately(&self) -> Result<R, TransactionError> {
        Transaction::execute(|tx| {
            let (result, _irrevocable) = self.execute(tx);
            result
        })
    }

    pub fn map<U: 'static>(&self, transform: impl Fn(R) -> U + 'static) -> Action<U> {
        let this = self.clone();
        Action::new(move |tx| {
            let (result, revocation) = this.execute(tx);
            (transform(result), revocation)
        })
    }

    /// Execute this action, then the action built from its result. Revoking
    /// revokes both.
    pub fn join_of<U: 'static>(&self, transform: impl Fn(R) -> Action<U> + 'static) -> Action<U> {
        let this = self.clone();
        Action::new(move |tx| {
            let (result, first) = this.execute(tx);
            let (result, second) = transform(result).execute(tx);
            (result, RevocationHandle::combine([first, second]))
        })
    }

    /// An action whose definition refers to a value it produces itself.
    ///
    /// On each execution `define` gets a fresh placeholder for the second
    /// half of the result of the action it returns.
    pub fn looped<L: 'static>(define: impl Fn(Looped<L>) -> Action<(R, L)> + 'static) -> Self {
        Self::new(move |tx| {
            looped(|placeholder| {
                let ((result, value), revocation) = define(placeholder).execute(tx);
                ((result, revocation), value)
            })
        })
    }
}

impl Action<()> {
    /// Run `side_effect` after the transaction commits. Revoking the action
    /// before that withdraws it.
    pub fn wrap(side_effect: Rc<dyn ExternalSideEffect>) -> Trigger {
        Action::new(move |tx| ((), tx.enqueue_for_execution(side_effect.clone())))
    }

    pub fn wrap_fn(side_effect: impl Fn() -> Result<(), SideEffectError> + 'static) -> Trigger {
        Self::wrap(Rc::new(side_effect))
    }
}

impl<R> Clone for Action<R> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<R> fmt::Debug for Action<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Action").finish_non_exhaustive()
    }
}

/// Trigger constructors.
pub struct Triggers;

impl Triggers {
    pub fn noop() -> Trigger {
        Action::pure(())
    }

    /// Execute all `triggers` in order. Revoking revokes each of them.
    pub fn combine(triggers: impl IntoIterator<Item = Trigger>) -> Trigger {
        let triggers: Vec<Trigger> = triggers.into_iter().collect();
        Action::new(move |tx| {
            let revocations: Vec<RevocationHandle> = triggers.iter().map(|trigger| trigger.execute(tx).1).collect();
            ((), RevocationHandle::combine(revocations))
        })
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;
    use crate::test_utils::*;

    type Log = Rc<RefCell<Vec<String>>>;

    fn logged(log: &Log, name: &'static str) -> Trigger {
        let log = log.clone();
        Action::new(move |_| {
            log.borrow_mut().push(format!("execute {name}"));
            let log = log.clone();
            ((), RevocationHandle::new(move |_| log.borrow_mut().push(format!("revoke {name}"))))
        })
    }

    #[test]
    fn pure_action_returns_its_result() {
        assert_eq!(Action::pure(4).execute_separately().unwrap(), 4);
    }

    #[test]
    fn mapped_action_keeps_the_revocation() {
        let log = Log::default();
        let action = logged(&log, "a").map(|()| 7);

        sample(|tx| {
            let (result, revocation) = action.execute(tx);
            assert_eq!(result, 7);
            revocation.revoke(tx);
        });

        assert_eq!(*log.borrow(), vec!["execute a", "revoke a"]);
    }

    #[test]
    fn joined_action_revokes_both_parts() {
        let log = Log::default();
        let second = logged(&log, "b");
        let action = logged(&log, "a").join_of(move |()| second.clone());

        sample(|tx| {
            let ((), revocation) = action.execute(tx);
            revocation.revoke(tx);
        });

        assert_eq!(*log.borrow(), vec!["execute a", "execute b", "revoke a", "revoke b"]);
    }

    #[test]
    fn wrapped_side_effect_runs_after_commit() {
        let side_effect = MockSideEffect::new();
        let trigger = Action::wrap(side_effect.clone());

        sample(|tx| {
            let ((), _revocation) = trigger.execute(tx);
            assert_eq!(side_effect.executions(), 0);
        });

        assert_eq!(side_effect.executions(), 1);
    }

    #[test]
    fn revoked_side_effect_does_not_run() {
        let side_effect = MockSideEffect::new();
        let trigger = Action::wrap(side_effect.clone());

        sample(|tx| {
            let ((), revocation) = trigger.execute(tx);
            revocation.revoke(tx);
        });

        assert_eq!(side_effect.executions(), 0);
    }

    #[test]
    fn combined_triggers_execute_and_revoke_each() {
        let log = Log::default();
        let trigger = Triggers::combine([logged(&log, "a"), Triggers::noop(), logged(&log, "b")]);

        sample(|tx| {
            let ((), revocation) = trigger.execute(tx);
            revocation.revoke(tx);
        });

        assert_eq!(*log.borrow(), vec!["execute a", "execute b", "revoke a", "revoke b"]);
    }

    #[test]
    fn looped_action_sees_its_own_result() {
        let action = Action::looped(|total: Looped<i32>| {
            Action::new(move |_| {
                let describe = {
                    let total = total.clone();
                    move || *total.get() * 2
                };
                ((describe, 21), RevocationHandle::noop())
            })
        });

        let describe = action.execute_separately().unwrap();

        assert_eq!(describe(), 42);
    }
}
