//! Revocation handles.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};

use smallvec::SmallVec;

use super::Transaction;

type Revocation = Box<dyn FnOnce(&mut Transaction)>;

/// Undoes whatever an action did inside the transaction it was executed in.
///
/// Revocation consumes the handle, so a handle can be revoked at most once.
/// Dropping a handle without revoking it keeps the action's effects.
#[must_use = "dropping a revocation handle makes the action irrevocable"]
pub struct RevocationHandle {
    revocations: SmallVec<[Revocation; 2]>,
}

impl RevocationHandle {
    /// A handle with nothing to revoke.
    pub fn noop() -> Self {
        Self {
            revocations: SmallVec::new(),
        }
    }

    pub fn new(revoke: impl FnOnce(&mut Transaction) + 'static) -> Self {
        let mut revocations: SmallVec<[Revocation; 2]> = SmallVec::new();
        revocations.push(Box::new(revoke));
        Self { revocations }
    }

    /// A handle revoking all of `handles`.
    ///
    /// Every sub-handle is revoked even if an earlier one panics; the first
    /// panic is resumed once all of them ran.
    pub fn combine(handles: impl IntoIterator<Item = RevocationHandle>) -> Self {
        Self {
            revocations: handles
                .into_iter()
                .flat_map(|handle| handle.revocations)
                .collect(),
        }
    }

    pub fn revoke(self, tx: &mut Transaction) {
        let mut failures = 0_usize;
        let mut first_failure = None;

        for revoke in self.revocations {
            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| revoke(tx))) {
                failures += 1;
                first_failure.get_or_insert(payload);
            }
        }

        if let Some(payload) = first_failure {
            tracing::error!(failures, "revocation failed");
            panic::resume_unwind(payload);
        }
    }
}

impl Default for RevocationHandle {
    fn default() -> Self {
        Self::noop()
    }
}

impl fmt::Debug for RevocationHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RevocationHandle")
            .field("revocations", &self.revocations.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;

    fn logging(log: &Rc<RefCell<Vec<&'static str>>>, name: &'static str) -> RevocationHandle {
        let log = log.clone();
        RevocationHandle::new(move |_| log.borrow_mut().push(name))
    }

    #[test]
    fn combined_handle_revokes_every_part() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let handle = RevocationHandle::combine([
            logging(&log, "a"),
            RevocationHandle::noop(),
            logging(&log, "b"),
        ]);

        Transaction::execute(|tx| handle.revoke(tx)).unwrap();

        assert_eq!(*log.borrow(), vec!["a", "b"]);
    }

    #[test]
    fn combined_handle_revokes_all_before_rethrowing() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let handle = RevocationHandle::combine([
            RevocationHandle::new(|_| panic!("first part failed")),
            logging(&log, "second"),
        ]);

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            let _ = Transaction::execute(|tx| handle.revoke(tx));
        }));

        assert!(outcome.is_err());
        assert_eq!(*log.borrow(), vec!["second"]);
    }
}
