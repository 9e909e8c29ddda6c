//! External side effects.
//!
//! Side effects are queued during propagation and run only after the whole
//! graph has committed. An entry can be withdrawn while its transaction is
//! still open; once the transaction is over, withdrawing is a no-op.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use crate::error::SideEffectError;

/// An effect on the world outside the graph.
pub trait ExternalSideEffect {
    fn execute_externally(&self) -> Result<(), SideEffectError>;
}

impl<F> ExternalSideEffect for F
where
    F: Fn() -> Result<(), SideEffectError>,
{
    fn execute_externally(&self) -> Result<(), SideEffectError> {
        self()
    }
}

/// The side-effect queue of one transaction.
pub(crate) struct SideEffectQueue {
    entries: Vec<Option<Rc<dyn ExternalSideEffect>>>,
}

/// Position of a queued side effect, valid only while its queue lives.
pub(crate) struct QueuedSideEffect {
    queue: Weak<RefCell<SideEffectQueue>>,
    index: usize,
}

impl SideEffectQueue {
    pub fn new() -> Rc<RefCell<Self>> {
        Rc::new(RefCell::new(Self { entries: Vec::new() }))
    }

    pub fn push(queue: &Rc<RefCell<Self>>, side_effect: Rc<dyn ExternalSideEffect>) -> QueuedSideEffect {
        let mut inner = queue.borrow_mut();
        inner.entries.push(Some(side_effect));
        QueuedSideEffect {
            queue: Rc::downgrade(queue),
            index: inner.entries.len() - 1,
        }
    }

    /// Run every entry still queued, in enqueue order.
    ///
    /// Entries may be withdrawn by earlier entries. Stops at the first
    /// failure and returns the number of entries run before it.
    pub fn run(queue: &Rc<RefCell<Self>>) -> Result<usize, SideEffectError> {
        let mut executed = 0;
        let mut index = 0;
        loop {
            let entry = {
                let mut inner = queue.borrow_mut();
                if index >= inner.entries.len() {
                    break;
                }
                inner.entries[index].take()
            };
            index += 1;

            if let Some(side_effect) = entry {
                side_effect.execute_externally()?;
                executed += 1;
            }
        }
        Ok(executed)
    }
}

impl QueuedSideEffect {
    /// Withdraw the entry so it never runs.
    pub fn withdraw(self) {
        match self.queue.upgrade() {
            Some(queue) => {
                let withdrawn = queue.borrow_mut().entries[self.index].take();
                drop(withdrawn);
            }
            None => {
                tracing::debug!(index = self.index, "side effect withdrawn after its transaction closed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;

    fn recording(log: &Rc<RefCell<Vec<u32>>>, value: u32) -> Rc<dyn ExternalSideEffect> {
        let log = log.clone();
        Rc::new(move || -> Result<(), SideEffectError> {
            log.borrow_mut().push(value);
            Ok(())
        })
    }

    #[test]
    fn runs_in_enqueue_order() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let queue = SideEffectQueue::new();
        SideEffectQueue::push(&queue, recording(&log, 1));
        SideEffectQueue::push(&queue, recording(&log, 2));

        assert_eq!(SideEffectQueue::run(&queue).unwrap(), 2);
        assert_eq!(*log.borrow(), vec![1, 2]);
    }

    #[test]
    fn withdrawn_entry_does_not_run() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let queue = SideEffectQueue::new();
        let first = SideEffectQueue::push(&queue, recording(&log, 1));
        SideEffectQueue::push(&queue, recording(&log, 2));

        first.withdraw();

        assert_eq!(SideEffectQueue::run(&queue).unwrap(), 1);
        assert_eq!(*log.borrow(), vec![2]);
    }

    #[test]
    fn failure_stops_the_queue() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let queue = SideEffectQueue::new();
        SideEffectQueue::push(&queue, Rc::new(|| -> Result<(), SideEffectError> { Err(SideEffectError::new("boom")) }));
        SideEffectQueue::push(&queue, recording(&log, 2));

        assert!(SideEffectQueue::run(&queue).is_err());
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn withdrawing_from_a_dropped_queue_is_a_noop() {
        let queue = SideEffectQueue::new();
        let entry = SideEffectQueue::push(&queue, Rc::new(|| -> Result<(), SideEffectError> { Ok(()) }));
        drop(queue);

        entry.withdraw();
    }
}
