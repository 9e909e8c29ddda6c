//! Effects: ongoing activities that are started and later cancelled.

use std::fmt;

use super::{Action, Trigger, Triggers};

/// Controls a started effect.
#[derive(Clone, Debug)]
pub struct EffectHandle {
    cancel: Trigger,
}

impl EffectHandle {
    pub fn new(cancel: Trigger) -> Self {
        Self { cancel }
    }

    /// A handle for an effect that has nothing to cancel.
    pub fn noop() -> Self {
        Self::new(Triggers::noop())
    }

    /// The trigger cancelling the effect. Revoking the cancellation resumes
    /// it.
    pub fn cancel(&self) -> &Trigger {
        &self.cancel
    }
}

/// Something that runs from the transaction it is started in until it is
/// cancelled.
pub struct Effect<R> {
    start: Action<(R, EffectHandle)>,
}

/// An effect without a result.
pub type Schedule = Effect<()>;

impl<R: 'static> Effect<R> {
    pub fn new(start: Action<(R, EffectHandle)>) -> Self {
        Self { start }
    }

    /// The action starting the effect. Revoking the start undoes it as if
    /// it never ran.
    pub fn start(&self) -> &Action<(R, EffectHandle)> {
        &self.start
    }

    pub fn map<U: 'static>(&self, transform: impl Fn(R) -> U + 'static) -> Effect<U> {
        Effect::new(self.start.map(move |(result, handle)| (transform(result), handle)))
    }
}

impl Effect<()> {
    /// The action starting the schedule, keeping only its handle.
    pub fn launch(&self) -> Action<EffectHandle> {
        self.start.map(|((), handle)| handle)
    }
}

impl<R> Clone for Effect<R> {
    fn clone(&self) -> Self {
        Self {
            start: self.start.clone(),
        }
    }
}

impl<R> fmt::Debug for Effect<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Effect").finish_non_exhaustive()
    }
}
