//! Self-referential construction.
//!
//! [`looped`] ties a knot at graph-construction time: the closure receives a
//! placeholder for a value it is about to define, may hand the placeholder to
//! whatever it builds, and finally returns the value, which the placeholder
//! then resolves to. Nothing is suspended; reading the placeholder before it
//! is resolved is a programming error.

use std::cell::OnceCell;
use std::fmt;
use std::rc::Rc;

/// A forward reference to a value defined later.
pub struct Looped<T> {
    slot: Rc<OnceCell<T>>,
}

impl<T> Looped<T> {
    fn new() -> Self {
        Self {
            slot: Rc::new(OnceCell::new()),
        }
    }

    /// The value this placeholder resolved to.
    ///
    /// # Panics
    ///
    /// Panics if the placeholder is not resolved yet.
    pub fn get(&self) -> &T {
        self.slot
            .get()
            .expect("looped value read before the loop was closed")
    }

    pub fn is_resolved(&self) -> bool {
        self.slot.get().is_some()
    }

    fn resolve(&self, value: T) {
        if self.slot.set(value).is_err() {
            panic!("looped value resolved twice");
        }
    }
}

impl<T> Clone for Looped<T> {
    fn clone(&self) -> Self {
        Self {
            slot: self.slot.clone(),
        }
    }
}

impl<T> fmt::Debug for Looped<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Looped")
            .field("resolved", &self.is_resolved())
            .finish()
    }
}

/// Run `define` with a placeholder for the value it returns second, resolve
/// the placeholder to that value and return the first.
pub fn looped<L, R>(define: impl FnOnce(Looped<L>) -> (R, L)) -> R {
    let placeholder = Looped::new();
    let (result, value) = define(placeholder.clone());
    placeholder.resolve(value);
    result
}
