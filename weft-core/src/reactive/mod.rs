//! Reactive Primitives
//!
//! This module is the public surface of the engine: the two reactive types
//! and the abstractions used to run, schedule and read things in a
//! transaction.
//!
//! # Concepts
//!
//! ## Cells
//!
//! A [`Cell`] holds a value at every point in time. Derived cells (`map`,
//! `map2`, `switch`) are demand-driven: they compute and subscribe only
//! while observed. Stateful cells (`hold`, `map_at`, `accumulate`) are
//! spawned in a transaction and keep their state from then on.
//!
//! ## Event Streams
//!
//! An [`EventStream`] carries discrete events, at most one per transaction.
//! External events enter through [`EventStream::wrap`].
//!
//! ## Actions, Effects and Moments
//!
//! - An [`Action`] does something inside a transaction and hands back a
//!   revocation handle undoing it.
//! - An [`Effect`] starts something ongoing and hands back a handle to
//!   cancel it.
//! - A [`Moment`] reads the graph when pulled and has nothing to undo.
//!
//! # Implementation Notes
//!
//! None of these types tracks dependencies implicitly. Every operator is
//! wired to its sources when it is built, and a transaction is passed
//! explicitly wherever the graph is read or state is spawned.

mod action;
mod cell;
mod effect;
mod event_stream;
mod external;
mod looped;
mod moment;

pub use action::{Action, Trigger, Triggers};
pub use cell::Cell;
pub use effect::{Effect, EffectHandle, Schedule};
pub use event_stream::EventStream;
pub use external::{EventDistributor, ExternalSourceAdapter, SubscriptionHandle};
pub use looped::{looped, Looped};
pub use moment::Moment;
