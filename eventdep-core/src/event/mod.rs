//! Event Lifecycle
//!
//! An *event* is one run of a traced callback, from the start notification
//! the instrumentation emits right before the callback body to the matching
//! end notification.
//!
//! The observed runtime is single-threaded and runs each callback to
//! completion, so at most one top-level event is active at a time. The only
//! overlap is synchronous re-entrancy, which the [`EventTracker`] absorbs
//! into the running event.

mod id;
mod palette;
mod tracker;

pub use id::EventId;
pub use palette::Palette;
pub use tracker::{Activation, Completion, EventTracker, TrackerState};
