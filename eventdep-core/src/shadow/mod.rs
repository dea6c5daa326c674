//! Shadow Memory
//!
//! Out-of-band bookkeeping for every storage location the analysis tracks.
//!
//! # Locations
//!
//! A callback can only reach shared state in two ways:
//!
//! 1. Through a variable binding. Any other callback that sees the same
//!    binding must name it the same way, so bindings are resolved by name
//!    through the [`ScopeResolver`](crate::scope::ScopeResolver).
//! 2. Through a property of an object. Any other callback touching the same
//!    property must hold a reference to the same object, so objects are
//!    tracked by identity in the [`ShadowStore`].
//!
//! Both kinds of location carry an [`AccessLog`], and both feed the same
//! hazard classification.

mod access;
mod store;

pub use access::{AccessLog, Hazard, HazardEdge};
pub use store::ShadowStore;
