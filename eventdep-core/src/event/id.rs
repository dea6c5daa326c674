//! Event identifiers.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of one traced callback execution.
///
/// Ids are handed out by the [`EventTracker`](super::EventTracker) of a
/// session in strictly increasing order and are never reused, so comparing
/// two ids compares the creation order of their events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(u64);

impl EventId {
    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }

    /// The id that follows this one.
    pub(crate) fn next(&self) -> Self {
        Self(self.0 + 1)
    }
}

impl From<u64> for EventId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
