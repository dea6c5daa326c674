//! Access Logs and Hazard Classification
//!
//! Every tracked storage location owns one [`AccessLog`]. The log remembers
//! only the most recent reader and the most recent writer; that is enough to
//! classify the next access against the prior one:
//!
//! | access | prior state            | hazard |
//! |--------|------------------------|--------|
//! | read   | writer from another ev | RAW    |
//! | write  | writer from another ev | WAW    |
//! | write  | reader from another ev | WAR    |
//!
//! Because only the latest writer is kept, a chain `W(1) W(2) R(3)` yields
//! `1 -> 2` (WAW) and `2 -> 3` (RAW) but never a direct `1 -> 3` edge.

use std::fmt;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::event::EventId;

/// Classification of a dependence between two accesses to one location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Hazard {
    /// Read after write.
    #[serde(rename = "RAW")]
    Raw,
    /// Write after write.
    #[serde(rename = "WAW")]
    Waw,
    /// Write after read.
    #[serde(rename = "WAR")]
    War,
}

impl fmt::Display for Hazard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            Hazard::Raw => "RAW",
            Hazard::Waw => "WAW",
            Hazard::War => "WAR",
        };
        f.write_str(tag)
    }
}

/// A hazard detected on one access: `source` must happen before the
/// accessing event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HazardEdge {
    pub source: EventId,
    pub hazard: Hazard,
}

/// Last-reader / last-writer state of one storage location.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccessLog {
    last_reader: Option<EventId>,
    last_writer: Option<EventId>,
}

impl AccessLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_reader(&self) -> Option<EventId> {
        self.last_reader
    }

    pub fn last_writer(&self) -> Option<EventId> {
        self.last_writer
    }

    /// Record a read by `eid`.
    ///
    /// Returns the RAW hazard against the previous writer, if any.
    pub fn on_read(&mut self, eid: EventId) -> Option<HazardEdge> {
        let hazard = self
            .last_writer
            .filter(|writer| *writer != eid)
            .map(|source| HazardEdge {
                source,
                hazard: Hazard::Raw,
            });

        self.last_reader = Some(eid);
        hazard
    }

    /// Record a write by `eid`.
    ///
    /// Returns the WAW hazard against the previous writer followed by the WAR
    /// hazard against the previous reader. The last reader is kept as-is.
    pub fn on_write(&mut self, eid: EventId) -> SmallVec<[HazardEdge; 2]> {
        let mut hazards = SmallVec::new();

        if let Some(writer) = self.last_writer.filter(|w| *w != eid) {
            hazards.push(HazardEdge {
                source: writer,
                hazard: Hazard::Waw,
            });
        }
        if let Some(reader) = self.last_reader.filter(|r| *r != eid) {
            hazards.push(HazardEdge {
                source: reader,
                hazard: Hazard::War,
            });
        }

        self.last_writer = Some(eid);
        hazards
    }
}
