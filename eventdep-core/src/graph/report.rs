//! Activity Report
//!
//! Per-event companion to the DOT graph: how much work each event did and
//! how long it ran.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::event::EventId;

use super::builder::DependencyGraph;

/// One row of the activity report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityEntry {
    pub id: EventId,
    pub label: String,
    /// Branches and calls observed while the event was active.
    pub activity: u64,
    pub started_at: u64,
    pub ended_at: Option<u64>,
    pub duration_ms: Option<u64>,
}

/// Activity of every event in creation order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityReport {
    pub events: Vec<ActivityEntry>,
}

impl ActivityReport {
    /// Snapshot the activity of every event in `graph`.
    pub fn from_graph(graph: &DependencyGraph) -> Self {
        let events = graph
            .events()
            .map(|event| ActivityEntry {
                id: event.id(),
                label: event.label().to_string(),
                activity: event.activity(),
                started_at: event.started_at(),
                ended_at: event.ended_at(),
                duration_ms: event.duration(),
            })
            .collect();
        Self { events }
    }

    /// Serialize the report as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Look up the entry of one event.
    pub fn entry(&self, id: EventId) -> Option<&ActivityEntry> {
        self.events.iter().find(|e| e.id == id)
    }
}

impl fmt::Display for ActivityReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{:>6}  {:<24} {:>10} {:>10}", "id", "label", "activity", "ms")?;
        for entry in &self.events {
            let duration = entry
                .duration_ms
                .map_or_else(|| "open".to_string(), |ms| ms.to_string());
            writeln!(
                f,
                "{:>6}  {:<24} {:>10} {:>10}",
                entry.id, entry.label, entry.activity, duration
            )?;
        }
        Ok(())
    }
}
