//! Graph Nodes
//!
//! Each vertex of the dependency graph is one traced [`Event`].
//!
//! Every edge the engine discovers points *into* the event that is active at
//! the time, so dependences are stored on their target, keyed by source.
//! Once an event is sealed nothing targets it any more, which is what keeps
//! sealed events immutable.

use indexmap::IndexMap;

use crate::event::EventId;
use crate::shadow::Hazard;

use super::edge::HazardTags;

/// Aggregated data dependence from one source event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DataDependence {
    /// Number of hazards observed between the two events.
    pub weight: u32,
    /// Distinct hazard kinds among them.
    pub tags: HazardTags,
}

/// Aggregated control dependence from one source event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ControlDependence {
    /// Number of listener firings that linked the two events.
    pub weight: u32,
}

/// One discrete execution of a traced callback.
#[derive(Debug, Clone)]
pub struct Event {
    id: EventId,

    /// Event type the callback was fired for (e.g. `"click"`).
    event_type: String,

    /// Derived from the listener key, e.g. `"click#3"`.
    label: String,

    /// Display color, shared by all events of one type.
    color: String,

    /// Timestamps in milliseconds.
    started_at: u64,
    ended_at: Option<u64>,

    /// Branches and calls observed while this event was active.
    activity: u64,

    /// Incoming data dependences, keyed by source event.
    data_deps: IndexMap<EventId, DataDependence>,

    /// Incoming control dependences, keyed by source event.
    control_deps: IndexMap<EventId, ControlDependence>,
}

impl Event {
    /// Create a new, unsealed event.
    pub fn new(
        id: EventId,
        event_type: impl Into<String>,
        label: impl Into<String>,
        color: impl Into<String>,
        started_at: u64,
    ) -> Self {
        Self {
            id,
            event_type: event_type.into(),
            label: label.into(),
            color: color.into(),
            started_at,
            ended_at: None,
            activity: 0,
            data_deps: IndexMap::new(),
            control_deps: IndexMap::new(),
        }
    }

    pub fn id(&self) -> EventId {
        self.id
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn color(&self) -> &str {
        &self.color
    }

    pub fn started_at(&self) -> u64 {
        self.started_at
    }

    pub fn ended_at(&self) -> Option<u64> {
        self.ended_at
    }

    /// Wall time between start and end, once sealed.
    pub fn duration(&self) -> Option<u64> {
        self.ended_at.map(|end| end.saturating_sub(self.started_at))
    }

    pub fn activity(&self) -> u64 {
        self.activity
    }

    /// Whether the matching end was seen.
    pub fn is_sealed(&self) -> bool {
        self.ended_at.is_some()
    }

    pub fn data_deps(&self) -> &IndexMap<EventId, DataDependence> {
        &self.data_deps
    }

    pub fn control_deps(&self) -> &IndexMap<EventId, ControlDependence> {
        &self.control_deps
    }

    /// Count one branch or call. Ignored once sealed.
    pub(crate) fn record_activity(&mut self) -> bool {
        if self.is_sealed() {
            return false;
        }
        self.activity += 1;
        true
    }

    /// Freeze the event. Sealing twice keeps the first timestamp.
    pub(crate) fn seal(&mut self, ended_at: u64) {
        if self.ended_at.is_none() {
            self.ended_at = Some(ended_at);
        }
    }

    pub(crate) fn add_data_dependence(&mut self, source: EventId, hazard: Hazard) {
        let dep = self.data_deps.entry(source).or_default();
        dep.weight = dep.weight.saturating_add(1);
        dep.tags.insert(hazard);
    }

    pub(crate) fn add_control_dependence(&mut self, source: EventId) {
        let dep = self.control_deps.entry(source).or_default();
        dep.weight = dep.weight.saturating_add(1);
    }
}
