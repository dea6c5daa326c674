//! Dependency Graph Builder
//!
//! Owns every event vertex of a session and aggregates the edges discovered
//! between them.
//!
//! # Aggregation
//!
//! Edges are keyed by `(source, target, kind)`. Recording the same edge
//! again bumps its weight and unions its hazard tags instead of adding a
//! parallel edge.
//!
//! # Direction
//!
//! Event ids grow with creation order, and an edge may only point forward.
//! Anything else (self-loops in particular, which arise when an event
//! re-fires a listener it registered itself) is discarded and counted.

use indexmap::IndexMap;
use tracing::trace;

use crate::event::EventId;
use crate::shadow::Hazard;

use super::edge::{DependencyEdge, EdgeKind};
use super::node::Event;

/// All events of a session and the dependences between them.
#[derive(Debug, Default)]
pub struct DependencyGraph {
    /// Events in creation order, indexed by ID.
    events: IndexMap<EventId, Event>,

    /// Edges rejected by the direction check.
    discarded: u64,
}

impl DependencyGraph {
    /// Create a new empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an event vertex.
    pub fn add_event(&mut self, event: Event) -> EventId {
        let id = event.id();
        self.events.insert(id, event);
        id
    }

    /// Get a reference to an event.
    pub fn event(&self, id: EventId) -> Option<&Event> {
        self.events.get(&id)
    }

    pub(crate) fn event_mut(&mut self, id: EventId) -> Option<&mut Event> {
        self.events.get_mut(&id)
    }

    /// Events in creation order.
    pub fn events(&self) -> impl Iterator<Item = &Event> {
        self.events.values()
    }

    /// Get the total number of events in the graph.
    pub fn event_count(&self) -> usize {
        self.events.len()
    }

    /// Record a data dependence `source -> target` caused by `hazard`.
    ///
    /// Returns whether the edge was recorded.
    pub fn add_data_edge(&mut self, source: EventId, target: EventId, hazard: Hazard) -> bool {
        match self.admit(source, target, EdgeKind::Data) {
            Some(event) => {
                event.add_data_dependence(source, hazard);
                true
            }
            None => false,
        }
    }

    /// Record a control dependence `source -> target`.
    ///
    /// Returns whether the edge was recorded.
    pub fn add_control_edge(&mut self, source: EventId, target: EventId) -> bool {
        match self.admit(source, target, EdgeKind::Control) {
            Some(event) => {
                event.add_control_dependence(source);
                true
            }
            None => false,
        }
    }

    /// Check the direction invariant and find the open target vertex.
    fn admit(&mut self, source: EventId, target: EventId, kind: EdgeKind) -> Option<&mut Event> {
        let open = source < target
            && self.events.contains_key(&source)
            && self.events.get(&target).map_or(false, |t| !t.is_sealed());

        if !open {
            trace!(%source, %target, %kind, "discarding edge");
            self.discarded += 1;
            return None;
        }
        self.events.get_mut(&target)
    }

    /// All aggregated edges, grouped by target in creation order. Data edges
    /// of a target precede its control edges.
    pub fn edges(&self) -> Vec<DependencyEdge> {
        let mut edges = Vec::new();
        for event in self.events.values() {
            for (source, dep) in event.data_deps() {
                edges.push(DependencyEdge {
                    source: *source,
                    target: event.id(),
                    kind: EdgeKind::Data,
                    weight: dep.weight,
                    tags: dep.tags.clone(),
                });
            }
            for (source, dep) in event.control_deps() {
                edges.push(DependencyEdge {
                    source: *source,
                    target: event.id(),
                    kind: EdgeKind::Control,
                    weight: dep.weight,
                    tags: Default::default(),
                });
            }
        }
        edges
    }

    /// Number of distinct edges of `kind`.
    pub fn edge_count(&self, kind: EdgeKind) -> usize {
        self.events
            .values()
            .map(|e| match kind {
                EdgeKind::Data => e.data_deps().len(),
                EdgeKind::Control => e.control_deps().len(),
            })
            .sum()
    }

    /// Number of edges rejected by the direction check.
    pub fn discarded_edges(&self) -> u64 {
        self.discarded
    }
}
