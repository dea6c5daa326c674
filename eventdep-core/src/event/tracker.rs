//! Event Tracker
//!
//! The tracker knows which event, if any, the observed program is currently
//! executing. Every access notification is attributed to that event.
//!
//! # States
//!
//! - `Idle`: top-level code runs; accesses are not attributed to anything.
//! - `Active { event, depth }`: the body of `event` runs. `depth` counts
//!   hidden activations, i.e. event starts that arrive synchronously from
//!   inside the running body (an emitter invoking its listeners inline).
//!
//! A hidden activation does not get a vertex of its own; whatever it touches
//! belongs to the outer event. Its matching end only unwinds `depth`, and
//! the outer event is sealed by the end that brings the tracker back to
//! `Idle`.

use tracing::debug;

use crate::error::{AnalysisError, Result};
use crate::graph::{DependencyGraph, Event};

use super::id::EventId;
use super::palette::Palette;

/// State of the event lifecycle machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackerState {
    Idle,
    Active { event: EventId, depth: u32 },
}

/// Result of an event start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activation {
    /// A new top-level event was created.
    New(EventId),
    /// A hidden activation inside the running event.
    Nested { event: EventId, depth: u32 },
}

impl Activation {
    /// The event that accesses are now attributed to.
    pub fn event(&self) -> EventId {
        match self {
            Activation::New(id) => *id,
            Activation::Nested { event, .. } => *event,
        }
    }
}

/// Result of an event end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// The outer event finished and was sealed.
    Sealed(EventId),
    /// A hidden activation finished; the outer event keeps running.
    Unwound { event: EventId, depth: u32 },
}

/// Lifecycle state machine for traced events.
#[derive(Debug)]
pub struct EventTracker {
    state: TrackerState,
    next_id: EventId,
    palette: Palette,
    hidden: u64,
}

impl EventTracker {
    pub fn new(palette: Palette) -> Self {
        Self {
            state: TrackerState::Idle,
            next_id: EventId::from(0),
            palette,
            hidden: 0,
        }
    }

    pub fn state(&self) -> TrackerState {
        self.state
    }

    /// The event accesses are currently attributed to.
    pub fn active(&self) -> Option<EventId> {
        match self.state {
            TrackerState::Idle => None,
            TrackerState::Active { event, .. } => Some(event),
        }
    }

    /// Current nesting depth. Zero when idle or running a top-level event.
    pub fn depth(&self) -> u32 {
        match self.state {
            TrackerState::Idle => 0,
            TrackerState::Active { depth, .. } => depth,
        }
    }

    /// Total hidden activations seen so far.
    pub fn hidden_activations(&self) -> u64 {
        self.hidden
    }

    /// Handle an event start.
    ///
    /// When idle, allocates the next id and adds the event vertex to `graph`.
    /// When active, only deepens the nesting.
    pub fn start(
        &mut self,
        graph: &mut DependencyGraph,
        event_type: &str,
        label: String,
        now: u64,
    ) -> Activation {
        match self.state {
            TrackerState::Idle => {
                let id = self.next_id;
                self.next_id = id.next();

                let color = self.palette.color_for(event_type).to_string();
                graph.add_event(Event::new(id, event_type, label, color, now));
                self.state = TrackerState::Active { event: id, depth: 0 };

                debug!(event = %id, event_type, "new event");
                Activation::New(id)
            }
            TrackerState::Active { event, depth } => {
                let depth = depth + 1;
                self.state = TrackerState::Active { event, depth };
                self.hidden += 1;

                debug!(event = %event, event_type, depth, "hidden activation");
                Activation::Nested { event, depth }
            }
        }
    }

    /// Handle an event end.
    ///
    /// Ending while idle means the stream is inconsistent and is fatal.
    pub fn end(&mut self, graph: &mut DependencyGraph, now: u64) -> Result<Completion> {
        match self.state {
            TrackerState::Idle => Err(AnalysisError::UnmatchedEnd),
            TrackerState::Active { event, depth: 0 } => {
                if let Some(ev) = graph.event_mut(event) {
                    ev.seal(now);
                    debug!(
                        event = %event,
                        activity = ev.activity(),
                        duration_ms = ev.duration().unwrap_or(0),
                        "event sealed"
                    );
                }
                self.state = TrackerState::Idle;
                Ok(Completion::Sealed(event))
            }
            TrackerState::Active { event, depth } => {
                let depth = depth - 1;
                self.state = TrackerState::Active { event, depth };
                Ok(Completion::Unwound { event, depth })
            }
        }
    }

    /// Count a branch or call against the active event.
    ///
    /// Returns `false` when idle.
    pub fn record_activity(&mut self, graph: &mut DependencyGraph) -> bool {
        self.active()
            .and_then(|id| graph.event_mut(id))
            .map_or(false, Event::record_activity)
    }
}

impl Default for EventTracker {
    fn default() -> Self {
        Self::new(Palette::new(vec!["black".to_string()]))
    }
}
