//! Eventdep Core
//!
//! This crate provides the analysis engine for eventdep, a dynamic
//! dependency analyzer for event-driven programs. Given the ordered stream
//! of notifications an instrumentation layer emits while a callback-driven
//! program runs, it reconstructs which callback executions ("events")
//! depend on which, and why.
//!
//! It implements:
//!
//! - Lexical scope and closure resolution for name accesses
//! - Shadow memory classifying accesses as RAW / WAW / WAR hazards
//! - Correlation of listener registrations with later event firings
//! - An event lifecycle state machine tolerant of synchronous re-entrancy
//! - A dependency graph with Graphviz DOT output and an activity report
//!
//! # Architecture
//!
//! - `session`: the [`AnalysisSession`] that owns all state and dispatches
//!   notifications
//! - `event`: event ids, lifecycle tracking and colors
//! - `scope`: scope chains and closures
//! - `shadow`: per-location access logs and hazard classification
//! - `listener`: listener registrations keyed by event type and receiver
//! - `graph`: the dependency graph and its renderers
//! - `trace`: typed notifications and trace decoding
//!
//! # Example
//!
//! ```rust
//! use eventdep_core::{AnalysisSession, Handle, Value};
//!
//! let mut session = AnalysisSession::default();
//! let emitter = Handle::new(1);
//!
//! // First event writes a global...
//! session.start_event("tick", emitter, &[], Some(0))?;
//! session.write_name("count", Value::Primitive)?;
//! session.end_event(Some(1))?;
//!
//! // ...and the second one reads it.
//! session.start_event("tick", emitter, &[], Some(2))?;
//! session.read_name("count")?;
//! session.end_event(Some(3))?;
//!
//! assert_eq!(session.stats().data_edges, 1);
//! assert!(session.render_dot().contains("0 -> 1"));
//! # Ok::<(), eventdep_core::AnalysisError>(())
//! ```

pub mod config;
pub mod error;
pub mod event;
pub mod graph;
pub mod listener;
pub mod scope;
pub mod session;
pub mod shadow;
pub mod trace;
pub mod value;

pub use config::{ExportOptions, SessionConfig};
pub use error::{AnalysisError, Result};
pub use event::EventId;
pub use graph::{ActivityReport, DependencyGraph};
pub use session::{AnalysisSession, SessionStats};
pub use trace::{Notification, TraceFormat, TraceReader};
pub use value::{Handle, Value};
