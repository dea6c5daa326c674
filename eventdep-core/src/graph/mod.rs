//! Dependency Graph
//!
//! This module accumulates the causal relationships discovered between
//! events and renders them.
//!
//! # Overview
//!
//! The dependency graph is a directed acyclic graph where:
//!
//! - Nodes represent traced events, in creation order
//! - Edges represent dependences: if B depends on A, there is an edge from A
//!   to B. Data edges come from hazards on shared locations, control edges
//!   from listener registration and firing.
//!
//! Edges only ever point from an older event to a newer one, which is what
//! keeps the graph acyclic.
//!
//! # Output
//!
//! - [`DotRenderer`] emits Graphviz DOT.
//! - [`ActivityReport`] lists per-event activity counters and timings.

mod builder;
mod dot;
mod edge;
mod node;
mod report;

pub use builder::DependencyGraph;
pub use dot::DotRenderer;
pub use edge::{DependencyEdge, EdgeKind, HazardTags};
pub use node::{ControlDependence, DataDependence, Event};
pub use report::{ActivityEntry, ActivityReport};
