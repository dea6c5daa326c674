//! DOT Exporter
//!
//! Renders a [`DependencyGraph`] as Graphviz DOT.
//!
//! - One filled vertex per event, colored by event type.
//! - Data edges are solid, labelled `weight/tags`, with a pen width that
//!   grows with the weight up to [`ExportOptions::max_penwidth`].
//! - Control edges are dashed with a fixed pen width.

use std::fmt::Write;

use crate::config::ExportOptions;

use super::builder::DependencyGraph;
use super::edge::EdgeKind;

const CONTROL_PENWIDTH: f64 = 2.0;

/// Renders graphs with a fixed set of export options.
pub struct DotRenderer<'a> {
    options: &'a ExportOptions,
}

impl<'a> DotRenderer<'a> {
    pub fn new(options: &'a ExportOptions) -> Self {
        Self { options }
    }

    /// Convert the graph to a DOT string.
    pub fn render(&self, graph: &DependencyGraph) -> String {
        let mut dot = String::new();
        let _ = writeln!(dot, "digraph \"{}\" {{", escape(&self.options.graph_name));

        for event in graph.events() {
            let _ = writeln!(
                dot,
                "    {} [ color=\"{}\", style=filled, fontcolor=grey, tooltip=\"{}\" ];",
                event.id(),
                escape(event.color()),
                escape(event.label()),
            );
        }

        for edge in graph.edges() {
            match edge.kind {
                EdgeKind::Data if self.options.data_edges => {
                    let penwidth = f64::from(edge.weight).min(self.options.max_penwidth);
                    let _ = writeln!(
                        dot,
                        "    {} -> {} [ label=\"{}/{}\", penwidth={} ];",
                        edge.source, edge.target, edge.weight, edge.tags, penwidth
                    );
                }
                EdgeKind::Control if self.options.control_edges => {
                    let _ = writeln!(
                        dot,
                        "    {} -> {} [ label=\"{}\", penwidth={}, style=dashed ];",
                        edge.source, edge.target, edge.weight, CONTROL_PENWIDTH
                    );
                }
                _ => {}
            }
        }

        dot.push_str("}\n");
        dot
    }
}

/// Quote-safe text for DOT attribute values and identifiers.
fn escape(text: &str) -> String {
    text.replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}
