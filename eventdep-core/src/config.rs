//! Session Configuration
//!
//! Everything here has a default, so an empty JSON object (or no config
//! file at all) yields a working session.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Settings for one analysis session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Colors handed out to event types in order of first sight.
    pub palette: Vec<String>,

    /// Names that never resolve to a binding.
    pub reserved_names: Vec<String>,

    /// Graph rendering options.
    pub export: ExportOptions,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            palette: ["red", "blue", "green", "purple", "black"]
                .into_iter()
                .map(String::from)
                .collect(),
            reserved_names: vec!["hasOwnProperty".to_string()],
            export: ExportOptions::default(),
        }
    }
}

impl SessionConfig {
    /// Parse a configuration from a JSON string.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a configuration from a JSON file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }
}

/// Options for the DOT exporter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportOptions {
    /// Name of the emitted digraph.
    pub graph_name: String,

    /// Emit data (hazard) edges.
    pub data_edges: bool,

    /// Emit control (listener) edges.
    pub control_edges: bool,

    /// Upper bound for the pen width of weighted data edges.
    pub max_penwidth: f64,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            graph_name: "edg".to_string(),
            data_edges: true,
            control_edges: true,
            max_penwidth: 4.0,
        }
    }
}
