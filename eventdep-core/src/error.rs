//! Analysis Errors
//!
//! The engine distinguishes two classes of failure:
//!
//! - **Fatal** conditions mean the notification stream disagrees with the
//!   event/scope state machines. Any output produced after one of these would
//!   be unreliable, so the session aborts and refuses further input.
//! - **Boundary** errors come from decoding traces or reading configuration.
//!   They never touch session state.
//!
//! Accesses to non-reference values, lookup misses and unregistering an
//! unknown listener are not errors at all; they are silently ignored.

use thiserror::Error;

/// Errors raised by the analysis engine and its trace/config boundary.
#[derive(Error, Debug)]
pub enum AnalysisError {
    /// An event-end notification arrived while no event was active.
    #[error("event end with no active event")]
    UnmatchedEnd,

    /// A function exit arrived with an empty scope stack.
    #[error("scope exit with an empty scope stack")]
    ScopeUnderflow,

    /// A name notification carried something that is not an identifier.
    #[error("invalid identifier {0:?}")]
    InvalidName(String),

    /// The session hit a fatal error earlier and refuses further input.
    #[error("analysis session aborted: {reason}")]
    Aborted { reason: String },

    /// A JSON Lines trace record could not be decoded.
    #[error("trace line {line}: {source}")]
    Decode {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("MessagePack decode error: {0}")]
    MessagePack(#[from] rmp_serde::decode::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AnalysisError {
    /// Whether this error must abort the analysis session.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            AnalysisError::UnmatchedEnd
                | AnalysisError::ScopeUnderflow
                | AnalysisError::InvalidName(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, AnalysisError>;
