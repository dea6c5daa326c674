//! Trace Boundary
//!
//! Typed notifications and the decoders that read recorded traces. The
//! instrumentation layer itself lives outside this crate; it only has to
//! serialize [`Notification`] values in one of the [`TraceFormat`]s.

mod notification;
mod reader;

pub use notification::Notification;
pub use reader::{TraceFormat, TraceReader};
