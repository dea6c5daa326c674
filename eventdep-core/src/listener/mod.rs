//! Listener Correlation
//!
//! Control dependences come from the registration/firing protocol of the
//! observed runtime: an event that registers a listener causes every later
//! event produced by firing that listener.

mod registry;

pub use registry::{ListenerKey, ListenerRegistry, Registration};
