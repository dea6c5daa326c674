//! Analysis Session
//!
//! The session is the central coordinator. It owns every piece of analysis
//! state and routes each notification to the components that care about it.
//!
//! # How It Works
//!
//! 1. An event start either creates a new event or deepens the nesting of
//!    the running one. Listener registrations for the started key are then
//!    correlated into control edges.
//!
//! 2. Name accesses are resolved through the scope chain, field accesses
//!    through the shadow store. Either way the resulting access log
//!    classifies the access against its previous reader and writer, and any
//!    hazard becomes a data edge.
//!
//! 3. Function values seen in a non-global scope are recorded as closures,
//!    so later activations of those functions resolve names through the
//!    captured scope.
//!
//! # Failure
//!
//! A fatal error (see [`AnalysisError::is_fatal`]) poisons the session: the
//! failing call returns the error and every later call returns
//! [`AnalysisError::Aborted`]. Output rendered from a poisoned session still
//! works and reflects the state right before the failure.

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;
use tracing::{debug, trace, warn};

use crate::config::SessionConfig;
use crate::error::{AnalysisError, Result};
use crate::event::{Activation, Completion, EventId, EventTracker, Palette};
use crate::graph::{ActivityReport, DependencyGraph, DotRenderer, EdgeKind};
use crate::listener::{ListenerKey, ListenerRegistry};
use crate::scope::{self, ScopeId, ScopeResolver};
use crate::shadow::{HazardEdge, ShadowStore};
use crate::trace::Notification;
use crate::value::{Handle, Value};

/// Counters describing a session so far.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SessionStats {
    /// Notifications accepted.
    pub notifications: u64,
    /// Top-level events created.
    pub events: usize,
    /// Event starts absorbed into a running event.
    pub hidden_activations: u64,
    pub data_edges: usize,
    pub control_edges: usize,
    /// Edge insertions rejected as self-loops or backward edges.
    pub discarded_edges: u64,
    /// Calls that were not followed by an instrumented function entry.
    pub uninstrumented_calls: u64,
}

impl SessionStats {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// One run of the dependency analysis over a notification stream.
pub struct AnalysisSession {
    config: SessionConfig,
    tracker: EventTracker,
    scopes: ScopeResolver,
    shadow: ShadowStore,
    listeners: ListenerRegistry,
    graph: DependencyGraph,

    notifications: u64,
    uninstrumented_calls: u64,
    /// Callee of the last `invoke`, until the next notification shows
    /// whether it was instrumented.
    pending_invoke: Option<Handle>,
    aborted: Option<String>,
}

impl AnalysisSession {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            tracker: EventTracker::new(Palette::new(config.palette.clone())),
            scopes: ScopeResolver::new(config.reserved_names.iter().cloned()),
            shadow: ShadowStore::new(),
            listeners: ListenerRegistry::new(),
            graph: DependencyGraph::new(),
            notifications: 0,
            uninstrumented_calls: 0,
            pending_invoke: None,
            aborted: None,
            config,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn graph(&self) -> &DependencyGraph {
        &self.graph
    }

    pub fn listeners(&self) -> &ListenerRegistry {
        &self.listeners
    }

    pub fn scopes(&self) -> &ScopeResolver {
        &self.scopes
    }

    pub fn shadow(&self) -> &ShadowStore {
        &self.shadow
    }

    /// The event accesses are currently attributed to.
    pub fn active_event(&self) -> Option<EventId> {
        self.tracker.active()
    }

    /// Current hidden-activation nesting depth.
    pub fn nesting_depth(&self) -> u32 {
        self.tracker.depth()
    }

    pub fn is_aborted(&self) -> bool {
        self.aborted.is_some()
    }

    /// Why the session aborted, if it did.
    pub fn abort_reason(&self) -> Option<&str> {
        self.aborted.as_deref()
    }

    /// Owners of the active registrations for `(event_type, receiver)`.
    pub fn query_listeners(&self, event_type: &str, receiver: Handle) -> Vec<Option<EventId>> {
        self.listeners.query(event_type, receiver)
    }

    pub fn stats(&self) -> SessionStats {
        SessionStats {
            notifications: self.notifications,
            events: self.graph.event_count(),
            hidden_activations: self.tracker.hidden_activations(),
            data_edges: self.graph.edge_count(EdgeKind::Data),
            control_edges: self.graph.edge_count(EdgeKind::Control),
            discarded_edges: self.graph.discarded_edges(),
            uninstrumented_calls: self.uninstrumented_calls,
        }
    }

    /// Render the dependency graph as Graphviz DOT.
    pub fn render_dot(&self) -> String {
        DotRenderer::new(&self.config.export).render(&self.graph)
    }

    pub fn activity_report(&self) -> ActivityReport {
        ActivityReport::from_graph(&self.graph)
    }

    // ------------------------------------------------------------------
    // Notification dispatch
    // ------------------------------------------------------------------

    /// Apply one decoded notification.
    pub fn apply(&mut self, notification: Notification) -> Result<()> {
        match notification {
            Notification::EventStart {
                event_type,
                receiver,
                payload,
                at,
            } => self.start_event(&event_type, receiver, &payload, at).map(drop),
            Notification::EventEnd { at } => self.end_event(at).map(drop),
            Notification::Enter { function } => self.enter_function(function).map(drop),
            Notification::Exit => self.exit_function().map(drop),
            Notification::Declare { name, value } => self.declare(&name, value),
            Notification::Read { name } => self.read_name(&name),
            Notification::Write { name, value } => self.write_name(&name, value),
            Notification::GetField { object } => self.read_field(object),
            Notification::PutField { object } => self.write_field(object),
            Notification::Literal { value } => self.literal(value),
            Notification::AddListener {
                event_type,
                receiver,
                callback,
                once,
            } => self
                .add_listener(&event_type, receiver, callback, once)
                .map(drop),
            Notification::RemoveListener {
                event_type,
                receiver,
                callback,
            } => self.remove_listener(&event_type, receiver, callback).map(drop),
            Notification::Branch => self.branch(),
            Notification::Invoke { function } => self.invoke(function),
            Notification::Collected { object } => self.object_collected(object).map(drop),
        }
    }

    /// Apply every notification of a decoded trace, stopping at the first
    /// error. Returns the number of notifications applied.
    pub fn replay<I>(&mut self, notifications: I) -> Result<usize>
    where
        I: IntoIterator<Item = Result<Notification>>,
    {
        let mut applied = 0;
        for notification in notifications {
            self.apply(notification?)?;
            applied += 1;
        }
        debug!(applied, "trace replayed");
        Ok(applied)
    }

    // ------------------------------------------------------------------
    // Event lifecycle
    // ------------------------------------------------------------------

    /// A callback for `event_type` emitted on `receiver` starts running.
    pub fn start_event(
        &mut self,
        event_type: &str,
        receiver: Handle,
        payload: &[Value],
        at: Option<u64>,
    ) -> Result<Activation> {
        self.run(false, |s| {
            let label = s.listeners.key(event_type, receiver).to_string();
            let activation = s.tracker.start(&mut s.graph, event_type, label, now(at));

            if let Activation::New(id) = activation {
                for value in payload {
                    if let Some(log) = s.shadow.access(value) {
                        for hazard in log.on_write(id) {
                            link(&mut s.graph, hazard, id, value);
                        }
                    }
                }
            }

            let target = activation.event();
            for owner in s.listeners.fire(event_type, receiver).into_iter().flatten() {
                if s.graph.add_control_edge(owner, target) {
                    trace!(source = %owner, target = %target, event_type, "listener fired");
                }
            }

            Ok(activation)
        })
    }

    /// The running callback finished.
    pub fn end_event(&mut self, at: Option<u64>) -> Result<Completion> {
        self.run(false, |s| s.tracker.end(&mut s.graph, now(at)))
    }

    // ------------------------------------------------------------------
    // Scopes
    // ------------------------------------------------------------------

    pub fn enter_function(&mut self, function: Handle) -> Result<ScopeId> {
        self.run(true, |s| {
            let id = s.scopes.enter_scope(function);
            trace!(function = %function, chain = %s.scopes.describe_chain(), "enter");
            Ok(id)
        })
    }

    pub fn exit_function(&mut self) -> Result<ScopeId> {
        self.run(false, |s| s.scopes.exit_scope())
    }

    /// Declare `name` in the current scope, initialized to `value`.
    pub fn declare(&mut self, name: &str, value: Value) -> Result<()> {
        self.run(false, |s| {
            s.scopes.declare(name)?;
            s.capture(value);
            Ok(())
        })
    }

    // ------------------------------------------------------------------
    // Accesses
    // ------------------------------------------------------------------

    /// Read `name` through the current scope chain.
    ///
    /// The name is validated even while idle, like [`declare`](Self::declare).
    pub fn read_name(&mut self, name: &str) -> Result<()> {
        self.run(false, |s| {
            scope::validate(name)?;
            let Some(eid) = s.tracker.active() else {
                return Ok(());
            };
            if let Some(hazard) = s.scopes.lookup(name)?.and_then(|log| log.on_read(eid)) {
                link(&mut s.graph, hazard, eid, &name);
            }
            Ok(())
        })
    }

    pub fn write_name(&mut self, name: &str, value: Value) -> Result<()> {
        self.run(false, |s| {
            scope::validate(name)?;
            s.capture(value);

            let Some(eid) = s.tracker.active() else {
                return Ok(());
            };
            if let Some(log) = s.scopes.lookup(name)? {
                for hazard in log.on_write(eid) {
                    link(&mut s.graph, hazard, eid, &name);
                }
            }
            Ok(())
        })
    }

    pub fn read_field(&mut self, object: Value) -> Result<()> {
        self.run(false, |s| {
            let Some(eid) = s.tracker.active() else {
                return Ok(());
            };
            if let Some(hazard) = s.shadow.access(&object).and_then(|log| log.on_read(eid)) {
                link(&mut s.graph, hazard, eid, &object);
            }
            Ok(())
        })
    }

    pub fn write_field(&mut self, object: Value) -> Result<()> {
        self.run(false, |s| {
            let Some(eid) = s.tracker.active() else {
                return Ok(());
            };
            if let Some(log) = s.shadow.access(&object) {
                for hazard in log.on_write(eid) {
                    link(&mut s.graph, hazard, eid, &object);
                }
            }
            Ok(())
        })
    }

    /// A literal was evaluated in the current scope.
    pub fn literal(&mut self, value: Value) -> Result<()> {
        self.run(false, |s| {
            s.capture(value);
            Ok(())
        })
    }

    // ------------------------------------------------------------------
    // Listeners
    // ------------------------------------------------------------------

    /// Register `callback` for `(event_type, receiver)`, owned by the
    /// active event.
    pub fn add_listener(
        &mut self,
        event_type: &str,
        receiver: Handle,
        callback: Handle,
        once: bool,
    ) -> Result<ListenerKey> {
        self.run(false, |s| {
            let owner = s.tracker.active();
            let key = s
                .listeners
                .register(owner, event_type, receiver, callback, once);
            trace!(key = %key, ?owner, once, "listener added");
            Ok(key)
        })
    }

    /// Returns the number of registrations removed.
    pub fn remove_listener(
        &mut self,
        event_type: &str,
        receiver: Handle,
        callback: Option<Handle>,
    ) -> Result<usize> {
        self.run(false, |s| Ok(s.listeners.unregister(event_type, receiver, callback)))
    }

    // ------------------------------------------------------------------
    // Activity
    // ------------------------------------------------------------------

    pub fn branch(&mut self) -> Result<()> {
        self.run(false, |s| {
            s.tracker.record_activity(&mut s.graph);
            Ok(())
        })
    }

    /// A call to `function` is about to happen.
    pub fn invoke(&mut self, function: Handle) -> Result<()> {
        self.run(false, |s| {
            s.tracker.record_activity(&mut s.graph);
            s.pending_invoke = Some(function);
            Ok(())
        })
    }

    /// `object` was collected by the observed runtime.
    ///
    /// Returns whether shadow state was released.
    pub fn object_collected(&mut self, object: Handle) -> Result<bool> {
        self.run(false, |s| Ok(s.shadow.release(object)))
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    /// Run one notification handler.
    ///
    /// Refuses input once aborted, settles a pending call against whether
    /// this notification is a function entry, and poisons the session on
    /// fatal errors.
    fn run<T>(&mut self, entering: bool, op: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        if let Some(reason) = &self.aborted {
            return Err(AnalysisError::Aborted {
                reason: reason.clone(),
            });
        }
        self.notifications += 1;

        if let Some(function) = self.pending_invoke.take() {
            if !entering {
                self.uninstrumented_calls += 1;
                warn!(function = %function, event = ?self.tracker.active(), "call into uninstrumented code");
            }
        }

        let result = op(self);
        if let Err(e) = &result {
            if e.is_fatal() {
                warn!(error = %e, "analysis aborted");
                self.aborted = Some(e.to_string());
            }
        }
        result
    }

    /// Record `value` as a closure over the current scope if it is a
    /// function.
    fn capture(&mut self, value: Value) {
        if let Some(function) = value.function() {
            if self.scopes.record_closure_if_needed(function) {
                trace!(function = %function, scope = self.scopes.current().index(), "closure");
            }
        }
    }
}

impl Default for AnalysisSession {
    fn default() -> Self {
        Self::new(SessionConfig::default())
    }
}

impl fmt::Debug for AnalysisSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnalysisSession")
            .field("active_event", &self.tracker.active())
            .field("stats", &self.stats())
            .field("aborted", &self.aborted)
            .finish()
    }
}

/// Turn a detected hazard into a data edge towards `target`.
fn link(graph: &mut DependencyGraph, hazard: HazardEdge, target: EventId, location: &dyn fmt::Debug) {
    if graph.add_data_edge(hazard.source, target, hazard.hazard) {
        trace!(
            source = %hazard.source,
            target = %target,
            hazard = %hazard.hazard,
            location = ?location,
            "hazard"
        );
    }
}

fn now(at: Option<u64>) -> u64 {
    at.unwrap_or_else(|| {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| d.as_millis() as u64)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn h(raw: u64) -> Handle {
        Handle::new(raw)
    }

    fn e(raw: u64) -> EventId {
        EventId::from(raw)
    }

    fn session() -> AnalysisSession {
        AnalysisSession::default()
    }

    /// Run one complete event that performs `body`.
    fn event(s: &mut AnalysisSession, event_type: &str, body: impl FnOnce(&mut AnalysisSession)) -> EventId {
        let id = s.start_event(event_type, h(1), &[], Some(0)).unwrap().event();
        body(s);
        s.end_event(Some(0)).unwrap();
        id
    }

    fn data_edges(s: &AnalysisSession) -> Vec<(u64, u64, String)> {
        s.graph()
            .edges()
            .into_iter()
            .filter(|edge| edge.kind == EdgeKind::Data)
            .map(|edge| (edge.source.raw(), edge.target.raw(), edge.tags.to_string()))
            .collect()
    }

    #[test]
    fn global_write_then_read_across_events() {
        let mut s = session();
        event(&mut s, "tick", |s| s.write_name("count", Value::Primitive).unwrap());
        event(&mut s, "tick", |s| s.read_name("count").unwrap());

        assert_eq!(data_edges(&s), vec![(0, 1, "RAW".to_string())]);
    }

    #[test]
    fn accesses_outside_events_are_ignored() {
        let mut s = session();
        s.write_name("x", Value::Primitive).unwrap();
        s.write_field(Value::Object(h(3))).unwrap();
        event(&mut s, "tick", |s| s.read_name("x").unwrap());

        assert!(data_edges(&s).is_empty());
        assert!(s.shadow().is_empty());
    }

    #[test]
    fn field_hazards_use_object_identity() {
        let mut s = session();
        let obj = Value::Object(h(9));
        event(&mut s, "a", |s| s.read_field(obj).unwrap());
        event(&mut s, "b", |s| s.write_field(obj).unwrap());
        event(&mut s, "c", |s| s.write_field(Value::Primitive).unwrap());

        assert_eq!(data_edges(&s), vec![(0, 1, "WAR".to_string())]);
    }

    #[test]
    fn payload_objects_are_written_by_new_event() {
        let mut s = session();
        let buf = Value::Object(h(20));
        event(&mut s, "read", |s| s.read_field(buf).unwrap());

        s.start_event("data", h(1), &[buf], Some(1)).unwrap();
        s.end_event(Some(2)).unwrap();

        assert_eq!(data_edges(&s), vec![(0, 1, "WAR".to_string())]);
    }

    #[test]
    fn listener_registration_produces_control_edge() {
        let mut s = session();
        let owner = event(&mut s, "load", |s| {
            s.add_listener("click", h(5), h(50), false).unwrap();
        });
        let fired = s.start_event("click", h(5), &[], None).unwrap().event();
        s.end_event(None).unwrap();

        assert!(s.graph().event(fired).unwrap().control_deps().contains_key(&owner));
        assert_eq!(s.query_listeners("click", h(5)), vec![Some(owner)]);
    }

    #[test]
    fn idle_registration_is_consumed_without_edge() {
        let mut s = session();
        s.add_listener("ready", h(1), h(40), true).unwrap();
        assert_eq!(s.query_listeners("ready", h(1)), vec![None]);

        event(&mut s, "ready", |_| {});
        assert!(s.query_listeners("ready", h(1)).is_empty());
        assert_eq!(s.stats().control_edges, 0);
    }

    #[test]
    fn label_uses_receiver_sequence() {
        let mut s = session();
        s.start_event("click", h(77), &[], Some(0)).unwrap();
        s.end_event(Some(0)).unwrap();
        s.start_event("click", h(78), &[], Some(0)).unwrap();
        s.end_event(Some(0)).unwrap();

        let labels: Vec<_> = s.graph().events().map(|e| e.label().to_string()).collect();
        assert_eq!(labels, vec!["click#0", "click#1"]);
    }

    #[test]
    fn closure_resolves_through_captured_scope() {
        let mut s = session();
        let outer = h(100);
        let inner = h(101);

        // outer() { var n; return function inner() { n } }
        s.enter_function(outer).unwrap();
        s.declare("n", Value::Primitive).unwrap();
        s.literal(Value::Function(inner)).unwrap();
        s.exit_function().unwrap();

        let first = event(&mut s, "tick", |s| {
            s.enter_function(inner).unwrap();
            s.write_name("n", Value::Primitive).unwrap();
            s.exit_function().unwrap();
        });
        let second = event(&mut s, "tick", |s| {
            s.enter_function(inner).unwrap();
            s.read_name("n").unwrap();
            s.exit_function().unwrap();
        });

        assert_eq!(
            data_edges(&s),
            vec![(first.raw(), second.raw(), "RAW".to_string())]
        );
        // `n` never leaked into the global scope.
        let global = s.scopes().scope(ScopeId::GLOBAL).unwrap();
        assert!(!global.declares("n"));
    }

    #[test]
    fn fatal_error_poisons_session() {
        let mut s = session();
        assert!(matches!(s.end_event(None), Err(AnalysisError::UnmatchedEnd)));
        assert!(s.is_aborted());

        match s.branch() {
            Err(AnalysisError::Aborted { reason }) => assert!(reason.contains("no active event")),
            other => panic!("expected abort, got {other:?}"),
        }
    }

    #[test]
    fn invalid_name_is_fatal_while_active() {
        let mut s = session();
        s.start_event("tick", h(1), &[], None).unwrap();
        assert!(matches!(s.read_name("1x"), Err(AnalysisError::InvalidName(_))));
        assert!(s.is_aborted());
    }

    #[test]
    fn invalid_name_is_fatal_while_idle() {
        let mut s = session();
        assert!(matches!(s.read_name(""), Err(AnalysisError::InvalidName(_))));
        assert!(s.is_aborted());

        let mut s = session();
        assert!(matches!(
            s.write_name("a b", Value::Primitive),
            Err(AnalysisError::InvalidName(_))
        ));
        assert!(s.is_aborted());

        let mut s = session();
        assert!(matches!(
            s.declare("1x", Value::Undefined),
            Err(AnalysisError::InvalidName(_))
        ));
        assert!(s.is_aborted());
    }

    #[test]
    fn unicode_names_do_not_abort() {
        let mut s = session();
        s.start_event("tick", h(1), &[], None).unwrap();
        for name in ["cafe\u{301}", "a\u{200c}b", "x\u{200d}y"] {
            s.write_name(name, Value::Primitive).unwrap();
            s.read_name(name).unwrap();
        }
        s.end_event(None).unwrap();
        assert!(!s.is_aborted());
    }

    #[test]
    fn scope_underflow_is_fatal() {
        let mut s = session();
        assert!(matches!(s.exit_function(), Err(AnalysisError::ScopeUnderflow)));
        assert!(s.is_aborted());
    }

    #[test]
    fn uninstrumented_calls_are_counted() {
        let mut s = session();
        event(&mut s, "tick", |s| {
            s.invoke(h(1)).unwrap();
            s.enter_function(h(1)).unwrap();
            s.exit_function().unwrap();
            s.invoke(h(2)).unwrap();
            s.branch().unwrap();
        });

        let stats = s.stats();
        assert_eq!(stats.uninstrumented_calls, 1);
        assert_eq!(s.graph().event(e(0)).unwrap().activity(), 3);
    }

    #[test]
    fn collected_objects_release_shadow_state() {
        let mut s = session();
        let obj = Value::Object(h(4));
        event(&mut s, "a", |s| s.write_field(obj).unwrap());
        assert_eq!(s.shadow().len(), 1);

        assert!(s.object_collected(h(4)).unwrap());
        event(&mut s, "b", |s| s.read_field(obj).unwrap());
        assert!(data_edges(&s).is_empty());
    }

    #[test]
    fn apply_dispatches_notifications() {
        let mut s = session();
        let trace = vec![
            Notification::EventStart {
                event_type: "tick".into(),
                receiver: h(1),
                payload: vec![],
                at: Some(3),
            },
            Notification::Write {
                name: "x".into(),
                value: Value::Primitive,
            },
            Notification::EventEnd { at: Some(4) },
            Notification::EventStart {
                event_type: "tick".into(),
                receiver: h(1),
                payload: vec![],
                at: Some(5),
            },
            Notification::Read { name: "x".into() },
            Notification::EventEnd { at: Some(9) },
        ];

        let applied = s.replay(trace.into_iter().map(Ok)).unwrap();
        assert_eq!(applied, 6);
        assert_eq!(s.stats().notifications, 6);
        assert_eq!(data_edges(&s), vec![(0, 1, "RAW".to_string())]);
        assert_eq!(s.graph().event(e(1)).unwrap().duration(), Some(4));
    }
}
