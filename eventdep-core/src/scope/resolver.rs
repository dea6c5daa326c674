//! Scope Resolver
//!
//! Tracks the lexical scope chain of the observed program at run time so a
//! textual name can be mapped to the binding it actually refers to.
//!
//! # Model
//!
//! - Every function activation creates a fresh [`Scope`].
//! - A function value created while a non-global scope is current is a
//!   *closure*: it remembers that scope, and every later activation of the
//!   function uses it as the lexical parent.
//! - Activations of any other function hang directly off the global scope.
//!
//! # Lifetime
//!
//! Scopes live in an arena and are addressed by [`ScopeId`]. A scope is
//! referenced by the call stack while its activation runs, and by the closure
//! table once some closure captured it. Capture can only happen while a scope
//! is current, so when an activation exits its scope is released right away
//! unless a closure holds it. Captured scopes live as long as the closure
//! table, i.e. for the whole session.

use std::collections::HashMap;

use unicode_xid::UnicodeXID;

use crate::error::{AnalysisError, Result};
use crate::shadow::AccessLog;
use crate::value::Handle;

/// Handle of a scope in the resolver's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeId(usize);

impl ScopeId {
    /// The global scope. Always live.
    pub const GLOBAL: ScopeId = ScopeId(0);

    pub fn index(&self) -> usize {
        self.0
    }
}

/// One function activation (or the global scope).
#[derive(Debug)]
pub struct Scope {
    /// The activated function. `None` for the global scope.
    function: Option<Handle>,

    /// Lexical parent. `None` only for the global scope.
    parent: Option<ScopeId>,

    /// Bindings declared in this scope.
    namespace: HashMap<String, AccessLog>,

    /// Whether some closure captured this scope.
    captured: bool,
}

impl Scope {
    fn new(function: Option<Handle>, parent: Option<ScopeId>) -> Self {
        Self {
            function,
            parent,
            namespace: HashMap::new(),
            captured: false,
        }
    }

    pub fn function(&self) -> Option<Handle> {
        self.function
    }

    pub fn parent(&self) -> Option<ScopeId> {
        self.parent
    }

    pub fn is_captured(&self) -> bool {
        self.captured
    }

    /// Whether `name` is declared directly in this scope.
    pub fn declares(&self, name: &str) -> bool {
        self.namespace.contains_key(name)
    }
}

/// Runtime scope chain plus closure table.
#[derive(Debug)]
pub struct ScopeResolver {
    /// Scope arena. Released slots are `None` and recycled through `free`.
    scopes: Vec<Option<Scope>>,
    free: Vec<usize>,

    /// Function identity -> scope captured when the function was created.
    closures: HashMap<Handle, ScopeId>,

    /// Callers of the current activation, innermost last.
    stack: Vec<ScopeId>,
    current: ScopeId,

    /// Names that are never bound (inherited housekeeping properties).
    reserved: Vec<String>,
}

impl ScopeResolver {
    /// Create a resolver holding only the global scope.
    pub fn new<I, S>(reserved: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            scopes: vec![Some(Scope::new(None, None))],
            free: Vec::new(),
            closures: HashMap::new(),
            stack: Vec::new(),
            current: ScopeId::GLOBAL,
            reserved: reserved.into_iter().map(Into::into).collect(),
        }
    }

    /// The scope of the running activation.
    pub fn current(&self) -> ScopeId {
        self.current
    }

    /// Whether the global scope is current.
    pub fn at_global(&self) -> bool {
        self.current == ScopeId::GLOBAL
    }

    /// Number of activations on the call stack.
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Access a live scope.
    pub fn scope(&self, id: ScopeId) -> Option<&Scope> {
        self.scopes.get(id.0).and_then(Option::as_ref)
    }

    /// The scope a closure captured, if `function` is a known closure.
    pub fn closure_scope(&self, function: Handle) -> Option<ScopeId> {
        self.closures.get(&function).copied()
    }

    /// Number of scopes currently held in the arena (global included).
    pub fn live_scopes(&self) -> usize {
        self.scopes.iter().filter(|s| s.is_some()).count()
    }

    /// Activate `function`, making its new scope current.
    pub fn enter_scope(&mut self, function: Handle) -> ScopeId {
        let parent = self.closure_scope(function).unwrap_or(ScopeId::GLOBAL);
        let id = self.allocate(Scope::new(Some(function), Some(parent)));

        self.stack.push(self.current);
        self.current = id;
        id
    }

    /// Leave the current activation and return to the caller's scope.
    ///
    /// The finished scope is released unless a closure captured it.
    pub fn exit_scope(&mut self) -> Result<ScopeId> {
        let caller = self.stack.pop().ok_or(AnalysisError::ScopeUnderflow)?;
        let finished = std::mem::replace(&mut self.current, caller);

        let captured = self.scope(finished).map_or(true, Scope::is_captured);
        if !captured {
            self.scopes[finished.0] = None;
            self.free.push(finished.0);
        }

        Ok(caller)
    }

    /// Declare `name` in the current scope.
    ///
    /// Returns `true` if a new binding was created. Reserved names and names
    /// already declared here are left alone.
    pub fn declare(&mut self, name: &str) -> Result<bool> {
        validate(name)?;
        if self.is_reserved(name) {
            return Ok(false);
        }

        let scope = self.live_mut(self.current);
        if scope.declares(name) {
            return Ok(false);
        }
        scope.namespace.insert(name.to_string(), AccessLog::new());
        Ok(true)
    }

    /// Resolve `name` through the current scope chain.
    ///
    /// The global scope creates bindings on demand, since top-level names can
    /// be read before any declaration is observed. `None` means the name is
    /// not tracked.
    pub fn lookup(&mut self, name: &str) -> Result<Option<&mut AccessLog>> {
        validate(name)?;
        if self.is_reserved(name) {
            return Ok(None);
        }

        let mut cursor = Some(self.current);
        while let Some(id) = cursor {
            let (declared, parent) = {
                let scope = self.live(id);
                (scope.declares(name), scope.parent)
            };

            if declared {
                return Ok(self.live_mut(id).namespace.get_mut(name));
            }
            if id == ScopeId::GLOBAL {
                let log = self
                    .live_mut(id)
                    .namespace
                    .entry(name.to_string())
                    .or_default();
                return Ok(Some(log));
            }
            cursor = parent;
        }

        Ok(None)
    }

    /// Record `function` as a closure over the current scope.
    ///
    /// Only functions created outside the global scope are closures. The
    /// first capture of a function identity wins; returns whether a new
    /// closure was recorded.
    pub fn record_closure_if_needed(&mut self, function: Handle) -> bool {
        if self.at_global() || self.closures.contains_key(&function) {
            return false;
        }

        let current = self.current;
        self.live_mut(current).captured = true;
        self.closures.insert(function, current);
        true
    }

    /// Render the chain from the current scope up to global, for logging.
    pub fn describe_chain(&self) -> String {
        let mut parts = Vec::new();
        let mut cursor = Some(self.current);
        while let Some(id) = cursor {
            let scope = self.live(id);
            parts.push(match scope.function {
                Some(f) => format!("{{{}}}", f),
                None => "{global}".to_string(),
            });
            cursor = scope.parent;
        }
        parts.join(" => ")
    }

    fn is_reserved(&self, name: &str) -> bool {
        self.reserved.iter().any(|r| r == name)
    }

    fn allocate(&mut self, scope: Scope) -> ScopeId {
        match self.free.pop() {
            Some(slot) => {
                self.scopes[slot] = Some(scope);
                ScopeId(slot)
            }
            None => {
                self.scopes.push(Some(scope));
                ScopeId(self.scopes.len() - 1)
            }
        }
    }

    // Scopes reachable from `current`, the stack or the closure table are
    // never released, so these lookups cannot miss.
    fn live(&self, id: ScopeId) -> &Scope {
        self.scopes[id.0]
            .as_ref()
            .expect("scope chain references a released scope")
    }

    fn live_mut(&mut self, id: ScopeId) -> &mut Scope {
        self.scopes[id.0]
            .as_mut()
            .expect("scope chain references a released scope")
    }
}

impl Default for ScopeResolver {
    fn default() -> Self {
        Self::new(["hasOwnProperty"])
    }
}

/// Reject anything that cannot be a binding name.
///
/// Follows the ECMAScript identifier grammar: `ID_Start`, `$` or `_` first,
/// then `ID_Continue`, `$`, ZWNJ or ZWJ.
pub(crate) fn validate(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let valid_start = chars.next().map_or(false, is_id_start);
    let valid_rest = chars.all(is_id_continue);

    if valid_start && valid_rest {
        Ok(())
    } else {
        Err(AnalysisError::InvalidName(name.to_string()))
    }
}

fn is_id_start(c: char) -> bool {
    if c.is_ascii_alphabetic() || c == '_' || c == '$' {
        return true;
    }
    UnicodeXID::is_xid_start(c)
}

fn is_id_continue(c: char) -> bool {
    if c.is_ascii_alphanumeric() || c == '_' || c == '$' {
        return true;
    }
    matches!(c, '\u{200c}' | '\u{200d}') || UnicodeXID::is_xid_continue(c)
}
