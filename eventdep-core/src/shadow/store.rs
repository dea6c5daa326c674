//! Shadow Store
//!
//! Mirrors every live object the analysis has seen with an [`AccessLog`],
//! without touching the object itself.
//!
//! Objects are indexed by their [`Handle`] in a hash map, so lookup is O(1)
//! regardless of how many objects a trace touches. The store never keeps an
//! object alive: when the instrumentation reports that an object was
//! collected, [`ShadowStore::release`] drops its log, and a later object
//! that happens to reuse the same handle starts from a clean log.

use std::collections::HashMap;

use crate::value::{Handle, Value};

use super::access::AccessLog;

/// Identity-indexed table of access logs for object references.
#[derive(Debug, Default)]
pub struct ShadowStore {
    logs: HashMap<Handle, AccessLog>,
}

impl ShadowStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the access log for `value`, allocating it on first sight.
    ///
    /// Non-reference values (undefined, null, primitives) have no identity and
    /// yield `None`; callers treat that as "nothing to track".
    pub fn access(&mut self, value: &Value) -> Option<&mut AccessLog> {
        let handle = value.reference()?;
        Some(self.logs.entry(handle).or_default())
    }

    /// Look up an existing log without allocating.
    pub fn get(&self, handle: Handle) -> Option<&AccessLog> {
        self.logs.get(&handle)
    }

    /// Forget an object that no longer exists in the observed program.
    ///
    /// Returns whether a log was dropped.
    pub fn release(&mut self, handle: Handle) -> bool {
        self.logs.remove(&handle).is_some()
    }

    /// Number of objects currently tracked.
    pub fn len(&self) -> usize {
        self.logs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.logs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventId;

    #[test]
    fn non_references_are_ignored() {
        let mut store = ShadowStore::new();
        assert!(store.access(&Value::Undefined).is_none());
        assert!(store.access(&Value::Null).is_none());
        assert!(store.access(&Value::Primitive).is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn same_identity_shares_one_log() {
        let mut store = ShadowStore::new();
        let obj = Value::Object(Handle::new(7));

        store.access(&obj).unwrap().on_write(EventId::from(1));
        let log = store.access(&obj).unwrap();
        assert_eq!(log.last_writer(), Some(EventId::from(1)));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn distinct_identities_are_independent() {
        let mut store = ShadowStore::new();
        store
            .access(&Value::Object(Handle::new(1)))
            .unwrap()
            .on_write(EventId::from(1));

        let other = store.access(&Value::Object(Handle::new(2))).unwrap();
        assert_eq!(other.last_writer(), None);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn functions_are_tracked_like_objects() {
        let mut store = ShadowStore::new();
        assert!(store.access(&Value::Function(Handle::new(9))).is_some());
        assert!(store.get(Handle::new(9)).is_some());
    }

    #[test]
    fn released_objects_start_fresh() {
        let mut store = ShadowStore::new();
        let obj = Value::Object(Handle::new(5));
        store.access(&obj).unwrap().on_write(EventId::from(3));

        assert!(store.release(Handle::new(5)));
        assert!(!store.release(Handle::new(5)));
        assert!(store.get(Handle::new(5)).is_none());

        let log = store.access(&obj).unwrap();
        assert_eq!(log.last_writer(), None);
    }
}
