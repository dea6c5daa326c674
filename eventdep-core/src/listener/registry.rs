//! Listener Registry
//!
//! Correlates listener registrations with later firings of the same
//! (event type, receiver) pair.
//!
//! # Keys
//!
//! Receivers are numbered in order of first sight. The number of a receiver
//! never changes, so `(event type, receiver number)` is a stable
//! [`ListenerKey`] that can be used directly as a hash key.
//!
//! # Fan-out
//!
//! A key can hold any number of registrations. They are kept in
//! registration order, and a firing reports every owner in that order.
//! One-shot registrations are consumed by the firing that uses them.

use std::collections::HashMap;
use std::fmt;

use smallvec::SmallVec;

use crate::event::EventId;
use crate::value::Handle;

/// Composite key of a listener slot.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ListenerKey {
    pub event_type: String,
    pub receiver: u32,
}

impl fmt::Display for ListenerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.event_type, self.receiver)
    }
}

/// One registered listener.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    /// Event that registered the listener. `None` when registered from
    /// top-level code outside any traced event.
    pub owner: Option<EventId>,
    pub callback: Handle,
    pub once: bool,
}

type Slot = SmallVec<[Registration; 2]>;

/// Table of active listener registrations.
#[derive(Debug, Default)]
pub struct ListenerRegistry {
    receivers: HashMap<Handle, u32>,
    slots: HashMap<ListenerKey, Slot>,
}

impl ListenerRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stable sequence number of `receiver`, assigned on first sight.
    pub fn sequence(&mut self, receiver: Handle) -> u32 {
        let next = self.receivers.len() as u32;
        *self.receivers.entry(receiver).or_insert(next)
    }

    /// Build the key for `(event_type, receiver)`, numbering the receiver if
    /// it is new.
    pub fn key(&mut self, event_type: &str, receiver: Handle) -> ListenerKey {
        ListenerKey {
            event_type: event_type.to_string(),
            receiver: self.sequence(receiver),
        }
    }

    /// Key of an already-numbered receiver. Never allocates a number.
    fn existing_key(&self, event_type: &str, receiver: Handle) -> Option<ListenerKey> {
        self.receivers.get(&receiver).map(|&seq| ListenerKey {
            event_type: event_type.to_string(),
            receiver: seq,
        })
    }

    /// Register `callback` for `(event_type, receiver)`.
    pub fn register(
        &mut self,
        owner: Option<EventId>,
        event_type: &str,
        receiver: Handle,
        callback: Handle,
        once: bool,
    ) -> ListenerKey {
        let key = self.key(event_type, receiver);
        self.slots.entry(key.clone()).or_default().push(Registration {
            owner,
            callback,
            once,
        });
        key
    }

    /// Remove registrations for `(event_type, receiver)`.
    ///
    /// With a callback, only the first registration of that callback is
    /// removed; without one, the whole slot is cleared. Returns the number of
    /// registrations removed, which is zero when nothing matched.
    pub fn unregister(
        &mut self,
        event_type: &str,
        receiver: Handle,
        callback: Option<Handle>,
    ) -> usize {
        let Some(key) = self.existing_key(event_type, receiver) else {
            return 0;
        };
        let Some(slot) = self.slots.get_mut(&key) else {
            return 0;
        };

        let removed = match callback {
            Some(cb) => match slot.iter().position(|r| r.callback == cb) {
                Some(index) => {
                    slot.remove(index);
                    1
                }
                None => 0,
            },
            None => {
                let count = slot.len();
                slot.clear();
                count
            }
        };

        if slot.is_empty() {
            self.slots.remove(&key);
        }
        removed
    }

    /// Owners of the active registrations for `(event_type, receiver)`, in
    /// registration order.
    pub fn query(&self, event_type: &str, receiver: Handle) -> Vec<Option<EventId>> {
        self.registrations(event_type, receiver)
            .iter()
            .map(|r| r.owner)
            .collect()
    }

    /// Active registrations for `(event_type, receiver)`.
    pub fn registrations(&self, event_type: &str, receiver: Handle) -> &[Registration] {
        self.existing_key(event_type, receiver)
            .and_then(|key| self.slots.get(&key))
            .map(|slot| slot.as_slice())
            .unwrap_or(&[])
    }

    /// Fire `(event_type, receiver)`.
    ///
    /// Returns the owners of every matching registration in order and
    /// consumes the one-shot ones.
    pub fn fire(&mut self, event_type: &str, receiver: Handle) -> SmallVec<[Option<EventId>; 4]> {
        let Some(key) = self.existing_key(event_type, receiver) else {
            return SmallVec::new();
        };
        let Some(slot) = self.slots.get_mut(&key) else {
            return SmallVec::new();
        };

        let owners = slot.iter().map(|r| r.owner).collect();
        slot.retain(|r| !r.once);
        if slot.is_empty() {
            self.slots.remove(&key);
        }
        owners
    }

    /// Total number of active registrations.
    pub fn len(&self) -> usize {
        self.slots.values().map(|s| s.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn h(id: u64) -> Handle {
        Handle::new(id)
    }

    fn ev(id: u64) -> Option<EventId> {
        Some(EventId::from(id))
    }

    #[test]
    fn receivers_keep_their_sequence_number() {
        let mut registry = ListenerRegistry::new();
        assert_eq!(registry.sequence(h(100)), 0);
        assert_eq!(registry.sequence(h(200)), 1);
        assert_eq!(registry.sequence(h(100)), 0);
        assert_eq!(registry.key("data", h(200)).to_string(), "data#1");
    }

    #[test]
    fn fan_out_preserves_registration_order() {
        let mut registry = ListenerRegistry::new();
        registry.register(ev(5), "click", h(1), h(50), false);
        registry.register(ev(7), "click", h(1), h(70), false);

        assert_eq!(registry.query("click", h(1)), vec![ev(5), ev(7)]);
        assert_eq!(registry.fire("click", h(1)).as_slice(), &[ev(5), ev(7)]);
        // Neither was one-shot.
        assert_eq!(registry.query("click", h(1)), vec![ev(5), ev(7)]);
    }

    #[test]
    fn keys_separate_type_and_receiver() {
        let mut registry = ListenerRegistry::new();
        registry.register(ev(1), "click", h(1), h(10), false);

        assert!(registry.query("keyup", h(1)).is_empty());
        assert!(registry.query("click", h(2)).is_empty());
    }

    #[test]
    fn one_shot_registrations_are_consumed_by_firing() {
        let mut registry = ListenerRegistry::new();
        registry.register(ev(1), "end", h(1), h(10), true);
        registry.register(ev(2), "end", h(1), h(20), false);

        assert_eq!(registry.fire("end", h(1)).as_slice(), &[ev(1), ev(2)]);
        assert_eq!(registry.query("end", h(1)), vec![ev(2)]);
        assert_eq!(registry.fire("end", h(1)).as_slice(), &[ev(2)]);
    }

    #[test]
    fn unregister_by_callback_removes_first_match() {
        let mut registry = ListenerRegistry::new();
        registry.register(ev(1), "data", h(1), h(10), false);
        registry.register(ev(2), "data", h(1), h(10), false);
        registry.register(ev(3), "data", h(1), h(30), false);

        assert_eq!(registry.unregister("data", h(1), Some(h(10))), 1);
        assert_eq!(registry.query("data", h(1)), vec![ev(2), ev(3)]);
    }

    #[test]
    fn unregister_without_callback_clears_slot() {
        let mut registry = ListenerRegistry::new();
        registry.register(ev(1), "data", h(1), h(10), false);
        registry.register(ev(2), "data", h(1), h(20), false);

        assert_eq!(registry.unregister("data", h(1), None), 2);
        assert!(registry.query("data", h(1)).is_empty());
        assert!(registry.is_empty());
    }

    #[test]
    fn unregister_unknown_is_noop() {
        let mut registry = ListenerRegistry::new();
        assert_eq!(registry.unregister("data", h(9), None), 0);
        registry.register(ev(1), "data", h(1), h(10), false);
        assert_eq!(registry.unregister("data", h(1), Some(h(99))), 0);
        assert_eq!(registry.unregister("close", h(1), None), 0);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn register_then_unregister_leaves_nothing_to_fire() {
        let mut registry = ListenerRegistry::new();
        registry.register(ev(1), "tick", h(1), h(10), false);
        registry.unregister("tick", h(1), Some(h(10)));

        assert!(registry.query("tick", h(1)).is_empty());
        assert!(registry.fire("tick", h(1)).is_empty());
    }

    #[test]
    fn firing_unknown_receiver_does_not_number_it() {
        let mut registry = ListenerRegistry::new();
        assert!(registry.fire("tick", h(42)).is_empty());
        assert_eq!(registry.sequence(h(7)), 0);
    }
}
