//! Stable type-to-color assignment.

use indexmap::IndexMap;

/// Hands out display colors to event types.
///
/// The first type seen gets the first palette entry, the second type the
/// second, and so on, wrapping around. A type keeps its color for the rest
/// of the session.
#[derive(Debug, Clone)]
pub struct Palette {
    colors: Vec<String>,
    assigned: IndexMap<String, usize>,
}

impl Palette {
    pub fn new(colors: Vec<String>) -> Self {
        Self {
            colors,
            assigned: IndexMap::new(),
        }
    }

    /// Color of `event_type`, assigning one on first sight.
    pub fn color_for(&mut self, event_type: &str) -> &str {
        if self.colors.is_empty() {
            return "black";
        }

        let next = self.assigned.len() % self.colors.len();
        let slot = match self.assigned.get(event_type) {
            Some(&slot) => slot,
            None => {
                self.assigned.insert(event_type.to_string(), next);
                next
            }
        };
        &self.colors[slot]
    }

    /// Number of distinct event types seen so far.
    pub fn types_seen(&self) -> usize {
        self.assigned.len()
    }
}
