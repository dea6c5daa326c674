//! Edge types of the dependency graph.

use std::fmt;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::event::EventId;
use crate::shadow::Hazard;

/// What produced an edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    /// A RAW / WAW / WAR hazard on a shared location.
    Data,
    /// A listener registered by the source fired the target.
    Control,
}

impl fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EdgeKind::Data => f.write_str("data"),
            EdgeKind::Control => f.write_str("control"),
        }
    }
}

/// Small ordered set of hazard kinds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HazardTags(SmallVec<[Hazard; 3]>);

impl HazardTags {
    /// Add a hazard kind, keeping the set sorted and free of duplicates.
    pub fn insert(&mut self, hazard: Hazard) -> bool {
        match self.0.binary_search(&hazard) {
            Ok(_) => false,
            Err(index) => {
                self.0.insert(index, hazard);
                true
            }
        }
    }

    pub fn contains(&self, hazard: Hazard) -> bool {
        self.0.contains(&hazard)
    }

    pub fn iter(&self) -> impl Iterator<Item = Hazard> + '_ {
        self.0.iter().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<Hazard> for HazardTags {
    fn from_iter<I: IntoIterator<Item = Hazard>>(iter: I) -> Self {
        let mut tags = HazardTags::default();
        for hazard in iter {
            tags.insert(hazard);
        }
        tags
    }
}

impl fmt::Display for HazardTags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, hazard) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{}", hazard)?;
        }
        Ok(())
    }
}

/// One aggregated edge. `source < target` always holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyEdge {
    pub source: EventId,
    pub target: EventId,
    pub kind: EdgeKind,
    pub weight: u32,
    /// Empty for control edges.
    pub tags: HazardTags,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_are_sorted_and_unique() {
        let tags: HazardTags = [Hazard::War, Hazard::Raw, Hazard::War].into_iter().collect();
        assert_eq!(tags.iter().collect::<Vec<_>>(), vec![Hazard::Raw, Hazard::War]);
        assert_eq!(tags.to_string(), "RAW,WAR");
        assert!(!tags.contains(Hazard::Waw));
    }

    #[test]
    fn edge_serializes_with_readable_tags() {
        let edge = DependencyEdge {
            source: EventId::from(1),
            target: EventId::from(2),
            kind: EdgeKind::Data,
            weight: 2,
            tags: [Hazard::Waw].into_iter().collect(),
        };
        let json = serde_json::to_value(&edge).unwrap();
        assert_eq!(json["kind"], "data");
        assert_eq!(json["tags"][0], "WAW");
        assert_eq!(json["source"], 1);
    }
}
