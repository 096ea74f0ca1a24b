//! Identity of one visual element within one scene source.

use std::fmt;

/// Element id inside a single scene source (the host's database id)
pub type ElementId = u32;

/// Identifies one loaded scene source (model) in a viewing session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SourceId(pub u32);

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "source#{}", self.0)
    }
}

/// Lookup key for one element, unique across every source in the session.
///
/// Ordering is by source first, then element, which gives layout and cluster
/// code a stable ordering independent of hash iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShapeIdentity {
    pub source_id: SourceId,
    pub element_id: ElementId,
}

impl ShapeIdentity {
    pub fn new(source_id: SourceId, element_id: ElementId) -> Self {
        Self {
            source_id,
            element_id,
        }
    }
}

impl fmt::Display for ShapeIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.source_id, self.element_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_same_element_in_different_sources_is_distinct() {
        let a = ShapeIdentity::new(SourceId(1), 7);
        let b = ShapeIdentity::new(SourceId(2), 7);

        let set: HashSet<_> = [a, b, a].into_iter().collect();
        assert_eq!(set.len(), 2);
        assert!(a < b);
        assert_eq!(a.to_string(), "source#1:7");
    }
}
