//! A byte range within some abstract memory object.
use crate::id::NodeId;
use crate::offset::Offset;
use std::cmp::Ordering;

/// Identifies the byte range `[offset, offset + length)` of the abstract
/// memory object represented by `target`. `target` is never a "null"
/// reference — when the front-end cannot name a specific object it uses the
/// graph's `UNKNOWN_MEMORY` sentinel node instead (see
/// [`crate::Graph::unknown_memory`]).
///
/// Either `offset` or `length` may be [`Offset::Unknown`], in which case the
/// site stands for "somewhere in `target`".
///
/// `DefSite` orders lexicographically on `(target, offset, length)`, with
/// `Offset::Unknown` sorting after every finite value (see
/// [`Offset`]'s `Ord` impl) — required so [`crate::DefinitionsMap`] can use
/// `DefSite`-keyed ordered collections.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct DefSite {
    pub target: NodeId,
    pub offset: Offset,
    pub length: Offset,
}

impl DefSite {
    pub fn new(target: NodeId, offset: impl Into<Offset>, length: impl Into<Offset>) -> Self {
        DefSite {
            target,
            offset: offset.into(),
            length: length.into(),
        }
    }

    /// The whole-object definition site `(target, 0, UNKNOWN)` used for
    /// `ALLOC`/`DYN_ALLOC` nodes' implicit self-definition.
    pub fn whole_object(target: NodeId) -> Self {
        DefSite {
            target,
            offset: Offset::ZERO,
            length: Offset::Unknown,
        }
    }

    /// True if either endpoint is unknown, meaning this site describes an
    /// unbounded range within `target` rather than a precise interval.
    pub fn has_unknown_range(&self) -> bool {
        self.offset.is_unknown() || self.length.is_unknown()
    }

    /// The half-open byte interval `[offset, offset + length)` as a pair of
    /// finite bounds, if both endpoints are known.
    pub fn finite_interval(&self) -> Option<(u64, u64)> {
        let lo = self.offset.as_finite()?;
        let len = self.length.as_finite()?;
        Some((lo, lo.saturating_add(len)))
    }
}

impl PartialOrd for DefSite {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for DefSite {
    fn cmp(&self, other: &Self) -> Ordering {
        self.target
            .cmp(&other.target)
            .then_with(|| self.offset.cmp(&other.offset))
            .then_with(|| self.length.cmp(&other.length))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use petgraph::graph::NodeIndex;

    #[test]
    fn orders_by_target_then_offset_then_length() {
        let a = NodeIndex::new(0);
        let b = NodeIndex::new(1);
        let small = DefSite::new(a, 0u64, 4u64);
        let later_offset = DefSite::new(a, 4u64, 4u64);
        let other_target = DefSite::new(b, 0u64, 4u64);
        assert!(small < later_offset);
        assert!(later_offset < other_target);
    }

    #[test]
    fn whole_object_has_unknown_length() {
        let a = NodeIndex::new(0);
        let site = DefSite::whole_object(a);
        assert!(site.has_unknown_range());
        assert_eq!(site.offset, Offset::ZERO);
    }
}
