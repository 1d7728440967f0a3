//! The reaching-definitions map: for every memory-object target, the set of
//! writer nodes that may have produced the last write observed at some
//! program point, keyed by byte interval.
use crate::defsite::DefSite;
use crate::id::NodeId;
use itertools::Itertools;
use std::collections::{BTreeMap, BTreeSet};

/// `target -> IntervalMap<[start, end) -> writers> + an "unknown" bucket`.
///
/// Intervals under one target are always pairwise disjoint and ordered by
/// `start`; an empty writer set is never stored as a finite interval entry
/// (it is simply absent). The `unknown` bucket on each target's entry holds
/// writers whose def-site had an `UNKNOWN` offset or length — "somewhere in
/// this target" — and acts as a fallback for whichever bytes no tracked
/// interval covers, not an unconditional addition to every query (see
/// `get`).
///
/// Every mutating operation is bounded by `max_set_size`: a writer set that
/// would grow past the cap collapses to the target's graph-wide
/// `unknown_memory` sentinel and is folded into the unknown bucket, which is
/// what gives the lattice finite height (see `DefinitionsMap`'s role in
/// `ReachingDefinitionsAnalysis::run`'s termination argument).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DefinitionsMap {
    targets: BTreeMap<NodeId, TargetEntry>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
struct TargetEntry {
    intervals: BTreeMap<u64, Interval>,
    unknown: BTreeSet<NodeId>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct Interval {
    end: u64,
    writers: BTreeSet<NodeId>,
}

fn singleton(n: NodeId) -> BTreeSet<NodeId> {
    let mut s = BTreeSet::new();
    s.insert(n);
    s
}

/// Unions `writers` into `bucket`, collapsing `bucket` to `{unknown_memory}`
/// if the result would exceed `max_set_size`. Returns whether a collapse
/// happened.
fn union_into_bucket(
    bucket: &mut BTreeSet<NodeId>,
    writers: &BTreeSet<NodeId>,
    max_set_size: usize,
    unknown_memory: NodeId,
) -> bool {
    bucket.extend(writers.iter().copied());
    if bucket.len() > max_set_size {
        log::debug!(
            "writer set exceeded max_set_size ({max_set_size}); collapsing to UNKNOWN_MEMORY"
        );
        bucket.clear();
        bucket.insert(unknown_memory);
        true
    } else {
        false
    }
}

impl TargetEntry {
    /// Ensures an interval boundary exists at `point`, splitting whatever
    /// interval currently straddles it so the two halves can be updated
    /// independently.
    fn split_at(&mut self, point: u64) {
        let Some((&start, _)) = self.intervals.range(..point).next_back() else {
            return;
        };
        let (end, writers) = {
            let entry = self.intervals.get(&start).unwrap();
            (entry.end, entry.writers.clone())
        };
        if end > point {
            self.intervals.get_mut(&start).unwrap().end = point;
            self.intervals.insert(
                point,
                Interval {
                    end,
                    writers,
                },
            );
        }
    }

    fn strong_update(
        &mut self,
        lo: u64,
        hi: u64,
        writer: NodeId,
    ) {
        if lo >= hi {
            return;
        }
        self.split_at(lo);
        self.split_at(hi);
        let overlapping: Vec<u64> =
            self.intervals.range(lo..hi).map(|(&s, _)| s).collect();
        for s in overlapping {
            self.intervals.remove(&s);
        }
        // A fresh singleton set always fits within `max_set_size >= 1`, so
        // no cap check is needed on insertion.
        self.intervals.insert(
            lo,
            Interval {
                end: hi,
                writers: singleton(writer),
            },
        );
    }

    /// Unions `writers` into every sub-range of `[lo, hi)`, inserting fresh
    /// entries to cover any previously-unwritten gaps.
    fn union_range(
        &mut self,
        lo: u64,
        hi: u64,
        writers: &BTreeSet<NodeId>,
        max_set_size: usize,
        unknown_memory: NodeId,
    ) {
        if lo >= hi || writers.is_empty() {
            return;
        }
        self.split_at(lo);
        self.split_at(hi);

        let mut cursor = lo;
        let mut gaps = Vec::new();
        for (&start, interval) in self.intervals.range(lo..hi) {
            if start > cursor {
                gaps.push((cursor, start));
            }
            cursor = interval.end;
        }
        if cursor < hi {
            gaps.push((cursor, hi));
        }
        for (s, e) in gaps {
            // A gap inherits the unknown-bucket baseline before the new
            // writers are unioned in below: a weak write never discards
            // information, so a range that was previously only covered by
            // an unknown-range writer must still show that writer once the
            // range is materialized into its own interval.
            self.intervals.insert(
                s,
                Interval {
                    end: e,
                    writers: self.unknown.clone(),
                },
            );
        }

        let touched: Vec<u64> =
            self.intervals.range(lo..hi).map(|(&s, _)| s).collect();
        for s in touched {
            let entry = self.intervals.get_mut(&s).unwrap();
            let collapsed = union_into_bucket(
                &mut entry.writers,
                writers,
                max_set_size,
                unknown_memory,
            );
            if collapsed {
                self.intervals.remove(&s);
                union_into_bucket(
                    &mut self.unknown,
                    &singleton(unknown_memory),
                    max_set_size,
                    unknown_memory,
                );
            }
        }
    }

    /// A write with an `UNKNOWN` offset or length: "somewhere in this
    /// target". Unions `writer` into the unknown bucket *and* into every
    /// existing finite interval, since any of them might alias the unknown
    /// range.
    fn add_unknown(
        &mut self,
        writer: NodeId,
        max_set_size: usize,
        unknown_memory: NodeId,
    ) {
        union_into_bucket(
            &mut self.unknown,
            &singleton(writer),
            max_set_size,
            unknown_memory,
        );
        let starts: Vec<u64> = self.intervals.keys().copied().collect();
        for s in starts {
            let entry = self.intervals.get_mut(&s).unwrap();
            let collapsed = union_into_bucket(
                &mut entry.writers,
                &singleton(writer),
                max_set_size,
                unknown_memory,
            );
            if collapsed {
                self.intervals.remove(&s);
                union_into_bucket(
                    &mut self.unknown,
                    &singleton(unknown_memory),
                    max_set_size,
                    unknown_memory,
                );
            }
        }
    }

    /// A strong write with an `UNKNOWN` offset or length: the whole target
    /// is overwritten, so every prior writer (finite or unknown) is killed.
    fn clear_all(&mut self, writer: NodeId) {
        self.intervals.clear();
        self.unknown.clear();
        self.unknown.insert(writer);
    }

    /// The writer set covering `[lo, hi)` if some existing interval spans it
    /// exactly (a merge always splits at both operands' boundaries first, so
    /// a segment either falls entirely inside one interval or entirely in a
    /// gap — never straddles one).
    fn writers_covering(
        intervals: &BTreeMap<u64, Interval>,
        lo: u64,
        hi: u64,
    ) -> Option<&BTreeSet<NodeId>> {
        intervals.range(..=lo).next_back().and_then(|(&start, interval)| {
            if start <= lo && interval.end >= hi {
                Some(&interval.writers)
            } else {
                None
            }
        })
    }

    /// Pointwise-unions `other` into `self`, byte by byte: each side
    /// contributes its tracked interval's writers where it has one, or its
    /// unknown-bucket baseline where it doesn't. This is what lets a
    /// control-flow join correctly recombine a path that never wrote some
    /// range (only the baseline applies there) with a path that did.
    fn merge_from(&mut self, other: &TargetEntry, max_set_size: usize, unknown_memory: NodeId) {
        let mut points: BTreeSet<u64> = BTreeSet::new();
        for (&start, interval) in &self.intervals {
            points.insert(start);
            points.insert(interval.end);
        }
        for (&start, interval) in &other.intervals {
            points.insert(start);
            points.insert(interval.end);
        }

        let mut new_intervals: BTreeMap<u64, Interval> = BTreeMap::new();
        let mut any_collapsed = false;
        for (lo, hi) in points.into_iter().tuple_windows() {
            if lo >= hi {
                continue;
            }
            let mut merged = Self::writers_covering(&self.intervals, lo, hi)
                .cloned()
                .unwrap_or_else(|| self.unknown.clone());
            let other_writers = Self::writers_covering(&other.intervals, lo, hi)
                .cloned()
                .unwrap_or_else(|| other.unknown.clone());
            merged.extend(other_writers);
            if merged.is_empty() {
                continue;
            }
            if merged.len() > max_set_size {
                any_collapsed = true;
                continue;
            }
            new_intervals.insert(lo, Interval { end: hi, writers: merged });
        }

        self.intervals = new_intervals;
        self.unknown.extend(other.unknown.iter().copied());
        if any_collapsed {
            self.unknown.insert(unknown_memory);
        }
        if self.unknown.len() > max_set_size {
            log::debug!(
                "writer set exceeded max_set_size ({max_set_size}); collapsing to UNKNOWN_MEMORY"
            );
            self.unknown.clear();
            self.unknown.insert(unknown_memory);
        }
    }
}

impl DefinitionsMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Strong update: `ds`'s writers are fully replaced by `{writer}`. If
    /// `ds` has an unknown offset or length the *entire target* is killed,
    /// since there is no narrower range to constrain the overwrite to.
    pub fn update(
        &mut self,
        ds: DefSite,
        writer: NodeId,
        max_set_size: usize,
        unknown_memory: NodeId,
    ) {
        let entry = self.targets.entry(ds.target).or_default();
        match ds.finite_interval() {
            Some((lo, hi)) => entry.strong_update(lo, hi, writer),
            None => entry.clear_all(writer),
        }
        let _ = max_set_size; // a fresh singleton never needs capping
    }

    /// Weak update: `writer` is unioned into whatever already reaches `ds`.
    pub fn add(
        &mut self,
        ds: DefSite,
        writer: NodeId,
        max_set_size: usize,
        unknown_memory: NodeId,
    ) {
        let entry = self.targets.entry(ds.target).or_default();
        match ds.finite_interval() {
            Some((lo, hi)) => entry.union_range(
                lo,
                hi,
                &singleton(writer),
                max_set_size,
                unknown_memory,
            ),
            None => entry.add_unknown(writer, max_set_size, unknown_memory),
        }
    }

    /// Pointwise union of `other` into `self`, target by target. A target
    /// `other` never mentions contributes nothing (no writer ever reached
    /// that path), so `self`'s existing entry for it is left untouched.
    pub fn merge(
        &mut self,
        other: &DefinitionsMap,
        max_set_size: usize,
        unknown_memory: NodeId,
    ) {
        for (&target, other_entry) in &other.targets {
            let entry = self.targets.entry(target).or_default();
            entry.merge_from(other_entry, max_set_size, unknown_memory);
        }
    }

    /// Every writer whose interval intersects `[offset, offset + length)` of
    /// `target`, plus `target`'s unknown bucket for whatever part of that
    /// range is *not* already covered by a tracked interval, plus (when
    /// `unknown_memory_reads_everything` is set) `unknown_memory`'s own
    /// unknown bucket. Returns `out.len()`.
    ///
    /// The unknown bucket is a baseline that applies only where nothing
    /// more precise is known — once a range is fully covered by tracked
    /// intervals, a stale unknown-range writer from before those intervals
    /// existed (e.g. an `ALLOC`'s implicit whole-object self-definition) no
    /// longer surfaces for that range, since any subsequent strong write
    /// covering it is guaranteed (by must-update semantics) to have run
    /// after it on every path reaching this query.
    ///
    /// When `offset` or `length` itself is `UNKNOWN` the query conservatively
    /// matches `target`'s unknown bucket only — *not* every precise
    /// interval's writers. This preserves the original analysis's behavior
    /// where an unknown-offset read is not satisfied by a strong update of
    /// an unrelated precise sub-range (see `DESIGN.md`, Open Questions).
    pub fn get(
        &self,
        target: NodeId,
        offset: crate::offset::Offset,
        length: crate::offset::Offset,
        out: &mut BTreeSet<NodeId>,
        unknown_memory: NodeId,
        unknown_memory_reads_everything: bool,
    ) -> usize {
        if let Some(entry) = self.targets.get(&target) {
            match (offset.as_finite(), length.as_finite()) {
                (Some(lo), Some(len)) if lo < lo.saturating_add(len) => {
                    let hi = lo.saturating_add(len);
                    let mut frontier = lo;
                    for (&start, interval) in &entry.intervals {
                        if start >= hi {
                            break;
                        }
                        if interval.end <= lo {
                            continue;
                        }
                        if start > frontier {
                            out.extend(entry.unknown.iter().copied());
                        }
                        out.extend(interval.writers.iter().copied());
                        frontier = frontier.max(interval.end);
                    }
                    if frontier < hi {
                        out.extend(entry.unknown.iter().copied());
                    }
                }
                (Some(_), Some(_)) => {
                    // Zero-length query: no bytes are actually read.
                }
                _ => {
                    out.extend(entry.unknown.iter().copied());
                }
            }
        }
        if unknown_memory_reads_everything {
            if let Some(um_entry) = self.targets.get(&unknown_memory) {
                out.extend(um_entry.unknown.iter().copied());
            }
        }
        out.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defsite::DefSite;
    use crate::offset::Offset;
    use petgraph::graph::NodeIndex;

    const CAP: usize = 8;

    fn n(i: u32) -> NodeId {
        NodeIndex::new(i as usize)
    }

    #[test]
    fn strong_update_then_read_back() {
        let mut map = DefinitionsMap::new();
        let a = n(0);
        let um = n(99);
        let s1 = n(1);
        map.update(DefSite::new(a, 0u64, 4u64), s1, CAP, um);
        let mut out = BTreeSet::new();
        map.get(a, Offset::finite(0), Offset::finite(4), &mut out, um, true);
        assert_eq!(out, singleton(s1));
    }

    #[test]
    fn second_strong_update_kills_first_exact_overlap() {
        let mut map = DefinitionsMap::new();
        let a = n(0);
        let um = n(99);
        let (s1, s2) = (n(1), n(2));
        map.update(DefSite::new(a, 0u64, 4u64), s1, CAP, um);
        map.update(DefSite::new(a, 0u64, 4u64), s2, CAP, um);
        let mut out = BTreeSet::new();
        map.get(a, Offset::finite(0), Offset::finite(4), &mut out, um, true);
        assert_eq!(out, singleton(s2));
    }

    #[test]
    fn partial_overwrite_keeps_tail_of_original() {
        let mut map = DefinitionsMap::new();
        let a = n(0);
        let um = n(99);
        let (s1, s2) = (n(1), n(2));
        map.update(DefSite::new(a, 0u64, 8u64), s1, CAP, um);
        map.update(DefSite::new(a, 0u64, 4u64), s2, CAP, um);
        let mut out = BTreeSet::new();
        map.get(a, Offset::finite(0), Offset::finite(8), &mut out, um, true);
        assert_eq!(out, [s1, s2].into_iter().collect::<BTreeSet<_>>());
    }

    #[test]
    fn weak_unknown_write_cannot_kill_prior_strong_write() {
        let mut map = DefinitionsMap::new();
        let a = n(0);
        let um = n(99);
        let (s1, s2) = (n(1), n(2));
        map.update(DefSite::new(a, 0u64, 4u64), s1, CAP, um);
        map.add(DefSite::new(a, Offset::Unknown, Offset::Unknown), s2, CAP, um);
        let mut out = BTreeSet::new();
        map.get(a, Offset::finite(0), Offset::finite(4), &mut out, um, true);
        assert_eq!(out, [s1, s2].into_iter().collect::<BTreeSet<_>>());
    }

    #[test]
    fn precision_cap_collapses_to_unknown_memory() {
        let mut map = DefinitionsMap::new();
        let a = n(0);
        let um = n(99);
        let max = 2;
        // Exactly one writer past the cap, and nothing added afterwards —
        // the finite interval is removed outright rather than being given
        // a chance to re-accumulate a fresh small writer set.
        for i in 1..=3u32 {
            map.add(DefSite::new(a, 0u64, 4u64), n(i), max, um);
        }
        let mut out = BTreeSet::new();
        map.get(a, Offset::finite(0), Offset::finite(4), &mut out, um, true);
        assert_eq!(out, singleton(um));
    }

    #[test]
    fn unknown_offset_query_only_sees_unknown_bucket() {
        // Open question #1: a strong write to a precise sub-range must not
        // answer an unknown-offset query.
        let mut map = DefinitionsMap::new();
        let a = n(0);
        let um = n(99);
        let s1 = n(1);
        map.update(DefSite::new(a, 0u64, 4u64), s1, CAP, um);
        let mut out = BTreeSet::new();
        map.get(a, Offset::Unknown, Offset::Unknown, &mut out, um, true);
        assert!(out.is_empty());
    }

    #[test]
    fn unknown_memory_reads_everything_flag_gates_sentinel_inclusion() {
        let mut map = DefinitionsMap::new();
        let a = n(0);
        let um = n(99);
        let caller = n(5);
        // Simulate an opaque CALL's synthetic write to UNKNOWN_MEMORY.
        map.update(DefSite::new(um, 0u64, Offset::Unknown), caller, CAP, um);

        let mut included = BTreeSet::new();
        map.get(a, Offset::finite(0), Offset::finite(4), &mut included, um, true);
        assert!(included.contains(&caller));

        let mut excluded = BTreeSet::new();
        map.get(a, Offset::finite(0), Offset::finite(4), &mut excluded, um, false);
        assert!(!excluded.contains(&caller));
    }

    #[test]
    fn merge_fills_a_gap_on_one_side_with_that_sides_baseline() {
        // `left` never wrote the range at all (only an unknown-range
        // self-def reaches it); `right` wrote it precisely. A naive
        // interval-only union would lose `left`'s baseline entirely for
        // this range, since `left` has no interval there to unify with.
        let mut left = DefinitionsMap::new();
        let mut right = DefinitionsMap::new();
        let a = n(0);
        let um = n(99);
        let (baseline, writer) = (n(1), n(2));
        left.add(DefSite::new(a, Offset::Unknown, Offset::Unknown), baseline, CAP, um);
        right.update(DefSite::new(a, 0u64, 4u64), writer, CAP, um);

        left.merge(&right, CAP, um);
        let mut out = BTreeSet::new();
        left.get(a, Offset::finite(0), Offset::finite(4), &mut out, um, true);
        assert_eq!(out, [baseline, writer].into_iter().collect::<BTreeSet<_>>());
    }

    #[test]
    fn merge_unions_pointwise() {
        let mut left = DefinitionsMap::new();
        let mut right = DefinitionsMap::new();
        let a = n(0);
        let um = n(99);
        let (s1, s2) = (n(1), n(2));
        left.update(DefSite::new(a, 0u64, 4u64), s1, CAP, um);
        right.update(DefSite::new(a, 0u64, 4u64), s2, CAP, um);
        left.merge(&right, CAP, um);
        let mut out = BTreeSet::new();
        left.get(a, Offset::finite(0), Offset::finite(4), &mut out, um, true);
        assert_eq!(out, [s1, s2].into_iter().collect::<BTreeSet<_>>());
    }
}
