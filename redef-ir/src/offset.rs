//! A byte offset with a distinguished `UNKNOWN` top element.
use std::cmp::Ordering;
use std::fmt;

/// A non-negative byte offset, or the distinguished `UNKNOWN` value standing
/// for "could not be determined statically". Arithmetic saturates towards
/// `UNKNOWN` rather than panicking or wrapping: `UNKNOWN + x == UNKNOWN` for
/// any `x`.
///
/// `UNKNOWN` sorts after every finite value so that `DefSite`'s derived
/// lexicographic order is total (see [`crate::DefSite`]).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Offset {
    Finite(u64),
    Unknown,
}

impl Offset {
    pub const ZERO: Offset = Offset::Finite(0);

    pub fn finite(value: u64) -> Self {
        Offset::Finite(value)
    }

    pub fn is_unknown(self) -> bool {
        matches!(self, Offset::Unknown)
    }

    /// The finite value, if any.
    pub fn as_finite(self) -> Option<u64> {
        match self {
            Offset::Finite(v) => Some(v),
            Offset::Unknown => None,
        }
    }

    /// Saturating addition: `UNKNOWN` absorbs any operand, and a finite sum
    /// that would overflow `u64` also saturates to `UNKNOWN` rather than
    /// wrapping or panicking.
    pub fn saturating_add(self, rhs: Offset) -> Offset {
        match (self, rhs) {
            (Offset::Finite(a), Offset::Finite(b)) => match a.checked_add(b) {
                Some(sum) => Offset::Finite(sum),
                None => Offset::Unknown,
            },
            _ => Offset::Unknown,
        }
    }

    /// True iff `self` is finite and `lo <= self < hi`, or either bound is
    /// `UNKNOWN` — an unknown bound conservatively matches anything, since
    /// the analysis must not risk a false negative about range overlap.
    pub fn in_range(self, lo: Offset, hi: Offset) -> bool {
        match (self, lo, hi) {
            (Offset::Finite(o), Offset::Finite(l), Offset::Finite(h)) => {
                l <= o && o < h
            }
            _ => true,
        }
    }
}

impl PartialOrd for Offset {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Offset {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Offset::Finite(a), Offset::Finite(b)) => a.cmp(b),
            (Offset::Finite(_), Offset::Unknown) => Ordering::Less,
            (Offset::Unknown, Offset::Finite(_)) => Ordering::Greater,
            (Offset::Unknown, Offset::Unknown) => Ordering::Equal,
        }
    }
}

impl fmt::Display for Offset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Offset::Finite(v) => write!(f, "{v}"),
            Offset::Unknown => write!(f, "?"),
        }
    }
}

impl From<u64> for Offset {
    fn from(value: u64) -> Self {
        Offset::Finite(value)
    }
}
