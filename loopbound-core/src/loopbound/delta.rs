//! Increment Lattice
//!
//! `DeltaInterval` is the value tracked per counter cell by the increment dataflow solver:
//! the interval of per-iteration steps observed on stores to that cell.
//!
//! ```text
//!              Top
//!       /       |       \
//!  [a,b]+    [a,b]*    [a,b]/      (hull-ordered, one chain set per family)
//!       \       |       /
//!             Empty
//!               |
//!             Bottom
//! ```
//!
//! Joining intervals of different families goes to `Top`: one cell cannot be both
//! added to and multiplied by a constant and still be solved by a single formula.

use serde::{Deserialize, Serialize};

/// Arithmetic shape of a counter update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum Family {
    /// `i = i + c` / `i = i - c`
    Additive = 0,
    /// `i = i * c`
    Multiplicative = 1,
    /// `i = i / c`
    Division = 2,
}

impl std::fmt::Display for Family {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Family::Additive => "additive",
            Family::Multiplicative => "multiplicative",
            Family::Division => "division",
        })
    }
}

/// Closed integer interval tagged with a family.
///
/// `low <= high` always holds; the constructor swaps reversed bounds.
/// Equality compares bounds only.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Interval {
    low: i64,
    high: i64,
    family: Family,
}

impl Interval {
    #[inline]
    pub fn new(a: i64, b: i64, family: Family) -> Self {
        let (low, high) = if a <= b { (a, b) } else { (b, a) };
        Self { low, high, family }
    }

    /// Single-value interval `[value, value]`.
    #[inline]
    pub fn point(value: i64, family: Family) -> Self {
        Self::new(value, value, family)
    }

    #[inline]
    pub fn low(&self) -> i64 {
        self.low
    }

    #[inline]
    pub fn high(&self) -> i64 {
        self.high
    }

    #[inline]
    pub fn family(&self) -> Family {
        self.family
    }

    /// Hull of two intervals of the same family, `None` across families.
    #[inline]
    pub fn hull(&self, other: &Interval) -> Option<Interval> {
        (self.family == other.family).then(|| {
            Interval::new(self.low.min(other.low), self.high.max(other.high), self.family)
        })
    }
}

impl PartialEq for Interval {
    fn eq(&self, other: &Self) -> bool {
        self.low == other.low && self.high == other.high
    }
}

impl Eq for Interval {}

impl std::fmt::Display for Interval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {}]", self.low, self.high)
    }
}

/// Lattice value of the increment analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeltaInterval {
    /// Unknown change; absorbing.
    Top,
    /// Unreachable.
    Bottom,
    /// No increment observed yet.
    Empty,
    Interval(Interval),
}

impl DeltaInterval {
    /// Least upper bound.
    pub fn join(self, other: DeltaInterval) -> DeltaInterval {
        match (self, other) {
            (DeltaInterval::Top, _) | (_, DeltaInterval::Top) => DeltaInterval::Top,
            (DeltaInterval::Bottom, x) | (x, DeltaInterval::Bottom) => x,
            (DeltaInterval::Empty, x) | (x, DeltaInterval::Empty) => x,
            (DeltaInterval::Interval(a), DeltaInterval::Interval(b)) => {
                a.hull(&b).map_or(DeltaInterval::Top, DeltaInterval::Interval)
            }
        }
    }

    #[inline]
    pub fn as_interval(&self) -> Option<Interval> {
        match self {
            DeltaInterval::Interval(i) => Some(*i),
            _ => None,
        }
    }

    #[inline]
    pub fn is_top(&self) -> bool {
        matches!(self, DeltaInterval::Top)
    }

    #[inline]
    pub fn is_bottom(&self) -> bool {
        matches!(self, DeltaInterval::Bottom)
    }
}

impl std::fmt::Display for DeltaInterval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeltaInterval::Top => f.write_str("⊤"),
            DeltaInterval::Bottom => f.write_str("⊥"),
            DeltaInterval::Empty => f.write_str("∅"),
            DeltaInterval::Interval(i) => write!(f, "{i} {}", i.family()),
        }
    }
}
