//! Loop Bound Results
//!
//! One `LoopBoundResult` per discovered loop, collected into a `LoopBoundReport` that the
//! downstream cost model queries by `LoopKey`.
//!
//! A result carries a bound interval only when its classification is `Normal`; every other
//! classification is resolved to the configured fallback constant by `trip_count`.

use crate::analysis::LoopId;
use crate::config::AnalysisConfig;
use crate::error::AnalysisIssue;
use crate::ir::{BlockId, Predicate};
use crate::loopbound::delta::Interval;
use crate::loopbound::storage::StorageCell;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Outcome of the structural classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum Classification {
    Normal = 0,
    Malformed = 1,
    SymbolicBound = 2,
    NonCounting = 3,
    Nested = 4,
    Unknown = 5,
}

impl Classification {
    /// Every classification, in declaration order.
    pub const ALL: [Classification; 6] = [
        Classification::Normal,
        Classification::Malformed,
        Classification::SymbolicBound,
        Classification::NonCounting,
        Classification::Nested,
        Classification::Unknown,
    ];

    /// Key of the fallback entry in the configuration file (`None` for `Normal`).
    #[inline]
    pub fn config_key(self) -> Option<&'static str> {
        match self {
            Classification::Normal => None,
            Classification::Malformed => Some("MALFORMED_LOOP"),
            Classification::SymbolicBound => Some("SYMBOLIC_BOUND_LOOP"),
            Classification::NonCounting => Some("NON_COUNTING_LOOP"),
            Classification::Nested => Some("NESTED_LOOP"),
            Classification::Unknown => Some("UNKNOWN_LOOP"),
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Classification::Normal => "normal",
            Classification::Malformed => "malformed",
            Classification::SymbolicBound => "symbolic-bound",
            Classification::NonCounting => "non-counting",
            Classification::Nested => "nested",
            Classification::Unknown => "unknown",
        })
    }
}

/// Identity of a loop across a module.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LoopKey {
    pub function: String,
    #[serde(rename = "loop")]
    pub loop_id: LoopId,
}

impl LoopKey {
    pub fn new(function: impl Into<String>, loop_id: LoopId) -> Self {
        Self {
            function: function.into(),
            loop_id,
        }
    }
}

impl fmt::Display for LoopKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.function, self.loop_id)
    }
}

/// Fields the counter discovery managed to fill, in guard order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartialDescriptor {
    pub counter_root: Option<StorageCell>,
    pub init: Option<i64>,
    pub predicate: Option<Predicate>,
    pub check_value: Option<i64>,
    pub increment: Option<Interval>,
}

/// Per-loop result handed to the cost model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoopBoundResult {
    key: LoopKey,
    header: BlockId,
    depth: u32,
    classification: Classification,
    counter_root: Option<StorageCell>,
    init: Option<i64>,
    predicate: Option<Predicate>,
    check_value: Option<i64>,
    increment_interval: Option<Interval>,
    bound_interval: Option<Interval>,
    issue: Option<AnalysisIssue>,
}

impl LoopBoundResult {
    /// Result of a loop whose bound was solved.
    #[allow(clippy::too_many_arguments)]
    pub fn normal(
        key: LoopKey,
        header: BlockId,
        depth: u32,
        counter_root: StorageCell,
        init: i64,
        predicate: Predicate,
        check_value: i64,
        increment: Interval,
        bound: Interval,
    ) -> Self {
        Self {
            key,
            header,
            depth,
            classification: Classification::Normal,
            counter_root: Some(counter_root),
            init: Some(init),
            predicate: Some(predicate),
            check_value: Some(check_value),
            increment_interval: Some(increment),
            bound_interval: Some(bound),
            issue: None,
        }
    }

    /// Result of a loop that falls back to the configured constant for `issue`.
    pub fn fallback(
        key: LoopKey,
        header: BlockId,
        depth: u32,
        issue: AnalysisIssue,
        partial: PartialDescriptor,
    ) -> Self {
        Self {
            key,
            header,
            depth,
            classification: issue.classification(),
            counter_root: partial.counter_root,
            init: partial.init,
            predicate: partial.predicate,
            check_value: partial.check_value,
            increment_interval: partial.increment,
            bound_interval: None,
            issue: Some(issue),
        }
    }

    #[inline]
    pub fn key(&self) -> &LoopKey {
        &self.key
    }

    #[inline]
    pub fn header(&self) -> BlockId {
        self.header
    }

    #[inline]
    pub fn depth(&self) -> u32 {
        self.depth
    }

    #[inline]
    pub fn classification(&self) -> Classification {
        self.classification
    }

    #[inline]
    pub fn counter_root(&self) -> Option<StorageCell> {
        self.counter_root
    }

    #[inline]
    pub fn init(&self) -> Option<i64> {
        self.init
    }

    #[inline]
    pub fn predicate(&self) -> Option<Predicate> {
        self.predicate
    }

    #[inline]
    pub fn check_value(&self) -> Option<i64> {
        self.check_value
    }

    #[inline]
    pub fn increment_interval(&self) -> Option<Interval> {
        self.increment_interval
    }

    #[inline]
    pub fn bound_interval(&self) -> Option<Interval> {
        self.bound_interval
    }

    #[inline]
    pub fn issue(&self) -> Option<&AnalysisIssue> {
        self.issue.as_ref()
    }

    /// Trip-count interval to use downstream: the solved bound, or the fallback constant.
    pub fn trip_count(&self, config: &AnalysisConfig) -> TripCount {
        match self.bound_interval {
            Some(bound) => TripCount {
                low: bound.low().max(0) as u64,
                high: bound.high().max(0) as u64,
                source: TripCountSource::Computed,
            },
            None => {
                let value = config.fallback_for(self.classification);
                TripCount {
                    low: value,
                    high: value,
                    source: TripCountSource::Fallback(self.classification),
                }
            }
        }
    }
}

impl fmt::Display for LoopBoundResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (header {}, depth {}): {}",
            self.key, self.header, self.depth, self.classification
        )?;
        if let Some(bound) = self.bound_interval {
            write!(f, ", trips {bound}")?;
        }
        if let (Some(root), Some(init), Some(p), Some(check)) =
            (self.counter_root, self.init, self.predicate, self.check_value)
        {
            write!(f, ", {root} = {init}; {root} {p} {check}")?;
        }
        if let Some(step) = self.increment_interval {
            write!(f, "; step {step} {}", step.family())?;
        }
        if let Some(issue) = &self.issue {
            write!(f, " ({issue})")?;
        }
        Ok(())
    }
}

/// Where a trip count came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TripCountSource {
    Computed,
    Fallback(Classification),
}

/// Trip-count interval consumed by the cost model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TripCount {
    pub low: u64,
    pub high: u64,
    pub source: TripCountSource,
}

/// All loop results of a module, ordered by `LoopKey`.
///
/// Serializes as a list of results in key order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoopBoundReport {
    results: BTreeMap<LoopKey, LoopBoundResult>,
}

impl LoopBoundReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, result: LoopBoundResult) {
        self.results.insert(result.key.clone(), result);
    }

    #[inline]
    pub fn get(&self, key: &LoopKey) -> Option<&LoopBoundResult> {
        self.results.get(key)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.results.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &LoopBoundResult> + '_ {
        self.results.values()
    }

    /// Results of one function, in loop order.
    pub fn for_function<'a>(&'a self, function: &'a str) -> impl Iterator<Item = &'a LoopBoundResult> + 'a {
        self.results
            .range(LoopKey::new(function, 0)..)
            .take_while(move |(key, _)| key.function == function)
            .map(|(_, result)| result)
    }

    /// Number of loops per classification.
    pub fn summary(&self) -> BTreeMap<Classification, usize> {
        let mut counts = BTreeMap::new();
        for result in self.results.values() {
            *counts.entry(result.classification).or_insert(0) += 1;
        }
        counts
    }
}

impl Serialize for LoopBoundReport {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.results.values())
    }
}

impl Extend<LoopBoundResult> for LoopBoundReport {
    fn extend<I: IntoIterator<Item = LoopBoundResult>>(&mut self, iter: I) {
        for result in iter {
            self.insert(result);
        }
    }
}

impl fmt::Display for LoopBoundReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for result in self.results.values() {
            writeln!(f, "{result}")?;
        }
        let summary = self
            .summary()
            .into_iter()
            .map(|(c, n)| format!("{c}: {n}"))
            .collect::<Vec<_>>()
            .join(", ");
        write!(f, "{} loops ({summary})", self.results.len())
    }
}
