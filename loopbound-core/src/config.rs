//! Analysis Configuration
//!
//! The fallback trip counts and solver limits, loaded from JSON:
//!
//! ```json
//! {
//!   "analysis": {
//!     "fallback": {
//!       "MALFORMED_LOOP": 100,
//!       "SYMBOLIC_BOUND_LOOP": 100,
//!       "NON_COUNTING_LOOP": 100,
//!       "NESTED_LOOP": 100,
//!       "UNKNOWN_LOOP": 100
//!     },
//!     "max_worklist_iterations": 100000,
//!     "parallel": true
//!   }
//! }
//! ```
//!
//! An `AnalysisConfig` can only be obtained through a validating constructor, so holding
//! one proves every fallback entry is present and positive.

use crate::error::{LoopBoundError, Result};
use crate::loopbound::dataflow::DEFAULT_MAX_WORKLIST_ITERATIONS;
use crate::loopbound::result::Classification;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Fallback trip counts keyed by classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FallbackTable {
    #[serde(rename = "MALFORMED_LOOP")]
    malformed: u64,
    #[serde(rename = "SYMBOLIC_BOUND_LOOP")]
    symbolic_bound: u64,
    #[serde(rename = "NON_COUNTING_LOOP")]
    non_counting: u64,
    #[serde(rename = "NESTED_LOOP")]
    nested: u64,
    #[serde(rename = "UNKNOWN_LOOP")]
    unknown: u64,
}

impl FallbackTable {
    /// Build a table from explicit values; every value must be at least 1.
    pub fn new(
        malformed: u64,
        symbolic_bound: u64,
        non_counting: u64,
        nested: u64,
        unknown: u64,
    ) -> Result<Self> {
        let table = Self {
            malformed,
            symbolic_bound,
            non_counting,
            nested,
            unknown,
        };
        for classification in Classification::ALL {
            if let Some(key) = classification.config_key() {
                if table.get(classification) == 0 {
                    return Err(LoopBoundError::non_positive_fallback(key, 0));
                }
            }
        }
        Ok(table)
    }

    /// Build a table from raw configuration entries.
    pub fn from_entries(entries: &BTreeMap<String, i64>) -> Result<Self> {
        let lookup = |classification: Classification| -> Result<u64> {
            let Some(key) = classification.config_key() else {
                return Ok(0);
            };
            let value = *entries
                .get(key)
                .ok_or_else(|| LoopBoundError::missing_fallback(key))?;
            if value <= 0 {
                return Err(LoopBoundError::non_positive_fallback(key, value));
            }
            Ok(value as u64)
        };

        for key in entries.keys() {
            let known = Classification::ALL
                .iter()
                .any(|c| c.config_key() == Some(key.as_str()));
            if !known {
                log::warn!("Ignoring unknown fallback entry `{key}`");
            }
        }

        Self::new(
            lookup(Classification::Malformed)?,
            lookup(Classification::SymbolicBound)?,
            lookup(Classification::NonCounting)?,
            lookup(Classification::Nested)?,
            lookup(Classification::Unknown)?,
        )
    }

    /// Fallback for a classification; `Normal` loops use the `Unknown` entry if asked.
    #[inline]
    pub fn get(&self, classification: Classification) -> u64 {
        match classification {
            Classification::Malformed => self.malformed,
            Classification::SymbolicBound => self.symbolic_bound,
            Classification::NonCounting => self.non_counting,
            Classification::Nested => self.nested,
            Classification::Unknown | Classification::Normal => self.unknown,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ConfigFile {
    analysis: RawAnalysisConfig,
}

#[derive(Debug, Deserialize)]
struct RawAnalysisConfig {
    fallback: BTreeMap<String, i64>,
    #[serde(default)]
    max_worklist_iterations: Option<usize>,
    #[serde(default)]
    parallel: Option<bool>,
}

/// Validated configuration of one analysis run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnalysisConfig {
    fallback: FallbackTable,
    max_worklist_iterations: usize,
    parallel: bool,
}

impl AnalysisConfig {
    /// Configuration with default limits and parallel function analysis.
    pub fn new(fallback: FallbackTable) -> Self {
        Self {
            fallback,
            max_worklist_iterations: DEFAULT_MAX_WORKLIST_ITERATIONS,
            parallel: true,
        }
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Set the per-function worklist budget (must be non-zero).
    pub fn with_max_worklist_iterations(mut self, max: usize) -> Result<Self> {
        if max == 0 {
            return Err(LoopBoundError::invalid_config(
                "max_worklist_iterations must be at least 1",
            ));
        }
        self.max_worklist_iterations = max;
        Ok(self)
    }

    /// Parse and validate a configuration document.
    pub fn from_json_str(text: &str) -> Result<Self> {
        let file: ConfigFile = serde_json::from_str(text)
            .map_err(|e| LoopBoundError::invalid_config(e.to_string()))?;
        let raw = file.analysis;
        let mut config = Self::new(FallbackTable::from_entries(&raw.fallback)?);
        if let Some(max) = raw.max_worklist_iterations {
            config = config.with_max_worklist_iterations(max)?;
        }
        if let Some(parallel) = raw.parallel {
            config = config.with_parallel(parallel);
        }
        Ok(config)
    }

    /// Load and validate a configuration file.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config = Self::from_json_str(&content)
            .with_context(|| format!("Invalid config file: {}", path.display()))?;
        log::info!("Loaded analysis configuration from {}", path.display());
        Ok(config)
    }

    #[inline]
    pub fn fallback(&self) -> &FallbackTable {
        &self.fallback
    }

    #[inline]
    pub fn fallback_for(&self, classification: Classification) -> u64 {
        self.fallback.get(classification)
    }

    #[inline]
    pub fn max_worklist_iterations(&self) -> usize {
        self.max_worklist_iterations
    }

    #[inline]
    pub fn parallel(&self) -> bool {
        self.parallel
    }
}
