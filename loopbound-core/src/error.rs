//! Error Handling
//!
//! This module provides the error types of the loop-bound engine using `thiserror`.
//!
//! # Error Categories
//! - **Fatal errors** (`LoopBoundError`): configuration problems and malformed IR.
//!   These abort the run before any loop is analyzed.
//! - **Per-loop issues** (`AnalysisIssue`): recoverable findings recorded on a loop's
//!   result. Each issue maps onto the `Classification` whose fallback constant applies.

use crate::loopbound::result::Classification;
use serde::Serialize;
use thiserror::Error;

/// Result alias used throughout the core.
pub type Result<T> = std::result::Result<T, LoopBoundError>;

/// Fatal loop-bound errors.
///
/// Every variant except the wrapped I/O and JSON errors carries a suggestion
/// that is printed together with the message.
#[derive(Error, Debug)]
pub enum LoopBoundError {
    /// Configuration file has the wrong shape or an invalid value.
    #[error("Invalid configuration: {message}\nSuggestion: {suggestion}")]
    InvalidConfig { message: String, suggestion: String },

    /// A required fallback entry is absent.
    #[error("Missing fallback entry `{key}`\nSuggestion: {suggestion}")]
    MissingFallback { key: String, suggestion: String },

    /// A fallback entry is zero or negative.
    #[error("Fallback entry `{key}` must be a positive integer, got {value}\nSuggestion: {suggestion}")]
    NonPositiveFallback {
        key: String,
        value: i64,
        suggestion: String,
    },

    /// The IR handed to the analyzer violates a structural rule.
    #[error("Malformed IR in function `{function}`: {message}\nSuggestion: {suggestion}")]
    MalformedIr {
        function: String,
        message: String,
        suggestion: String,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl LoopBoundError {
    /// Create an invalid-configuration error.
    #[cold]
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
            suggestion: "Expected {\"analysis\": {\"fallback\": {...}}} with positive integer entries."
                .to_string(),
        }
    }

    /// Create a missing-fallback error for a configuration key.
    #[cold]
    pub fn missing_fallback(key: &str) -> Self {
        Self::MissingFallback {
            key: key.to_string(),
            suggestion: format!("Add \"{key}\": <positive integer> to analysis.fallback."),
        }
    }

    /// Create a non-positive-fallback error for a configuration key.
    #[cold]
    pub fn non_positive_fallback(key: &str, value: i64) -> Self {
        Self::NonPositiveFallback {
            key: key.to_string(),
            value,
            suggestion: "Fallback trip counts are conservative estimates and must be at least 1."
                .to_string(),
        }
    }

    /// Create a malformed-IR error for a function.
    #[cold]
    pub fn malformed_ir(function: &str, message: impl Into<String>) -> Self {
        Self::MalformedIr {
            function: function.to_string(),
            message: message.into(),
            suggestion: "Every block must end in exactly one terminator and all references must be in range."
                .to_string(),
        }
    }
}

/// Recoverable per-loop finding.
///
/// The classifier never fails; it records at most one issue per loop and the
/// issue determines the classification (and so the fallback constant).
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "reason")]
pub enum AnalysisIssue {
    /// Loop shape is not trusted: several exits, no latch or preheader,
    /// or an exit condition that is not a comparison.
    #[error("structural anomaly: {0}")]
    StructuralAnomaly(String),

    /// The bound is written inside an enclosing loop.
    #[error("cross-loop dependency: {0}")]
    CrossLoopDependency(String),

    /// The bound or the initial value is not a compile-time constant.
    #[error("unresolved symbol: {0}")]
    UnresolvedSymbol(String),

    /// The counter is not updated by a recognized constant step.
    #[error("unrecognized increment pattern: {0}")]
    UnrecognizedIncrementPattern(String),

    /// The closed-form solver rejected its inputs.
    #[error("arithmetic unsolvable: {0}")]
    ArithmeticUnsolvable(String),

    /// The dataflow worklist budget of the enclosing function ran out.
    #[error("worklist budget exhausted after {0} block visits")]
    BudgetExhausted(usize),
}

impl AnalysisIssue {
    /// Classification a loop receives when this issue is recorded.
    #[inline]
    pub fn classification(&self) -> Classification {
        match self {
            AnalysisIssue::StructuralAnomaly(_) => Classification::Malformed,
            AnalysisIssue::CrossLoopDependency(_) => Classification::Nested,
            AnalysisIssue::UnresolvedSymbol(_) => Classification::SymbolicBound,
            AnalysisIssue::UnrecognizedIncrementPattern(_) => Classification::NonCounting,
            AnalysisIssue::ArithmeticUnsolvable(_) | AnalysisIssue::BudgetExhausted(_) => {
                Classification::Unknown
            }
        }
    }

    #[cold]
    pub fn structural(reason: impl Into<String>) -> Self {
        Self::StructuralAnomaly(reason.into())
    }

    #[cold]
    pub fn unresolved(reason: impl Into<String>) -> Self {
        Self::UnresolvedSymbol(reason.into())
    }

    #[cold]
    pub fn unrecognized(reason: impl Into<String>) -> Self {
        Self::UnrecognizedIncrementPattern(reason.into())
    }

    #[cold]
    pub fn unsolvable(reason: impl Into<String>) -> Self {
        Self::ArithmeticUnsolvable(reason.into())
    }
}
