//! Error types for storage valuation.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use cavern_core::{CoreError, Granularity};
use cavern_math::MathError;

/// A specialized Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors raised while building a storage model or valuing it.
///
/// Configuration and frequency errors are detected before any backward
/// induction sweep starts. An infeasible state found during a sweep aborts
/// the whole valuation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StorageError {
    /// Missing, contradictory or invalid parameters.
    #[error("Configuration error: {reason}")]
    Configuration {
        /// Description of the problem.
        reason: String,
    },

    /// Inputs with different period granularities were combined.
    #[error("Frequency mismatch in {context}: expected {expected}, found {actual}")]
    FrequencyMismatch {
        /// Which input was rejected.
        context: String,
        /// Granularity of the storage model.
        expected: Granularity,
        /// Granularity of the rejected input.
        actual: Granularity,
    },

    /// No feasible decision exists.
    #[error("Infeasible state in period {period}: {reason}")]
    InfeasibleState {
        /// Period in which infeasibility was found.
        period: String,
        /// Description of the infeasibility.
        reason: String,
    },

    /// A query fell outside the declared period or inventory bounds.
    #[error("Out of range: {reason}")]
    OutOfRange {
        /// Description of the offending query.
        reason: String,
    },

    /// Numerical routine failure.
    #[error("Numerical error: {0}")]
    Math(#[from] MathError),
}

impl StorageError {
    /// Creates a configuration error.
    #[must_use]
    pub fn configuration(reason: impl Into<String>) -> Self {
        Self::Configuration {
            reason: reason.into(),
        }
    }

    /// Creates a frequency mismatch error.
    #[must_use]
    pub fn frequency_mismatch(
        context: impl Into<String>,
        expected: Granularity,
        actual: Granularity,
    ) -> Self {
        Self::FrequencyMismatch {
            context: context.into(),
            expected,
            actual,
        }
    }

    /// Creates an infeasible state error.
    #[must_use]
    pub fn infeasible(period: impl ToString, reason: impl Into<String>) -> Self {
        Self::InfeasibleState {
            period: period.to_string(),
            reason: reason.into(),
        }
    }

    /// Creates an out-of-range error.
    #[must_use]
    pub fn out_of_range(reason: impl Into<String>) -> Self {
        Self::OutOfRange {
            reason: reason.into(),
        }
    }

    /// Returns true for errors detected before valuation starts.
    #[must_use]
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::Configuration { .. } | Self::FrequencyMismatch { .. }
        )
    }
}

impl From<CoreError> for StorageError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::FrequencyMismatch { expected, actual } => Self::FrequencyMismatch {
                context: "period arithmetic".to_string(),
                expected,
                actual,
            },
            CoreError::PeriodOutOfRange { .. } => Self::out_of_range(err.to_string()),
            CoreError::InvalidDate { .. } | CoreError::InvalidSeries { .. } => {
                Self::configuration(err.to_string())
            }
        }
    }
}

/// A non-fatal numerical compromise made while building a tree.
///
/// Raised when the moment-matched transition probabilities of a node fall
/// outside `[0, 1]` and had to be clipped and renormalised.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ToleranceWarning {
    /// Tree step (not storage period) the node belongs to.
    pub step: usize,
    /// Node offset from the centre of the lattice.
    pub node: i64,
    /// Most negative probability before clipping.
    pub min_probability: f64,
}

impl fmt::Display for ToleranceWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "transition probability {:.3e} clipped at step {} node {}",
            self.min_probability, self.step, self.node
        )
    }
}
