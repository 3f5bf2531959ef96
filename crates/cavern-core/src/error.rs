//! Error types for the Cavern core types.

use thiserror::Error;

use crate::types::Granularity;

/// A specialized Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors raised by periods, time series and discounting.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoreError {
    /// Error in date calculations or invalid date.
    #[error("Invalid date: {message}")]
    InvalidDate {
        /// Description of the date error.
        message: String,
    },

    /// Two values with different period granularities were combined.
    #[error("Frequency mismatch: expected {expected}, found {actual}")]
    FrequencyMismatch {
        /// Granularity the operation was set up with.
        expected: Granularity,
        /// Granularity actually supplied.
        actual: Granularity,
    },

    /// A period lies outside the range covered by a series.
    #[error("Period {period} is outside the range {start} to {end}")]
    PeriodOutOfRange {
        /// The requested period.
        period: String,
        /// First covered period.
        start: String,
        /// Last covered period.
        end: String,
    },

    /// A time series could not be constructed.
    #[error("Invalid series: {reason}")]
    InvalidSeries {
        /// Why the series was rejected.
        reason: String,
    },
}

impl CoreError {
    /// Creates an invalid date error.
    #[must_use]
    pub fn invalid_date(message: impl Into<String>) -> Self {
        Self::InvalidDate {
            message: message.into(),
        }
    }

    /// Creates a frequency mismatch error.
    #[must_use]
    pub fn frequency_mismatch(expected: Granularity, actual: Granularity) -> Self {
        Self::FrequencyMismatch { expected, actual }
    }

    /// Creates an out-of-range error.
    #[must_use]
    pub fn out_of_range(
        period: impl ToString,
        start: impl ToString,
        end: impl ToString,
    ) -> Self {
        Self::PeriodOutOfRange {
            period: period.to_string(),
            start: start.to_string(),
            end: end.to_string(),
        }
    }

    /// Creates an invalid series error.
    #[must_use]
    pub fn invalid_series(reason: impl Into<String>) -> Self {
        Self::InvalidSeries {
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CoreError::invalid_date("2024-02-30");
        assert!(err.to_string().contains("Invalid date"));

        let err = CoreError::frequency_mismatch(Granularity::Daily, Granularity::Monthly);
        assert_eq!(err.to_string(), "Frequency mismatch: expected Daily, found Monthly");
    }
}
