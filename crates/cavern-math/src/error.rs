//! Error types for numerical routines.

use thiserror::Error;

/// A specialized Result type for numerical routines.
pub type MathResult<T> = Result<T, MathError>;

/// Failures of the numerical building blocks.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MathError {
    /// A solver ran out of iterations.
    #[error("no convergence within {iterations} iterations, residual {residual:.2e}")]
    ConvergenceFailed {
        /// Iterations performed.
        iterations: u32,
        /// Residual at the last iterate.
        residual: f64,
    },

    /// The end points of a bracket do not straddle a root.
    #[error("root not bracketed: f({a}) = {fa:.2e}, f({b}) = {fb:.2e}")]
    InvalidBracket {
        /// Left end.
        a: f64,
        /// Right end.
        b: f64,
        /// f(a).
        fa: f64,
        /// f(b).
        fb: f64,
    },

    /// A polynomial fit produced a singular system.
    #[error("singular interpolation system")]
    SingularMatrix,

    /// Query outside the interpolation data.
    #[error("{x} lies outside the data range [{min}, {max}]")]
    ExtrapolationNotAllowed {
        /// Query point.
        x: f64,
        /// Smallest abscissa.
        min: f64,
        /// Largest abscissa.
        max: f64,
    },

    /// Too few data points.
    #[error("{required} or more points needed, {actual} supplied")]
    InsufficientData {
        /// Points needed.
        required: usize,
        /// Points supplied.
        actual: usize,
    },

    /// Malformed arguments.
    #[error("invalid input: {reason}")]
    InvalidInput {
        /// What was wrong.
        reason: String,
    },
}

impl MathError {
    /// Solver ran out of iterations.
    #[must_use]
    pub fn convergence_failed(iterations: u32, residual: f64) -> Self {
        Self::ConvergenceFailed {
            iterations,
            residual,
        }
    }

    /// Malformed arguments.
    #[must_use]
    pub fn invalid_input(reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            reason: reason.into(),
        }
    }

    /// Too few points.
    #[must_use]
    pub fn insufficient_data(required: usize, actual: usize) -> Self {
        Self::InsufficientData { required, actual }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = MathError::convergence_failed(100, 1e-6);
        assert!(err.to_string().contains("within 100 iterations"));

        let err = MathError::ExtrapolationNotAllowed {
            x: 2.5,
            min: 0.0,
            max: 2.0,
        };
        assert_eq!(err.to_string(), "2.5 lies outside the data range [0, 2]");
    }
}
