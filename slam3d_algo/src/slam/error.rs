//! Error types for the EKF-SLAM operators.

use std::fmt;

use nalgebra::Matrix3;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, SlamError>;

/// Errors returned by belief construction, prediction and update.
///
/// Both kinds are fatal to the call that produced them. The caller's
/// belief is never left partially modified.
#[derive(Debug, Clone, PartialEq)]
pub enum SlamError {
    /// Malformed input dimensionality or value.
    Validation {
        /// Name of the offending argument (e.g. `"v"`, `"measurements"`)
        argument: &'static str,
        /// What the operator required
        expected: String,
        /// What was observed
        actual: String,
    },

    /// The innovation covariance of a landmark could not be inverted.
    Numerical {
        /// Landmark whose correction failed
        landmark: usize,
        /// The ill-conditioned innovation covariance `S`
        matrix: Matrix3<f64>,
    },
}

impl SlamError {
    pub(crate) fn validation(
        argument: &'static str,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        SlamError::Validation {
            argument,
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, SlamError::Validation { .. })
    }

    pub fn is_numerical(&self) -> bool {
        matches!(self, SlamError::Numerical { .. })
    }
}

impl fmt::Display for SlamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SlamError::Validation {
                argument,
                expected,
                actual,
            } => write!(
                f,
                "invalid `{}`: expected {}, got {}",
                argument, expected, actual
            ),
            SlamError::Numerical { landmark, matrix } => write!(
                f,
                "innovation covariance for landmark {} is singular: {:?}",
                landmark,
                matrix.as_slice()
            ),
        }
    }
}

impl std::error::Error for SlamError {}
