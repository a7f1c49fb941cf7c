//! Error types for forward curve construction.

use fcurve_core::FcurveError;
use fcurve_math::MathError;
use thiserror::Error;

/// A specialized Result type for curve-construction operations.
pub type CurveResult<T> = Result<T, CurveError>;

/// Errors that can occur while bootstrapping or interpolating a forward
/// curve. Wraps the shared [`FcurveError`] taxonomy (argument validation,
/// overlap, redundancy, over-constraint, numeric failure) and the
/// dense-solve failures surfaced by [`fcurve_math`].
#[derive(Error, Debug, Clone)]
pub enum CurveError {
    /// An error from the shared period/contract taxonomy.
    #[error(transparent)]
    Core(#[from] FcurveError),

    /// The assembled linear system could not be solved.
    #[error("Numeric solve failed: {0}")]
    MathFailure(#[from] MathError),
}

impl CurveError {
    /// Creates an invalid-argument error.
    #[must_use]
    pub fn invalid_argument(reason: impl Into<String>) -> Self {
        Self::Core(FcurveError::invalid_argument(reason))
    }

    /// Creates an overlap error.
    #[must_use]
    pub fn overlap(reason: impl Into<String>) -> Self {
        Self::Core(FcurveError::overlap(reason))
    }

    /// Creates a redundancy error.
    #[must_use]
    pub fn redundant(reason: impl Into<String>) -> Self {
        Self::Core(FcurveError::redundant(reason))
    }

    /// Creates an over-constrained error.
    #[must_use]
    pub fn over_constrained(constraints: usize, unknowns: usize) -> Self {
        Self::Core(FcurveError::over_constrained(constraints, unknowns))
    }

    /// Creates a numeric-failure error.
    #[must_use]
    pub fn numeric_failure(reason: impl Into<String>) -> Self {
        Self::Core(FcurveError::numeric_failure(reason))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wraps_core_error() {
        let err: CurveError = FcurveError::overlap("Jan-2024 and Q1-2024 overlap").into();
        assert!(err.to_string().contains("overlap"));
    }

    #[test]
    fn wraps_math_error() {
        let err: CurveError = MathError::SingularMatrix.into();
        assert!(err.to_string().contains("Numeric solve failed"));
    }

    #[test]
    fn over_constrained_carries_counts() {
        let err = CurveError::over_constrained(14, 12);
        let msg = err.to_string();
        assert!(msg.contains("14"));
        assert!(msg.contains("12"));
    }
}
