//! Error types for forward curve construction.
//!
//! This module defines the error taxonomy shared by every crate in the
//! workspace, providing structured error handling with context.

use thiserror::Error;

/// A specialized Result type for fcurve-core operations.
pub type FcurveResult<T> = Result<T, FcurveError>;

/// The main error type for period/contract construction.
#[derive(Error, Debug, Clone)]
pub enum FcurveError {
    /// A caller-supplied argument is malformed or internally inconsistent.
    #[error("Invalid argument: {reason}")]
    InvalidArgument {
        /// Description of what is wrong with the argument.
        reason: String,
    },

    /// Input contracts overlap and no explicit knot set was supplied.
    #[error("Overlapping contracts require an explicit knot set: {reason}")]
    Overlap {
        /// Description of the offending overlap.
        reason: String,
    },

    /// The bootstrapper detected linearly dependent contract coverage.
    #[error("Redundant contract coverage: {reason}")]
    Redundant {
        /// Description naming the redundant contracts.
        reason: String,
    },

    /// The spline system has more constraints than unknowns.
    #[error("Over-constrained system: {constraints} constraints for {unknowns} unknowns")]
    OverConstrained {
        /// Number of assembled constraint rows.
        constraints: usize,
        /// Number of spline unknowns.
        unknowns: usize,
    },

    /// The assembled linear system was singular or unacceptably ill-conditioned.
    #[error("Numeric failure: {reason}")]
    NumericFailure {
        /// Diagnostic description, including condition estimate if available.
        reason: String,
    },

    /// Error parsing or constructing a calendar period.
    #[error("Calendar error: {reason}")]
    CalendarError {
        /// Description of the error.
        reason: String,
    },
}

impl FcurveError {
    /// Creates an invalid argument error.
    #[must_use]
    pub fn invalid_argument(reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            reason: reason.into(),
        }
    }

    /// Creates an overlap error.
    #[must_use]
    pub fn overlap(reason: impl Into<String>) -> Self {
        Self::Overlap {
            reason: reason.into(),
        }
    }

    /// Creates a redundancy error.
    #[must_use]
    pub fn redundant(reason: impl Into<String>) -> Self {
        Self::Redundant {
            reason: reason.into(),
        }
    }

    /// Creates an over-constrained error.
    #[must_use]
    pub fn over_constrained(constraints: usize, unknowns: usize) -> Self {
        Self::OverConstrained {
            constraints,
            unknowns,
        }
    }

    /// Creates a numeric failure error.
    #[must_use]
    pub fn numeric_failure(reason: impl Into<String>) -> Self {
        Self::NumericFailure {
            reason: reason.into(),
        }
    }

    /// Creates a calendar error.
    #[must_use]
    pub fn calendar_error(reason: impl Into<String>) -> Self {
        Self::CalendarError {
            reason: reason.into(),
        }
    }
}
