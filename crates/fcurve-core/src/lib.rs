//! # fcurve-core
//!
//! Core types for forward commodity curve construction.
//!
//! This crate provides the foundational building blocks shared by every
//! solver in the workspace:
//!
//! - **Types**: [`Date`], [`Granularity`], [`Period`], [`Contract`],
//!   [`ShapingConstraint`]
//! - **Errors**: the [`FcurveError`] taxonomy
//!
//! ## Design Philosophy
//!
//! - **Type Safety**: newtypes prevent mixing incompatible granularities
//! - **Explicit Over Implicit**: clear, self-documenting APIs
//! - **No ambient state**: every type here is an immutable value
//!
//! ## Example
//!
//! ```rust
//! use fcurve_core::prelude::*;
//!
//! let jan = Period::month(Date::from_ymd(2024, 1, 1).unwrap());
//! let mar = Period::month(Date::from_ymd(2024, 3, 1).unwrap());
//! let q1 = Contract::new(jan, mar, 62.64).unwrap();
//! assert_eq!(q1.price(), 62.64);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod types;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::error::{FcurveError, FcurveResult};
    pub use crate::types::{Contract, Date, Granularity, Period, ShapingConstraint};
}

// Re-export commonly used types at crate root
pub use error::{FcurveError, FcurveResult};
pub use types::{Contract, Date, Granularity, Period, ShapingConstraint};
