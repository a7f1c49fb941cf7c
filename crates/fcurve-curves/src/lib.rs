//! # fcurve-curves
//!
//! Contiguous forward commodity price curve construction from forward
//! contract quotes.
//!
//! This crate provides the three entry points described in the design
//! notes:
//!
//! - [`bootstrap_contracts`] — atom-partition bootstrap of a piecewise-flat
//!   curve from (possibly overlapping) contracts, plus the minimal
//!   non-overlapping contract set equivalent to the input
//! - [`max_smooth_interp`] — the legacy maximum-smoothness quartic spline
//! - [`hyperbolic_tension_spline`] — the primary smooth interpolator, with
//!   caller-tunable tension, shaping constraints, and knot placement
//!
//! ## Quick Start
//!
//! ```rust
//! use fcurve_core::{Contract, Date, Period};
//! use fcurve_curves::{bootstrap_contracts, BootstrapArgs};
//!
//! let jan = Period::month(Date::from_ymd(2024, 1, 1).unwrap());
//! let feb = Period::month(Date::from_ymd(2024, 2, 1).unwrap());
//! let contracts = vec![
//!     Contract::single(jan, 20.0).unwrap(),
//!     Contract::single(feb, 22.0).unwrap(),
//! ];
//!
//! let out = bootstrap_contracts(&contracts, BootstrapArgs::default()).unwrap();
//! assert_eq!(out.contracts.len(), 2);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod bootstrap;
pub mod calendar;
pub mod coefficients;
pub mod contracts;
pub mod error;
pub mod shaping;
pub mod spline;

use fcurve_core::{Contract, Period, ShapingConstraint};

pub use bootstrap::BootstrapOutput;
pub use coefficients::Coefficients;
pub use contracts::ContractQuote;
pub use error::{CurveError, CurveResult};
pub use spline::{quartic::QuarticOutput, tension::SplineParameterRow, KnotPolicy, TensionSplineOutput};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::bootstrap::BootstrapOutput;
    pub use crate::calendar::PeriodAxis;
    pub use crate::coefficients::Coefficients;
    pub use crate::contracts::ContractQuote;
    pub use crate::error::{CurveError, CurveResult};
    pub use crate::spline::{KnotPolicy, QuarticOutput, SplineParameterRow, TensionSplineOutput};
    pub use crate::{bootstrap_contracts, hyperbolic_tension_spline, max_smooth_interp};
    pub use crate::{BootstrapArgs, QuarticArgs, TensionSplineArgs};
}

/// Arguments to [`bootstrap_contracts`], all optional beyond the contracts
/// themselves.
#[derive(Default)]
pub struct BootstrapArgs<'a> {
    /// Per-fine-period discount/weight callbacks.
    pub coefficients: Coefficients<'a>,
    /// Shaping constraints (ratio/spread) the output curve must satisfy.
    pub shaping: Vec<ShapingConstraint>,
    /// Drop linearly redundant contract rows instead of failing.
    pub allow_redundancy: bool,
    /// Caller-supplied target price per atom (defaults to the shortest
    /// covering contract's price).
    pub target_curve: Option<Box<dyn Fn(Contract) -> f64 + 'a>>,
}

/// Bootstraps a piecewise-flat curve from (possibly overlapping) forward
/// contracts (§4.1).
///
/// # Errors
///
/// See [`bootstrap::bootstrap`].
pub fn bootstrap_contracts(contracts: &[Contract], args: BootstrapArgs<'_>) -> CurveResult<BootstrapOutput> {
    bootstrap::bootstrap(
        contracts,
        &args.shaping,
        &args.coefficients,
        args.allow_redundancy,
        args.target_curve.as_deref(),
    )
}

/// Arguments to [`max_smooth_interp`].
#[derive(Default)]
pub struct QuarticArgs<'a> {
    /// Per-fine-period discount/weight/adjustment callbacks.
    pub coefficients: Coefficients<'a>,
    /// Required first derivative at the curve's front boundary, if any
    /// (defaults to the natural second-derivative-zero condition).
    pub front_first_derivative: Option<f64>,
    /// Required first derivative at the curve's back boundary, if any.
    pub back_first_derivative: Option<f64>,
}

/// Builds a maximum-smoothness quartic spline curve (§4.3, legacy path).
///
/// # Errors
///
/// See [`spline::quartic::quartic_max_smooth`].
pub fn max_smooth_interp(contracts: &[Contract], args: QuarticArgs<'_>) -> CurveResult<QuarticOutput> {
    spline::quartic::quartic_max_smooth(
        contracts,
        &args.coefficients,
        args.front_first_derivative,
        args.back_first_derivative,
    )
}

/// Arguments to [`hyperbolic_tension_spline`].
pub struct TensionSplineArgs<'a> {
    /// Per-fine-period discount/weight/adjustment callbacks.
    pub coefficients: Coefficients<'a>,
    /// Shaping constraints (ratio/spread) the output curve must satisfy.
    pub shaping: Vec<ShapingConstraint>,
    /// Section tension, evaluated once per section at that section's start
    /// period. Must be strictly positive.
    pub tension: Box<dyn Fn(Period) -> fcurve_core::FcurveResult<f64> + 'a>,
    /// Explicit knot set, overriding `knot_policy`. Mandatory when
    /// `contracts` overlap.
    pub explicit_knots: Option<Vec<Period>>,
    /// Knot-placement policy used when `explicit_knots` is `None`.
    pub knot_policy: KnotPolicy,
    /// Required first derivative at the curve's front boundary, if any.
    pub front_first_derivative: Option<f64>,
    /// Required first derivative at the curve's back boundary, if any.
    pub back_first_derivative: Option<f64>,
}

impl<'a> Default for TensionSplineArgs<'a> {
    fn default() -> Self {
        Self {
            coefficients: Coefficients::default(),
            shaping: Vec::new(),
            tension: Box::new(|_| Ok(1.0)),
            explicit_knots: None,
            knot_policy: KnotPolicy::contract_start_and_end(),
            front_first_derivative: None,
            back_first_derivative: None,
        }
    }
}

/// Builds a hyperbolic tension spline forward curve (§4.2), the primary
/// smooth interpolator.
///
/// # Errors
///
/// See [`spline::tension::hyperbolic_tension_spline`].
pub fn hyperbolic_tension_spline(
    contracts: &[Contract],
    args: TensionSplineArgs<'_>,
) -> CurveResult<TensionSplineOutput> {
    spline::tension::hyperbolic_tension_spline(
        contracts,
        &args.coefficients,
        &args.shaping,
        args.tension.as_ref(),
        args.explicit_knots.as_deref(),
        args.knot_policy,
        args.front_first_derivative,
        args.back_first_derivative,
    )
}
