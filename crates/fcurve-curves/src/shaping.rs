//! Linear-row construction for contract-average and shaping constraints.
//!
//! Every constraint this crate's solvers assemble — a contract's
//! weighted-average equality or a caller's ratio/spread shaping request —
//! reduces to a sparse linear combination of `discount * weight` terms over
//! a fine-period index range. This module builds that row once, in
//! fine-period space; the bootstrapper aggregates it into atom space, and
//! the spline solvers substitute each fine index for its section's basis
//! columns.

use fcurve_core::{FcurveError, FcurveResult, Period, ShapingConstraint};

use crate::calendar::PeriodAxis;
use crate::coefficients::Coefficients;

/// A sparse linear row over fine-period indices plus its right-hand side.
#[derive(Debug, Clone)]
pub struct WeightedRow {
    /// `(fine_index, coefficient)` pairs, not necessarily sorted or deduped.
    pub weights: Vec<(usize, f64)>,
    /// Right-hand side of the row's equation.
    pub rhs: f64,
}

/// Resolves an inclusive `[start..end]` period window to a half-open fine
/// index range `[a..b)` on `axis`.
///
/// # Errors
///
/// Returns `FcurveError::InvalidArgument` if either endpoint does not lie on
/// `axis` (e.g. the window has not been normalised to the axis granularity).
pub fn fine_range(axis: &PeriodAxis, start: Period, end: Period) -> FcurveResult<(usize, usize)> {
    let a = axis
        .index_of(start)
        .ok_or_else(|| FcurveError::invalid_argument(format!("{start} is not on the curve axis")))?;
    let b = axis
        .index_of(end)
        .ok_or_else(|| FcurveError::invalid_argument(format!("{end} is not on the curve axis")))?;
    Ok((a, b + 1))
}

/// The weighted-average-equality row for one forward contract:
/// `Σ w_k/W * F_k = price`.
///
/// # Errors
///
/// Returns `FcurveError::InvalidArgument` if the window is off-axis or its
/// total weight is zero (a contract entirely over zero-weight periods has
/// no fair price and cannot constrain the curve).
pub fn contract_average_row(
    axis: &PeriodAxis,
    coeffs: &Coefficients<'_>,
    start: Period,
    end: Period,
    price: f64,
) -> FcurveResult<WeightedRow> {
    let (a, b) = fine_range(axis, start, end)?;
    let total = coeffs.weight_sum(axis, a, b);
    if total == 0.0 {
        return Err(FcurveError::invalid_argument(format!(
            "contract {start}..{end} has zero total weight"
        )));
    }
    let weights = (a..b).map(|k| (k, coeffs.w(axis.period(k)) / total)).collect();
    Ok(WeightedRow { weights, rhs: price })
}

/// Builds the linear row for one [`ShapingConstraint`].
///
/// # Errors
///
/// Returns `FcurveError::InvalidArgument` if either window is off-axis or
/// has zero total weight.
pub fn shaping_row(
    axis: &PeriodAxis,
    coeffs: &Coefficients<'_>,
    constraint: &ShapingConstraint,
) -> FcurveResult<WeightedRow> {
    match *constraint {
        ShapingConstraint::Ratio {
            numerator,
            denominator,
            ratio,
        } => signed_difference_row(axis, coeffs, numerator, denominator, 1.0, -ratio, 0.0),
        ShapingConstraint::Spread { long, short, spread } => {
            signed_difference_row(axis, coeffs, long, short, 1.0, -1.0, spread)
        }
    }
}

fn signed_difference_row(
    axis: &PeriodAxis,
    coeffs: &Coefficients<'_>,
    window_a: (Period, Period),
    window_b: (Period, Period),
    sign_a: f64,
    sign_b: f64,
    base_rhs: f64,
) -> FcurveResult<WeightedRow> {
    let (a0, a1) = fine_range(axis, window_a.0, window_a.1)?;
    let (b0, b1) = fine_range(axis, window_b.0, window_b.1)?;
    let w_a = coeffs.weight_sum(axis, a0, a1);
    let w_b = coeffs.weight_sum(axis, b0, b1);
    if w_a == 0.0 || w_b == 0.0 {
        return Err(FcurveError::invalid_argument(
            "shaping constraint window has zero total weight",
        ));
    }

    let mut weights: Vec<(usize, f64)> = Vec::with_capacity((a1 - a0) + (b1 - b0));
    for k in a0..a1 {
        weights.push((k, sign_a * coeffs.w(axis.period(k)) / w_a));
    }
    for k in b0..b1 {
        let contribution = sign_b * coeffs.w(axis.period(k)) / w_b;
        if let Some(existing) = weights.iter_mut().find(|(idx, _)| *idx == k) {
            existing.1 += contribution;
        } else {
            weights.push((k, contribution));
        }
    }

    let rhs = base_rhs
        + sign_a * coeffs.add_adjust_term(axis, a0, a1) / w_a
        + sign_b * coeffs.add_adjust_term(axis, b0, b1) / w_b;
    Ok(WeightedRow { weights, rhs })
}
