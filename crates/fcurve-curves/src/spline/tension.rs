//! Hyperbolic tension spline solver (§4.2).
//!
//! Within section `i`, spanning knots at ACT/365 years `t_{i-1}` and `t_i`
//! with length `h_i` and effective tension `τ_i`, the spline value is
//!
//! ```text
//! S_i(t) = [z_{i-1} sinh(τ(t_i-t)) + z_i sinh(τ(t-t_{i-1}))] / (τ² sinh(τ h_i))
//!        + [(y_{i-1} - z_{i-1}/τ²)(t_i-t) + (y_i - z_i/τ²)(t-t_{i-1})] / h_i
//! ```
//!
//! `y_i` is the knot value, `z_i` the second-derivative-like coefficient;
//! `S` is linear in `(y, z)`, so every constraint this solver assembles is a
//! sparse row over the `2K` knot unknowns.

use std::collections::{BTreeMap, BTreeSet};

use fcurve_core::{Contract, FcurveResult, Period, ShapingConstraint};
use nalgebra::{DMatrix, DVector};

use crate::calendar::PeriodAxis;
use crate::coefficients::Coefficients;
use crate::error::{CurveError, CurveResult};
use crate::shaping;

/// Knot-placement flags combinable as a set (§6).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KnotPolicy {
    /// Add a knot at every contract's start.
    pub contract_start: bool,
    /// Add a knot just after every contract's end.
    pub contract_end: bool,
    /// Add a knot at the (rounded) midpoint of every contract.
    pub contract_centre: bool,
    /// Add a knot at the midpoint between every pair of consecutive
    /// boundaries already placed.
    pub spacing_centre: bool,
}

impl KnotPolicy {
    /// `CONTRACT_START` alone.
    #[must_use]
    pub fn contract_start() -> Self {
        Self { contract_start: true, ..Self::default() }
    }

    /// `CONTRACT_END` alone.
    #[must_use]
    pub fn contract_end() -> Self {
        Self { contract_end: true, ..Self::default() }
    }

    /// `CONTRACT_START_AND_END`.
    #[must_use]
    pub fn contract_start_and_end() -> Self {
        Self {
            contract_start: true,
            contract_end: true,
            ..Self::default()
        }
    }

    /// `CONTRACT_CENTRE` alone.
    #[must_use]
    pub fn contract_centre() -> Self {
        Self { contract_centre: true, ..Self::default() }
    }

    /// Combines two policies (a caller builds up a flag set by `|`-ing or
    /// calling this repeatedly).
    #[must_use]
    pub fn union(self, other: Self) -> Self {
        Self {
            contract_start: self.contract_start || other.contract_start,
            contract_end: self.contract_end || other.contract_end,
            contract_centre: self.contract_centre || other.contract_centre,
            spacing_centre: self.spacing_centre || other.spacing_centre,
        }
    }
}

/// One row of the optional spline-coefficient table: `(t, y, z, tension)`,
/// with `tension = NaN` on the final (terminal) knot.
#[derive(Debug, Clone, Copy)]
pub struct SplineParameterRow {
    /// ACT/365 years since the first knot.
    pub t: f64,
    /// Knot value.
    pub y: f64,
    /// Knot second-derivative-like coefficient.
    pub z: f64,
    /// Section tension used to the right of this knot (`NaN` on the last).
    pub tension: f64,
}

/// Result of [`hyperbolic_tension_spline`].
pub struct TensionSplineOutput {
    /// Fine-granularity curve value at every period on the axis.
    pub forward_curve: Vec<(Period, f64)>,
    /// One row per knot (see [`SplineParameterRow`]).
    pub spline_parameters: Vec<SplineParameterRow>,
    /// Estimated condition number of the solved linear system.
    pub condition_estimate: f64,
}

struct Section {
    y0_col: usize,
    z0_col: usize,
    y1_col: usize,
    z1_col: usize,
    t0: f64,
    t1: f64,
    h: f64,
    tau: f64,
}

impl Section {
    fn value_coeffs(&self, t: f64) -> [f64; 4] {
        let denom = self.tau.powi(2) * (self.tau * self.h).sinh();
        let c_z0 = (self.tau * (self.t1 - t)).sinh() / denom - (self.t1 - t) / (self.tau.powi(2) * self.h);
        let c_z1 = (self.tau * (t - self.t0)).sinh() / denom - (t - self.t0) / (self.tau.powi(2) * self.h);
        let c_y0 = (self.t1 - t) / self.h;
        let c_y1 = (t - self.t0) / self.h;
        [c_y0, c_z0, c_y1, c_z1]
    }

    fn deriv_at_left(&self) -> [f64; 4] {
        let denom = self.tau.powi(2) * (self.tau * self.h).sinh();
        let c_z0 = -self.tau * (self.tau * self.h).cosh() / denom + 1.0 / (self.tau.powi(2) * self.h);
        let c_z1 = self.tau / denom - 1.0 / (self.tau.powi(2) * self.h);
        [-1.0 / self.h, c_z0, 1.0 / self.h, c_z1]
    }

    fn deriv_at_right(&self) -> [f64; 4] {
        let denom = self.tau.powi(2) * (self.tau * self.h).sinh();
        let c_z0 = -self.tau / denom + 1.0 / (self.tau.powi(2) * self.h);
        let c_z1 = self.tau * (self.tau * self.h).cosh() / denom - 1.0 / (self.tau.powi(2) * self.h);
        [-1.0 / self.h, c_z0, 1.0 / self.h, c_z1]
    }

    fn columns(&self) -> [usize; 4] {
        [self.y0_col, self.z0_col, self.y1_col, self.z1_col]
    }
}

const GL5_NODES: [f64; 5] = [
    0.0,
    -0.538_469_310_105_683,
    0.538_469_310_105_683,
    -0.906_179_845_938_664,
    0.906_179_845_938_664,
];
const GL5_WEIGHTS: [f64; 5] = [
    0.568_888_888_888_888_9,
    0.478_628_670_499_366_5,
    0.478_628_670_499_366_5,
    0.236_926_885_056_189_1,
    0.236_926_885_056_189_1,
];

/// Curvature Gram block `[[I00, I01], [I01, I11]]` for `(z0, z1)` of one
/// section, evaluated by fixed 5-point Gauss-Legendre quadrature (the
/// closed-form sinh/cosh antiderivative is equivalent to machine precision
/// for the smooth integrand here and is not worth the extra algebra).
fn section_curvature_block(section: &Section) -> [[f64; 2]; 2] {
    let half = section.h / 2.0;
    let mid = (section.t0 + section.t1) / 2.0;
    let denom = (section.tau * section.h).sinh();
    let mut i00 = 0.0;
    let mut i01 = 0.0;
    let mut i11 = 0.0;
    for k in 0..5 {
        let t = mid + half * GL5_NODES[k];
        let weight = GL5_WEIGHTS[k] * half;
        let b_z0 = (section.tau * (section.t1 - t)).sinh() / denom;
        let b_z1 = (section.tau * (t - section.t0)).sinh() / denom;
        i00 += weight * b_z0 * b_z0;
        i01 += weight * b_z0 * b_z1;
        i11 += weight * b_z1 * b_z1;
    }
    [[i00, i01], [i01, i11]]
}

/// Solves for a hyperbolic tension spline curve satisfying every contract's
/// weighted-average equality (§4.2).
///
/// `tension` is evaluated once per section at that section's start period
/// and must return a strictly positive value. `explicit_knots`, when
/// supplied, overrides `knot_policy`; it is mandatory when `contracts`
/// overlap.
///
/// # Errors
///
/// See the module-level error taxonomy: `InvalidArgument` (fewer than two
/// contracts, non-ascending or out-of-range knots, non-positive tension),
/// `Overlap` (overlapping contracts without explicit knots),
/// `OverConstrained`, and numeric failures from the underlying solve.
#[allow(clippy::too_many_arguments)]
pub fn hyperbolic_tension_spline(
    contracts: &[Contract],
    coeffs: &Coefficients<'_>,
    shaping_constraints: &[ShapingConstraint],
    tension: &dyn Fn(Period) -> FcurveResult<f64>,
    explicit_knots: Option<&[Period]>,
    knot_policy: KnotPolicy,
    front_first_derivative: Option<f64>,
    back_first_derivative: Option<f64>,
) -> CurveResult<TensionSplineOutput> {
    if contracts.len() < 2 {
        return Err(CurveError::invalid_argument("need at least two contracts"));
    }
    let granularity = contracts[0].start().granularity();
    if contracts.iter().any(|c| c.start().granularity() != granularity) {
        return Err(CurveError::invalid_argument("all contracts must share one granularity"));
    }
    let any_overlap = contracts
        .iter()
        .enumerate()
        .any(|(i, a)| contracts[i + 1..].iter().any(|b| a.overlaps(b)));
    if any_overlap && explicit_knots.is_none() {
        return Err(CurveError::overlap(
            "contracts overlap; supply an explicit knot set",
        ));
    }

    let first = contracts.iter().map(Contract::start).min().expect("non-empty");
    let last = contracts.iter().map(Contract::end).max().expect("non-empty");
    let axis = PeriodAxis::build(first, last)?;

    let knot_indices = resolve_knots(explicit_knots, contracts, &axis, knot_policy)?;
    let num_knots = knot_indices.len();
    if num_knots < 2 {
        return Err(CurveError::invalid_argument("fewer than one spline section resolved"));
    }
    let unknowns = 2 * num_knots;

    let last_next_time = axis.period(axis.len() - 1).next()?.act365_years_since(&axis.period(0));
    let knot_time = |idx: usize| -> f64 {
        if idx < axis.len() {
            axis.year_fraction(idx)
        } else {
            last_next_time
        }
    };

    let mut sections = Vec::with_capacity(num_knots - 1);
    for j in 0..num_knots - 1 {
        let a = knot_indices[j];
        let b = knot_indices[j + 1];
        let t0 = knot_time(a);
        let t1 = knot_time(b);
        let h = t1 - t0;
        if h <= 0.0 {
            return Err(CurveError::numeric_failure("co-located spline knots"));
        }
        let tau_section = tension(axis.period(a))?;
        if !tau_section.is_finite() || tau_section <= 0.0 {
            return Err(CurveError::invalid_argument(format!(
                "tension at section {j} must be strictly positive, got {tau_section}"
            )));
        }
        sections.push(Section {
            y0_col: 2 * j,
            z0_col: 2 * j + 1,
            y1_col: 2 * (j + 1),
            z1_col: 2 * (j + 1) + 1,
            t0,
            t1,
            h,
            tau: tau_section / h,
        });
    }

    let mut section_of = vec![0usize; axis.len()];
    for (j, _) in sections.iter().enumerate() {
        let (a, b) = (knot_indices[j], knot_indices[j + 1]);
        for slot in section_of.iter_mut().take(b).skip(a) {
            *slot = j;
        }
    }

    let mut rows: Vec<(BTreeMap<usize, f64>, f64)> = Vec::new();

    for c in contracts {
        let (a, b) = shaping::fine_range(&axis, c.start(), c.end())?;
        let (cols, w_total, add_term) = accumulate_window(&axis, coeffs, &section_of, &sections, a, b);
        if w_total == 0.0 {
            return Err(CurveError::invalid_argument(format!(
                "contract {}..{} has zero total weight",
                c.start(),
                c.end()
            )));
        }
        rows.push((cols, c.price() * w_total - add_term));
    }

    for s in shaping_constraints {
        rows.push(shaping_columns_row(&axis, coeffs, &section_of, &sections, s)?);
    }

    let num_continuity = num_knots.saturating_sub(2);
    for j in 1..=num_continuity {
        let right = sections[j - 1].deriv_at_right();
        let left = sections[j].deriv_at_left();
        let mut row = BTreeMap::new();
        for (col, coef) in sections[j - 1].columns().into_iter().zip(right) {
            *row.entry(col).or_insert(0.0) += coef;
        }
        for (col, coef) in sections[j].columns().into_iter().zip(left) {
            *row.entry(col).or_insert(0.0) -= coef;
        }
        rows.push((row, 0.0));
    }

    // Front boundary.
    let front_row = if let Some(target) = front_first_derivative {
        let coefs = sections[0].deriv_at_left();
        let row: BTreeMap<usize, f64> = sections[0].columns().into_iter().zip(coefs).collect();
        (row, target)
    } else {
        (BTreeMap::from([(sections[0].z0_col, 1.0)]), 0.0)
    };
    rows.push(front_row);

    // Back boundary.
    let back_section = sections.last().expect("at least one section");
    let back_row = if let Some(target) = back_first_derivative {
        let coefs = back_section.deriv_at_right();
        let row: BTreeMap<usize, f64> = back_section.columns().into_iter().zip(coefs).collect();
        (row, target)
    } else {
        (BTreeMap::from([(back_section.z1_col, 1.0)]), 0.0)
    };
    rows.push(back_row);

    let constraints = rows.len();
    if constraints > unknowns {
        return Err(CurveError::over_constrained(constraints, unknowns));
    }

    let mut a_matrix = DMatrix::<f64>::zeros(constraints, unknowns);
    let mut rhs = DVector::<f64>::zeros(constraints);
    for (i, (row, value)) in rows.iter().enumerate() {
        for (&col, &coef) in row {
            a_matrix[(i, col)] += coef;
        }
        rhs[i] = *value;
    }

    let (x, condition_estimate) = if constraints == unknowns {
        fcurve_math::linear_algebra::solve_linear_system_partial_pivot(&a_matrix, &rhs)?
    } else {
        let mut h = DMatrix::<f64>::zeros(unknowns, unknowns);
        for section in &sections {
            let block = section_curvature_block(section);
            h[(section.z0_col, section.z0_col)] += 2.0 * block[0][0];
            h[(section.z0_col, section.z1_col)] += 2.0 * block[0][1];
            h[(section.z1_col, section.z0_col)] += 2.0 * block[1][0];
            h[(section.z1_col, section.z1_col)] += 2.0 * block[1][1];
        }
        let g = DVector::<f64>::zeros(unknowns);
        let (x, _lambda, condition) = fcurve_math::linear_algebra::solve_symmetric_kkt(&h, &a_matrix, &g, &rhs)?;
        (x, condition)
    };

    if !condition_estimate.is_finite() || condition_estimate > 1e12 {
        return Err(CurveError::numeric_failure(format!(
            "spline system is ill-conditioned (estimated condition number {condition_estimate:.3e})"
        )));
    }

    let spline_parameters = (0..num_knots)
        .map(|j| SplineParameterRow {
            t: knot_time(knot_indices[j]),
            y: x[2 * j],
            z: x[2 * j + 1],
            tension: if j < sections.len() { sections[j].tau * sections[j].h } else { f64::NAN },
        })
        .collect();

    Ok(TensionSplineOutput {
        forward_curve: apply_adjustments(&axis, coeffs, &sections, &section_of, &x),
        spline_parameters,
        condition_estimate,
    })
}

fn apply_adjustments(
    axis: &PeriodAxis,
    coeffs: &Coefficients<'_>,
    sections: &[Section],
    section_of: &[usize],
    x: &DVector<f64>,
) -> Vec<(Period, f64)> {
    (0..axis.len())
        .map(|k| {
            let period = axis.period(k);
            let section = &sections[section_of[k]];
            let t = axis.year_fraction(k);
            let c = section.value_coeffs(t);
            let raw = c[0] * x[section.y0_col] + c[1] * x[section.z0_col] + c[2] * x[section.y1_col] + c[3] * x[section.z1_col];
            (period, raw * (coeffs.mult_adjust)(period) + (coeffs.add_adjust)(period))
        })
        .collect()
}

fn resolve_knots(
    explicit: Option<&[Period]>,
    contracts: &[Contract],
    axis: &PeriodAxis,
    policy: KnotPolicy,
) -> CurveResult<Vec<usize>> {
    let mut set = BTreeSet::new();
    set.insert(0usize);

    if let Some(periods) = explicit {
        // Duplicates (e.g. two input quotes normalising to the same fine
        // start) are collapsed rather than rejected; only an actual
        // out-of-order knot is an error.
        let mut prev: Option<usize> = None;
        for &p in periods {
            let idx = axis
                .index_of(p)
                .ok_or_else(|| CurveError::invalid_argument(format!("knot {p} is outside [first..last]")))?;
            if let Some(previous) = prev {
                if idx < previous {
                    return Err(CurveError::invalid_argument("knots must be strictly ascending"));
                }
                if idx == previous {
                    continue;
                }
            }
            prev = Some(idx);
            set.insert(idx);
        }
    } else {
        resolve_policy_knots(contracts, axis, policy, &mut set)?;
    }

    set.insert(axis.len());
    Ok(set.into_iter().collect())
}

fn resolve_policy_knots(
    contracts: &[Contract],
    axis: &PeriodAxis,
    policy: KnotPolicy,
    set: &mut BTreeSet<usize>,
) -> CurveResult<()> {
    for c in contracts {
        let (a, b) = shaping::fine_range(axis, c.start(), c.end())?;
        if policy.contract_start {
            set.insert(a);
        }
        if policy.contract_end && b < axis.len() {
            set.insert(b);
        }
        if policy.contract_centre {
            set.insert(a + (b - a) / 2);
        }
    }
    if policy.spacing_centre {
        let existing: Vec<usize> = set.iter().copied().collect();
        for w in existing.windows(2) {
            let mid = w[0] + (w[1] - w[0]) / 2;
            if mid > w[0] && mid < w[1] {
                set.insert(mid);
            }
        }
    }
    Ok(())
}

#[allow(clippy::type_complexity)]
fn accumulate_window(
    axis: &PeriodAxis,
    coeffs: &Coefficients<'_>,
    section_of: &[usize],
    sections: &[Section],
    a: usize,
    b: usize,
) -> (BTreeMap<usize, f64>, f64, f64) {
    let mut cols = BTreeMap::new();
    let mut w_total = 0.0;
    let mut add_term = 0.0;
    for k in a..b {
        let period = axis.period(k);
        let w_k = coeffs.w(period);
        let m_k = (coeffs.mult_adjust)(period);
        w_total += w_k;
        add_term += w_k * m_k * (coeffs.add_adjust)(period);
        let section = &sections[section_of[k]];
        let t = axis.year_fraction(k);
        let basis = section.value_coeffs(t);
        for (col, coef) in section.columns().into_iter().zip(basis) {
            *cols.entry(col).or_insert(0.0) += w_k * m_k * coef;
        }
    }
    (cols, w_total, add_term)
}

fn shaping_columns_row(
    axis: &PeriodAxis,
    coeffs: &Coefficients<'_>,
    section_of: &[usize],
    sections: &[Section],
    constraint: &ShapingConstraint,
) -> CurveResult<(BTreeMap<usize, f64>, f64)> {
    let (window_a, window_b, sign, base_rhs) = match *constraint {
        ShapingConstraint::Ratio { numerator, denominator, ratio } => (numerator, denominator, -ratio, 0.0),
        ShapingConstraint::Spread { long, short, spread } => (long, short, -1.0, spread),
    };

    let (a0, a1) = shaping::fine_range(axis, window_a.0, window_a.1)?;
    let (b0, b1) = shaping::fine_range(axis, window_b.0, window_b.1)?;
    let (cols_a, w_a, add_a) = accumulate_window(axis, coeffs, section_of, sections, a0, a1);
    let (cols_b, w_b, add_b) = accumulate_window(axis, coeffs, section_of, sections, b0, b1);
    if w_a == 0.0 || w_b == 0.0 {
        return Err(CurveError::invalid_argument("shaping constraint window has zero total weight"));
    }

    let mut row = BTreeMap::new();
    for (col, coef) in cols_a {
        *row.entry(col).or_insert(0.0) += coef / w_a;
    }
    for (col, coef) in cols_b {
        *row.entry(col).or_insert(0.0) += sign * coef / w_b;
    }
    let rhs = base_rhs + add_a / w_a + sign * add_b / w_b;
    Ok((row, rhs))
}

#[cfg(test)]
mod tests {
    use super::*;
    use fcurve_core::Date;

    fn month(y: i32, m: u32) -> Period {
        Period::month(Date::from_ymd(y, m, 1).unwrap())
    }

    #[test]
    fn flat_price_input_reproduces_flat_curve_across_tensions() {
        let contracts = vec![
            Contract::single(month(2024, 1), 30.0).unwrap(),
            Contract::single(month(2024, 2), 30.0).unwrap(),
            Contract::single(month(2024, 3), 30.0).unwrap(),
            Contract::single(month(2024, 4), 30.0).unwrap(),
        ];
        let coeffs = Coefficients::default();
        for tension_value in [0.5, 2.0, 10.0] {
            let tension = move |_: Period| Ok(tension_value);
            let out = hyperbolic_tension_spline(
                &contracts,
                &coeffs,
                &[],
                &tension,
                None,
                KnotPolicy::contract_start_and_end(),
                None,
                None,
            )
            .unwrap();
            for (_, value) in &out.forward_curve {
                assert!((value - 30.0).abs() < 1e-6, "tension {tension_value}: value {value}");
            }
        }
    }

    #[test]
    fn rejects_overlap_without_explicit_knots() {
        let a = Contract::new(month(2024, 1), month(2024, 2), 20.0).unwrap();
        let b = Contract::new(month(2024, 2), month(2024, 3), 22.0).unwrap();
        let coeffs = Coefficients::default();
        let tension = |_: Period| Ok(1.0);
        let err = hyperbolic_tension_spline(
            &[a, b],
            &coeffs,
            &[],
            &tension,
            None,
            KnotPolicy::contract_start_and_end(),
            None,
            None,
        )
        .unwrap_err();
        assert!(err.to_string().to_lowercase().contains("overlap"));
    }

    #[test]
    fn rejects_non_positive_tension() {
        let contracts = vec![
            Contract::single(month(2024, 1), 20.0).unwrap(),
            Contract::single(month(2024, 2), 22.0).unwrap(),
        ];
        let coeffs = Coefficients::default();
        let tension = |_: Period| Ok(0.0);
        let err = hyperbolic_tension_spline(
            &contracts,
            &coeffs,
            &[],
            &tension,
            None,
            KnotPolicy::contract_start_and_end(),
            None,
            None,
        )
        .unwrap_err();
        assert!(err.to_string().to_lowercase().contains("invalid argument"));
    }
}
