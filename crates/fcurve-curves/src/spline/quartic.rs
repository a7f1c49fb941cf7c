//! Maximum-smoothness quartic spline variant (§4.3, legacy path).
//!
//! Same scaffolding as the tension spline but with a quartic polynomial
//! basis per section. Within section `j`, at local offset `u = t - t0_j`:
//!
//! ```text
//! S_j(u) = a_j + b_j u + c_j u^2 + d_j u^3 + e_j u^4
//! ```
//!
//! Continuity of value, first, and second derivative is enforced at every
//! internal knot; `S''` depends only on `(c, d, e)`, so the smoothness
//! penalty `∫(S'')² du` reduces to a closed-form quadratic in those three
//! coefficients per section (no quadrature needed, unlike the hyperbolic
//! basis).

use std::collections::BTreeMap;

use fcurve_core::{Contract, Period};
use nalgebra::{DMatrix, DVector};

use crate::calendar::PeriodAxis;
use crate::coefficients::Coefficients;
use crate::error::{CurveError, CurveResult};
use crate::shaping;

/// Result of [`quartic_max_smooth`].
pub struct QuarticOutput {
    /// Fine-granularity curve value at every period on the axis.
    pub forward_curve: Vec<(Period, f64)>,
    /// Estimated condition number of the solved linear system.
    pub condition_estimate: f64,
}

struct Section {
    base_col: usize,
    t0: f64,
    h: f64,
}

impl Section {
    fn cols(&self) -> [usize; 5] {
        [self.base_col, self.base_col + 1, self.base_col + 2, self.base_col + 3, self.base_col + 4]
    }

    fn value_coeffs(&self, t: f64) -> [f64; 5] {
        let u = t - self.t0;
        [1.0, u, u * u, u.powi(3), u.powi(4)]
    }

    fn deriv1_coeffs(&self, u: f64) -> [f64; 5] {
        [0.0, 1.0, 2.0 * u, 3.0 * u * u, 4.0 * u.powi(3)]
    }

    fn deriv2_coeffs(&self, u: f64) -> [f64; 5] {
        [0.0, 0.0, 2.0, 6.0 * u, 12.0 * u * u]
    }

    /// Closed-form `H` contribution (over `c, d, e`) for `∫_0^h (S'')² du`,
    /// scaled so that `(1/2) xᵀHx` equals the integral.
    fn curvature_block(&self) -> [[f64; 3]; 3] {
        let h = self.h;
        [
            [8.0 * h, 12.0 * h * h, 16.0 * h.powi(3)],
            [12.0 * h * h, 24.0 * h.powi(3), 36.0 * h.powi(4)],
            [16.0 * h.powi(3), 36.0 * h.powi(4), 57.6 * h.powi(5)],
        ]
    }
}

/// Solves for a maximum-smoothness quartic curve satisfying every
/// contract's weighted-average equality.
///
/// # Errors
///
/// See [`crate::spline::tension::hyperbolic_tension_spline`]'s taxonomy;
/// this solver shares the same `InvalidArgument` / `OverConstrained` /
/// numeric-failure conditions, minus tension validation.
pub fn quartic_max_smooth(
    contracts: &[Contract],
    coeffs: &Coefficients<'_>,
    front_first_derivative: Option<f64>,
    back_first_derivative: Option<f64>,
) -> CurveResult<QuarticOutput> {
    if contracts.len() < 2 {
        return Err(CurveError::invalid_argument("need at least two contracts"));
    }
    let any_overlap = contracts
        .iter()
        .enumerate()
        .any(|(i, a)| contracts[i + 1..].iter().any(|b| a.overlaps(b)));
    if any_overlap {
        return Err(CurveError::overlap(
            "quartic solver requires non-overlapping contracts",
        ));
    }

    let mut ordered = contracts.to_vec();
    ordered.sort_by_key(|c| (c.start(), c.end()));

    let first = ordered[0].start();
    let last = ordered.iter().map(Contract::end).max().expect("non-empty");
    let axis = PeriodAxis::build(first, last)?;

    // One section per contract (non-overlapping, so contract boundaries
    // are the only knots needed for value continuity).
    let mut knot_indices = vec![0usize];
    for c in &ordered {
        let (_, b) = shaping::fine_range(&axis, c.start(), c.end())?;
        knot_indices.push(b);
    }
    knot_indices.dedup();

    let num_sections = knot_indices.len() - 1;
    let unknowns = 5 * num_sections;

    let sections: Vec<Section> = (0..num_sections)
        .map(|j| {
            let a = knot_indices[j];
            let b = knot_indices[j + 1];
            let t0 = axis.year_fraction(a);
            let t1 = if b < axis.len() {
                axis.year_fraction(b)
            } else {
                axis.period(axis.len() - 1).next()?.act365_years_since(&axis.period(0))
            };
            Ok::<_, CurveError>(Section { base_col: 5 * j, t0, h: t1 - t0 })
        })
        .collect::<CurveResult<Vec<_>>>()?;

    let mut section_of = vec![0usize; axis.len()];
    for j in 0..num_sections {
        let (a, b) = (knot_indices[j], knot_indices[j + 1]);
        for slot in section_of.iter_mut().take(b).skip(a) {
            *slot = j;
        }
    }

    let mut rows: Vec<(BTreeMap<usize, f64>, f64)> = Vec::new();

    for c in &ordered {
        let (a, b) = shaping::fine_range(&axis, c.start(), c.end())?;
        let mut row = BTreeMap::new();
        let mut w_total = 0.0;
        for k in a..b {
            let period = axis.period(k);
            let w_k = coeffs.w(period);
            w_total += w_k;
            let section = &sections[section_of[k]];
            let t = axis.year_fraction(k);
            for (col, coef) in section.cols().into_iter().zip(section.value_coeffs(t)) {
                *row.entry(col).or_insert(0.0) += w_k * coef;
            }
        }
        if w_total == 0.0 {
            return Err(CurveError::invalid_argument(format!(
                "contract {}..{} has zero total weight",
                c.start(),
                c.end()
            )));
        }
        rows.push((row, c.price() * w_total));
    }

    for j in 1..num_sections {
        let left = &sections[j - 1];
        let right = &sections[j];
        let h = left.h;
        let value_l = left.value_coeffs(left.t0 + h);
        let d1_l = left.deriv1_coeffs(h);
        let d2_l = left.deriv2_coeffs(h);
        let value_r = right.value_coeffs(right.t0);
        let d1_r = right.deriv1_coeffs(0.0);
        let d2_r = right.deriv2_coeffs(0.0);

        for (d_left, d_right) in [(value_l, value_r), (d1_l, d1_r), (d2_l, d2_r)] {
            let mut row = BTreeMap::new();
            for (col, coef) in left.cols().into_iter().zip(d_left) {
                *row.entry(col).or_insert(0.0) += coef;
            }
            for (col, coef) in right.cols().into_iter().zip(d_right) {
                *row.entry(col).or_insert(0.0) -= coef;
            }
            rows.push((row, 0.0));
        }
    }

    let front = &sections[0];
    let front_row = if let Some(target) = front_first_derivative {
        let row: BTreeMap<usize, f64> = front.cols().into_iter().zip(front.deriv1_coeffs(0.0)).collect();
        (row, target)
    } else {
        (BTreeMap::from([(front.base_col + 2, 1.0)]), 0.0)
    };
    rows.push(front_row);

    let back = sections.last().expect("at least one section");
    let back_row = if let Some(target) = back_first_derivative {
        let row: BTreeMap<usize, f64> = back.cols().into_iter().zip(back.deriv1_coeffs(back.h)).collect();
        (row, target)
    } else {
        let d2 = back.deriv2_coeffs(back.h);
        let row: BTreeMap<usize, f64> = back.cols().into_iter().zip(d2).collect();
        (row, 0.0)
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
            let block = section.curvature_block();
            let cols = [section.base_col + 2, section.base_col + 3, section.base_col + 4];
            for (bi, &ci) in cols.iter().enumerate() {
                for (bj, &cj) in cols.iter().enumerate() {
                    h[(ci, cj)] += block[bi][bj];
                }
            }
        }
        let g = DVector::<f64>::zeros(unknowns);
        let (x, _lambda, condition) = fcurve_math::linear_algebra::solve_symmetric_kkt(&h, &a_matrix, &g, &rhs)?;
        (x, condition)
    };

    if !condition_estimate.is_finite() || condition_estimate > 1e12 {
        return Err(CurveError::numeric_failure(format!(
            "quartic system is ill-conditioned (estimated condition number {condition_estimate:.3e})"
        )));
    }

    let forward_curve = (0..axis.len())
        .map(|k| {
            let period = axis.period(k);
            let section = &sections[section_of[k]];
            let t = axis.year_fraction(k);
            let coefs = section.value_coeffs(t);
            let value: f64 = coefs
                .iter()
                .zip(section.cols())
                .map(|(coef, col)| coef * x[col])
                .sum();
            (period, value * (coeffs.mult_adjust)(period) + (coeffs.add_adjust)(period))
        })
        .collect();

    Ok(QuarticOutput { forward_curve, condition_estimate })
}
