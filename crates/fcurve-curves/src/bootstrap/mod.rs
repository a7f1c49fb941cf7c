//! Atom-partition bootstrapper (§4.1): reduces overlapping forward
//! contracts to a minimal non-overlapping, piecewise-flat curve.

use fcurve_core::{Contract, Period, ShapingConstraint};
use nalgebra::{DMatrix, DVector};

use crate::calendar::PeriodAxis;
use crate::coefficients::Coefficients;
use crate::error::{CurveError, CurveResult};
use crate::shaping::{self, WeightedRow};

/// Result of [`bootstrap`].
pub struct BootstrapOutput {
    /// Fine-granularity curve value at every period on the axis.
    pub forward_curve: Vec<(Period, f64)>,
    /// The minimal non-overlapping contract set equivalent to the input,
    /// in chronological order.
    pub contracts: Vec<Contract>,
    /// Estimated condition number of the solved linear system.
    pub condition_estimate: f64,
}

/// Bootstraps a piecewise-flat curve from (possibly overlapping) input
/// contracts plus optional shaping constraints.
///
/// `target` supplies the atom's preferred price before the least-squares
/// projection onto the constraint set; when `None`, each atom defaults to
/// the price of the shortest input contract covering it.
///
/// # Errors
///
/// Returns `CurveError::Core(InvalidArgument)` for empty or
/// mismatched-granularity input, `CurveError::Core(Redundant)` if the
/// constraint set is rank-deficient and `allow_redundancy` is `false`,
/// `CurveError::Core(OverConstrained)` if independent constraints outnumber
/// atoms, and `CurveError::MathFailure` / `numeric_failure` if the KKT solve
/// fails or is ill-conditioned.
pub fn bootstrap(
    contracts: &[Contract],
    shaping: &[ShapingConstraint],
    coeffs: &Coefficients<'_>,
    allow_redundancy: bool,
    target: Option<&dyn Fn(Contract) -> f64>,
) -> CurveResult<BootstrapOutput> {
    if contracts.is_empty() {
        return Err(CurveError::invalid_argument("no contracts supplied"));
    }
    let granularity = contracts[0].start().granularity();
    if contracts.iter().any(|c| c.start().granularity() != granularity) {
        return Err(CurveError::invalid_argument(
            "all contracts must share one granularity",
        ));
    }

    let mut ordered: Vec<Contract> = contracts.to_vec();
    ordered.sort_by_key(|c| (c.start(), c.end()));

    let first = ordered.iter().map(Contract::start).min().expect("non-empty");
    let last = ordered.iter().map(Contract::end).max().expect("non-empty");
    let axis = PeriodAxis::build(first, last)?;

    let coverage = coverage_per_fine_index(&ordered, &axis)?;
    let atoms = partition_atoms(&coverage);
    let fine_to_atom = fine_to_atom_map(&atoms, axis.len());

    let atom_weights: Vec<f64> = atoms
        .iter()
        .map(|&(a, b)| coeffs.weight_sum(&axis, a, b))
        .collect();

    let mut rows: Vec<WeightedRow> = Vec::with_capacity(ordered.len() + shaping.len());
    for c in &ordered {
        rows.push(shaping::contract_average_row(&axis, coeffs, c.start(), c.end(), c.price())?);
    }
    for s in shaping {
        rows.push(shaping::shaping_row(&axis, coeffs, s)?);
    }

    let num_atoms = atoms.len();
    let mut a = DMatrix::<f64>::zeros(rows.len(), num_atoms);
    let mut c = DVector::<f64>::zeros(rows.len());
    for (i, row) in rows.iter().enumerate() {
        for &(fine_index, weight) in &row.weights {
            let atom = fine_to_atom[fine_index];
            a[(i, atom)] += weight;
        }
        c[i] = row.rhs;
    }

    let mut widths = Vec::with_capacity(ordered.len());
    for c in &ordered {
        let (a0, b0) = shaping::fine_range(&axis, c.start(), c.end())?;
        widths.push(b0 - a0);
    }
    let mut order: Vec<usize> = (0..ordered.len()).collect();
    order.sort_by_key(|&i| widths[i]);
    order.extend(ordered.len()..rows.len());

    let redundant = redundant_row_indices(&a, &order, 1e-9);
    let (a, c, kept_contracts) = if redundant.is_empty() {
        (a, c, ordered.len())
    } else if allow_redundancy {
        drop_rows(&a, &c, &redundant)
    } else {
        return Err(CurveError::redundant(format!(
            "{} of {} input contracts are linearly redundant given the others",
            redundant.len(),
            ordered.len()
        )));
    };
    let _ = kept_contracts;

    if a.nrows() > num_atoms {
        return Err(CurveError::over_constrained(a.nrows(), num_atoms));
    }

    let x_star = DVector::from_iterator(
        num_atoms,
        atoms.iter().map(|&(a0, a1)| {
            target_price_for_atom(&ordered, &axis, a0, a1, target)
        }),
    );

    let h = DMatrix::<f64>::identity(num_atoms, num_atoms) * 2.0;
    let g = &x_star * 2.0;
    let (x, _lambda, condition_estimate) =
        fcurve_math::linear_algebra::solve_symmetric_kkt(&h, &a, &g, &c)?;

    if !condition_estimate.is_finite() || condition_estimate > 1e12 {
        return Err(CurveError::numeric_failure(format!(
            "bootstrap system is ill-conditioned (estimated condition number {condition_estimate:.3e})"
        )));
    }

    let forward_curve = (0..axis.len())
        .map(|i| (axis.period(i), x[fine_to_atom[i]]))
        .collect();

    let out_contracts = atoms
        .iter()
        .zip(x.iter())
        .map(|(&(a0, a1), &price)| Contract::new(axis.period(a0), axis.period(a1 - 1), price))
        .collect::<fcurve_core::FcurveResult<Vec<_>>>()?;

    Ok(BootstrapOutput {
        forward_curve,
        contracts: out_contracts,
        condition_estimate,
    })
}

fn target_price_for_atom(
    contracts: &[Contract],
    axis: &PeriodAxis,
    a0: usize,
    a1: usize,
    target: Option<&dyn Fn(Contract) -> f64>,
) -> f64 {
    let atom_start = axis.period(a0);
    let atom_end = axis.period(a1 - 1);
    let shortest = contracts
        .iter()
        .filter(|c| c.start() <= atom_start && atom_end <= c.end())
        .min_by_key(|c| {
            axis.index_of(c.end()).unwrap_or(usize::MAX) - axis.index_of(c.start()).unwrap_or(0)
        });
    match (target, shortest) {
        (Some(f), Some(&c)) => f(c),
        (None, Some(c)) => c.price(),
        _ => 0.0,
    }
}

fn coverage_per_fine_index(contracts: &[Contract], axis: &PeriodAxis) -> CurveResult<Vec<Vec<usize>>> {
    let mut coverage = vec![Vec::new(); axis.len()];
    for (idx, c) in contracts.iter().enumerate() {
        let (a, b) = shaping::fine_range(axis, c.start(), c.end())?;
        for k in coverage.iter_mut().take(b).skip(a) {
            k.push(idx);
        }
    }
    Ok(coverage)
}

fn partition_atoms(coverage: &[Vec<usize>]) -> Vec<(usize, usize)> {
    let mut atoms = Vec::new();
    let mut start = 0;
    for i in 1..=coverage.len() {
        if i == coverage.len() || coverage[i] != coverage[start] {
            atoms.push((start, i));
            start = i;
        }
    }
    atoms
}

fn fine_to_atom_map(atoms: &[(usize, usize)], n: usize) -> Vec<usize> {
    let mut map = vec![0usize; n];
    for (atom_index, &(a, b)) in atoms.iter().enumerate() {
        for slot in map.iter_mut().take(b).skip(a) {
            *slot = atom_index;
        }
    }
    map
}

/// Finds rows that are linear combinations of earlier-processed rows, via
/// sequential Gauss-Jordan reduction. `order` gives the processing order
/// (row indices into `a`), not the row numbering of the returned result —
/// the caller feeds contract rows in ascending coverage width followed by
/// shaping rows, so that when a wide aggregate contract (e.g. a quarter)
/// turns out to be a linear combination of rows already accepted, it is the
/// aggregate that is flagged redundant rather than one of the narrower
/// contracts it aggregates. The returned indices are sorted ascending.
fn redundant_row_indices(a: &DMatrix<f64>, order: &[usize], tol: f64) -> Vec<usize> {
    let mut pivots: Vec<(usize, DVector<f64>)> = Vec::new();
    let mut redundant = Vec::new();
    for &i in order {
        let mut row = a.row(i).clone_owned().transpose();
        for (pivot_col, pivot_row) in &pivots {
            let factor = row[*pivot_col];
            if factor.abs() > tol {
                row -= pivot_row * factor;
            }
        }
        if let Some(pivot_col) = (0..row.len()).find(|&j| row[j].abs() > tol) {
            let scale = row[pivot_col];
            pivots.push((pivot_col, row / scale));
        } else {
            redundant.push(i);
        }
    }
    redundant.sort_unstable();
    redundant
}

fn drop_rows(a: &DMatrix<f64>, c: &DVector<f64>, drop: &[usize]) -> (DMatrix<f64>, DVector<f64>, usize) {
    let keep: Vec<usize> = (0..a.nrows()).filter(|i| !drop.contains(i)).collect();
    let reduced_a = DMatrix::from_rows(&keep.iter().map(|&i| a.row(i).clone_owned()).collect::<Vec<_>>());
    let reduced_c = DVector::from_iterator(keep.len(), keep.iter().map(|&i| c[i]));
    (reduced_a, reduced_c, keep.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use fcurve_core::Date;

    fn month(y: i32, m: u32) -> Period {
        Period::month(Date::from_ymd(y, m, 1).unwrap())
    }

    #[test]
    fn non_overlapping_monthly_contracts_round_trip() {
        let contracts = vec![
            Contract::single(month(2024, 1), 20.0).unwrap(),
            Contract::single(month(2024, 2), 22.0).unwrap(),
            Contract::single(month(2024, 3), 24.0).unwrap(),
        ];
        let coeffs = Coefficients::default();
        let out = bootstrap(&contracts, &[], &coeffs, false, None).unwrap();
        assert_eq!(out.contracts.len(), 3);
        for (c, expected) in out.contracts.iter().zip([20.0, 22.0, 24.0]) {
            assert!((c.price() - expected).abs() < 1e-6);
        }
    }

    #[test]
    fn quarter_plus_months_is_redundant_without_opt_in() {
        let q1 = Contract::new(month(2024, 1), month(2024, 3), 22.0).unwrap();
        let jan = Contract::single(month(2024, 1), 20.0).unwrap();
        let feb = Contract::single(month(2024, 2), 22.0).unwrap();
        let mar = Contract::single(month(2024, 3), 24.0).unwrap();
        let coeffs = Coefficients::default();
        let err = bootstrap(&[q1, jan, feb, mar], &[], &coeffs, false, None).unwrap_err();
        assert!(err.to_string().to_lowercase().contains("redundant"));
    }

    #[test]
    fn quarter_plus_months_resolves_with_redundancy_allowed() {
        let q1 = Contract::new(month(2024, 1), month(2024, 3), 22.0).unwrap();
        let jan = Contract::single(month(2024, 1), 20.0).unwrap();
        let feb = Contract::single(month(2024, 2), 22.0).unwrap();
        let mar = Contract::single(month(2024, 3), 24.0).unwrap();
        let coeffs = Coefficients::default();
        let out = bootstrap(&[q1, jan, feb, mar], &[], &coeffs, true, None).unwrap();
        assert_eq!(out.contracts.len(), 3);
    }
}
