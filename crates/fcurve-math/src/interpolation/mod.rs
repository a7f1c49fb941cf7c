//! Interpolation utilities kept as reference building blocks.
//!
//! [`CubicSpline`] is not used directly by the tension-spline or
//! maximum-smoothness solvers (those have their own hyperbolic and quartic
//! bases), but it documents the crate's `Interpolator` trait idiom and the
//! Thomas-algorithm solve style reused by [`crate::linear_algebra`].

mod cubic_spline;

pub use cubic_spline::CubicSpline;

use crate::error::MathResult;

/// Trait for interpolation methods.
pub trait Interpolator: Send + Sync {
    /// Returns the interpolated value at x.
    fn interpolate(&self, x: f64) -> MathResult<f64>;

    /// Returns the first derivative at x.
    fn derivative(&self, x: f64) -> MathResult<f64>;

    /// Returns true if extrapolation is allowed.
    fn allows_extrapolation(&self) -> bool {
        false
    }

    /// Returns the minimum x value in the data.
    fn min_x(&self) -> f64;

    /// Returns the maximum x value in the data.
    fn max_x(&self) -> f64;

    /// Checks if x is within the interpolation range.
    fn in_range(&self, x: f64) -> bool {
        x >= self.min_x() && x <= self.max_x()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_cubic_spline_passes_through_points() {
        let times = vec![0.5, 1.0, 2.0, 3.0, 5.0];
        let rates = vec![0.02, 0.025, 0.03, 0.035, 0.04];

        let spline = CubicSpline::new(times.clone(), rates.clone()).unwrap();
        for (t, r) in times.iter().zip(rates.iter()) {
            assert_relative_eq!(spline.interpolate(*t).unwrap(), *r, epsilon = 1e-10);
        }
    }

    #[test]
    fn test_derivative_consistency() {
        let times = vec![0.5, 1.0, 2.0, 3.0, 5.0];
        let rates = vec![0.02, 0.025, 0.03, 0.035, 0.04];

        let spline = CubicSpline::new(times, rates).unwrap();
        let h = 1e-6;
        let t = 1.5;
        let numerical =
            (spline.interpolate(t + h).unwrap() - spline.interpolate(t - h).unwrap()) / (2.0 * h);
        let analytical = spline.derivative(t).unwrap();
        assert!((analytical - numerical).abs() < 1e-4);
    }
}
