//! Per-fine-period coefficient assembly.
//!
//! Every solver in this crate reduces a contract's forward-price constraint
//! to a linear combination of `discount * weight` (and, for the spline
//! solvers, `mult_adjust` / `add_adjust`) terms over the fine periods the
//! contract covers. This module materialises those vectors once against a
//! [`PeriodAxis`] so the bootstrapper and spline solvers share one
//! evaluation path for the caller-supplied callbacks.

use fcurve_core::Period;

use crate::calendar::PeriodAxis;

/// Caller-supplied per-fine-period callbacks, each defaulting to the
/// identity/no-op value named in its field comment.
pub struct Coefficients<'a> {
    /// Discount factor per fine period. Default: `1.0`.
    pub discount: Box<dyn Fn(Period) -> f64 + 'a>,
    /// Averaging weight per fine period (e.g. peak/off-peak volume).
    /// Default: `1.0`. A fine period with weight `0.0` contributes nothing
    /// to any contract average that spans it exclusively.
    pub weight: Box<dyn Fn(Period) -> f64 + 'a>,
    /// Multiplicative seasonal adjustment applied to the curve value.
    /// Default: `1.0`.
    pub mult_adjust: Box<dyn Fn(Period) -> f64 + 'a>,
    /// Additive seasonal adjustment applied to the curve value.
    /// Default: `0.0`.
    pub add_adjust: Box<dyn Fn(Period) -> f64 + 'a>,
}

impl<'a> Default for Coefficients<'a> {
    fn default() -> Self {
        Self {
            discount: Box::new(|_| 1.0),
            weight: Box::new(|_| 1.0),
            mult_adjust: Box::new(|_| 1.0),
            add_adjust: Box::new(|_| 0.0),
        }
    }
}

impl<'a> Coefficients<'a> {
    /// `discount(k) * weight(k)`, the product every weighted average uses.
    #[must_use]
    pub fn w(&self, period: Period) -> f64 {
        (self.discount)(period) * (self.weight)(period)
    }

    /// The `Σ w_k` normaliser for a half-open fine-period index range
    /// `[a..b)` on `axis`.
    #[must_use]
    pub fn weight_sum(&self, axis: &PeriodAxis, a: usize, b: usize) -> f64 {
        (a..b).map(|i| self.w(axis.period(i))).sum()
    }

    /// `Σ w_k * add_adjust_k` over `[a..b)`, the additive-adjustment term
    /// subtracted from a contract's constraint RHS.
    #[must_use]
    pub fn add_adjust_term(&self, axis: &PeriodAxis, a: usize, b: usize) -> f64 {
        (a..b)
            .map(|i| {
                let p = axis.period(i);
                self.w(p) * (self.add_adjust)(p)
            })
            .sum()
    }
}
