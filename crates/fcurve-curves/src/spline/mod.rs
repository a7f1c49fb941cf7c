//! Spline-based curve solvers (§4.2, §4.3): smooth fine-granularity curves
//! satisfying weighted-average forward-price constraints.

pub mod quartic;
pub mod tension;

pub use quartic::{quartic_max_smooth, QuarticOutput};
pub use tension::{hyperbolic_tension_spline, KnotPolicy, SplineParameterRow, TensionSplineOutput};
