//! Domain types for forward curve construction.
//!
//! - [`Date`]: calendar date backing day-and-coarser periods
//! - [`Granularity`]: the resolution of a delivery period
//! - [`Period`]: a single delivery period at a given granularity
//! - [`Contract`]: a forward quote over a delivery window
//! - [`ShapingConstraint`]: a caller-specified ratio or spread constraint

mod contract;
mod date;
mod granularity;
mod period;

pub use contract::{Contract, ShapingConstraint};
pub use date::Date;
pub use granularity::Granularity;
pub use period::Period;
