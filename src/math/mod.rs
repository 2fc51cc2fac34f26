//! Numerical helpers: least squares trend lines and regression metrics.

pub mod ols;
pub mod stats;

pub use ols::*;
pub use stats::*;
