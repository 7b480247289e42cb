//! Curve fitting orchestration.
//!
//! Responsibilities:
//!
//! - validate the parameter count against the fit form
//! - run Levenberg–Marquardt from an all-ones start
//! - attach the human-readable label to the fitted parameters
//! - extrapolate the fitted curve and predict at the target input size

pub mod extrapolate;
pub mod fitter;

pub use extrapolate::*;
pub use fitter::*;
