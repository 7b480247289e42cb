//! Reporting utilities: residuals, labels and formatted terminal output.

pub mod format;

pub use format::*;

use crate::domain::FitResult;
use crate::error::AppError;
use crate::models::predict;

/// Observed vs. fitted value for one input row.
#[derive(Debug, Clone, PartialEq)]
pub struct RowResidual {
    pub x: f64,
    pub y_obs: f64,
    pub y_fit: f64,
    pub residual: f64,
}

/// Compute fitted values and residuals for each observation.
pub fn compute_residuals(x: &[f64], y: &[f64], fit: &FitResult) -> Result<Vec<RowResidual>, AppError> {
    let mut out = Vec::with_capacity(x.len());
    for (&xi, &yi) in x.iter().zip(y) {
        let y_fit = predict(fit.form, xi, &fit.params);
        if !y_fit.is_finite() {
            return Err(AppError::fit("Non-finite model prediction during residual computation."));
        }
        out.push(RowResidual {
            x: xi,
            y_obs: yi,
            y_fit,
            residual: yi - y_fit,
        });
    }
    Ok(out)
}
