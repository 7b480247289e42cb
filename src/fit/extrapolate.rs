//! Extrapolation line and target prediction.
//!
//! The line starts at the smallest observed input size and advances in unit
//! steps up to (but excluding) `max_x`. The prediction at the target is looked
//! up by x-value, so the target does not need to line up with any index of
//! the line.

use tracing::debug;

use crate::domain::{ExtrapolationLine, FitResult, Prediction};
use crate::error::AppError;
use crate::models::{evaluate, predict};

/// Upper bound on the number of points in the extrapolation line.
pub const MAX_LINE_POINTS: usize = 10_000_000;

/// Evaluate the fitted curve over `[x_min, max_x)` with unit step.
pub fn extrapolation_line(fit: &FitResult, x_min: f64, max_x: f64) -> Result<ExtrapolationLine, AppError> {
    if !(x_min.is_finite() && max_x.is_finite()) || max_x <= x_min {
        return Err(AppError::usage(format!(
            "max_x ({max_x}) must be greater than the smallest input size ({x_min})."
        )));
    }

    let span = (max_x - x_min).ceil();
    if span > MAX_LINE_POINTS as f64 {
        return Err(AppError::usage(format!(
            "Extrapolation span [{x_min}, {max_x}) needs {span} points; the limit is {MAX_LINE_POINTS}."
        )));
    }
    let n = span as usize;
    let xs: Vec<f64> = (0..n).map(|i| x_min + i as f64).collect();
    let ys = evaluate(fit.form, &xs, &fit.params);
    debug!(points = n, "built extrapolation line");

    Ok(ExtrapolationLine { xs, ys })
}

/// Predicted value at `target`, which must lie in `[first x of the line, max_x)`.
pub fn prediction_at(
    fit: &FitResult,
    line: &ExtrapolationLine,
    max_x: f64,
    target: f64,
) -> Result<Prediction, AppError> {
    let Some(&first) = line.xs.first() else {
        return Err(AppError::usage("Extrapolation line is empty."));
    };
    if !(target >= first && target < max_x) {
        return Err(AppError::usage(format!(
            "Target {target} lies outside the extrapolation range [{first}, {max_x})."
        )));
    }

    let y = predict(fit.form, target, &fit.params);
    if !y.is_finite() {
        return Err(AppError::fit(format!("Prediction at {target} is not finite.")));
    }
    Ok(Prediction { x: target, y })
}
