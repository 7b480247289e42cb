//! Curve fitting for a single fit form.
//!
//! Given:
//! - input sizes `x_i`
//! - observed values `y_i`
//! - a fit form and its parameter count
//!
//! we minimize `Σ (f(x_i; p) - y_i)²` with Levenberg–Marquardt, starting from
//! an all-ones parameter vector, and return the fitted parameters together
//! with SSE/RMSE diagnostics.

use nalgebra::{DMatrix, DVector};
use tracing::{debug, info};

use crate::domain::{FitForm, FitResult};
use crate::error::AppError;
use crate::math::{LeastSquaresProblem, LmOptions, levenberg_marquardt};
use crate::models::{fill_jacobian_row, predict};

/// Raw optimizer output for one fit.
#[derive(Debug, Clone)]
pub struct CurveFit {
    pub form: FitForm,
    pub params: Vec<f64>,
    pub sse: f64,
    pub rmse: f64,
    pub iterations: usize,
    pub evaluations: usize,
}

/// Residuals `f(x_i; p) - y_i` for one fit form over borrowed data.
struct CurveProblem<'a> {
    form: FitForm,
    x: &'a [f64],
    y: &'a [f64],
}

impl LeastSquaresProblem for CurveProblem<'_> {
    fn residuals(&self, params: &DVector<f64>) -> Option<DVector<f64>> {
        let p = params.as_slice();
        let r = DVector::from_iterator(
            self.x.len(),
            self.x
                .iter()
                .zip(self.y)
                .map(|(&x, &y)| predict(self.form, x, p) - y),
        );
        r.iter().all(|v| v.is_finite()).then_some(r)
    }

    fn jacobian(&self, params: &DVector<f64>) -> Option<DMatrix<f64>> {
        let p = params.as_slice();
        let k = p.len();
        let mut jac = DMatrix::<f64>::zeros(self.x.len(), k);
        let mut row = vec![0.0; k];
        for (i, &x) in self.x.iter().enumerate() {
            fill_jacobian_row(self.form, x, p, &mut row);
            for (j, &v) in row.iter().enumerate() {
                jac[(i, j)] = v;
            }
        }
        jac.iter().all(|v| v.is_finite()).then_some(jac)
    }
}

/// Fit `form` to `(x, y)` with `num_params` parameters.
pub fn curve_fit(form: FitForm, x: &[f64], y: &[f64], num_params: usize) -> Result<CurveFit, AppError> {
    if !form.accepts_num_params(num_params) {
        return Err(AppError::usage(format!(
            "Fit form '{}' cannot take {num_params} parameter(s).",
            form.name()
        )));
    }
    if x.len() != y.len() {
        return Err(AppError::usage(format!(
            "x and y have different lengths ({} vs {}).",
            x.len(),
            y.len()
        )));
    }
    if x.is_empty() {
        return Err(AppError::no_data("No data points to fit."));
    }
    if x.len() < num_params {
        return Err(AppError::fit(format!(
            "Improper input: {num_params} parameters need at least as many points, got {}.",
            x.len()
        )));
    }

    let problem = CurveProblem { form, x, y };
    let opts = LmOptions::for_params(num_params);
    let report = levenberg_marquardt(&problem, DVector::from_element(num_params, 1.0), &opts)
        .map_err(|e| AppError::fit(format!("Curve fit ({}) failed: {e}.", form.name())))?;

    debug!(termination = ?report.termination, "optimizer stopped");

    let n = x.len();
    let sse = report.cost;
    let rmse = (sse / n as f64).sqrt();
    info!(
        form = form.name(),
        iterations = report.iterations,
        evaluations = report.evaluations,
        sse,
        "curve fit converged"
    );

    Ok(CurveFit {
        form,
        params: report.params.iter().copied().collect(),
        sse,
        rmse,
        iterations: report.iterations,
        evaluations: report.evaluations,
    })
}

/// Fit and attach the human-readable label.
pub fn fit_and_label(form: FitForm, x: &[f64], y: &[f64], num_params: usize) -> Result<FitResult, AppError> {
    let fit = curve_fit(form, x, y, num_params)?;
    let label = crate::report::format_label(form, &fit.params);
    Ok(FitResult {
        form,
        params: fit.params,
        label,
        sse: fit.sse,
        rmse: fit.rmse,
        iterations: fit.iterations,
        evaluations: fit.evaluations,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{EXIT_FIT, EXIT_USAGE};
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use rand_distr::{Distribution, Normal};

    #[test]
    fn linear_fit_recovers_coefficients_under_small_noise() {
        let mut rng = StdRng::seed_from_u64(7);
        let noise = Normal::new(0.0, 1e-3).unwrap();
        let x: Vec<f64> = (0..25).map(|i| i as f64).collect();
        let y: Vec<f64> = x.iter().map(|&x| 3.0 * x + 7.0 + noise.sample(&mut rng)).collect();

        let fit = curve_fit(FitForm::Poly, &x, &y, 2).unwrap();
        assert_eq!(fit.params.len(), 2);
        assert!((fit.params[0] - 3.0).abs() < 1e-2, "slope {}", fit.params[0]);
        assert!((fit.params[1] - 7.0).abs() < 1e-2, "intercept {}", fit.params[1]);
    }

    #[test]
    fn quadratic_fit_on_large_inputs() {
        let x: Vec<f64> = [1_000.0, 5_000.0, 10_000.0, 20_000.0, 40_000.0].to_vec();
        let y: Vec<f64> = x.iter().map(|&x| 2e-6 * x * x + 0.01 * x + 5.0).collect();

        let fit = curve_fit(FitForm::Poly, &x, &y, 3).unwrap();
        let predicted = predict(FitForm::Poly, 50_000.0, &fit.params);
        let want = 2e-6 * 50_000.0 * 50_000.0 + 0.01 * 50_000.0 + 5.0;
        assert!((predicted - want).abs() < 1e-6 * want, "{predicted} vs {want}");
    }

    #[test]
    fn power_fit_recovers_linear_memory_growth() {
        let x = [1_000.0, 5_000.0, 10_000.0];
        let y = [10.0, 50.0, 100.0];

        let fit = curve_fit(FitForm::Power, &x, &y, 3).unwrap();
        let predicted = predict(FitForm::Power, 200_000.0, &fit.params);
        assert!((predicted - 2_000.0).abs() < 1e-2, "predicted {predicted}");
        assert!(fit.sse < 1e-12);
    }

    #[test]
    fn power_fit_recovers_superlinear_growth() {
        let x: Vec<f64> = (1..=8).map(|i| i as f64 * 1_000.0).collect();
        let y: Vec<f64> = x.iter().map(|&x| 0.002 * x.powf(1.3) + 4.0).collect();

        let fit = curve_fit(FitForm::Power, &x, &y, 3).unwrap();
        assert!((fit.params[1] - 1.3).abs() < 1e-2, "exponent {}", fit.params[1]);
        assert!(fit.rmse < 0.5, "rmse {}", fit.rmse);
    }

    #[test]
    fn power_with_wrong_param_count_is_usage_error() {
        let err = curve_fit(FitForm::Power, &[1.0, 2.0], &[1.0, 2.0], 2).unwrap_err();
        assert_eq!(err.exit_code(), EXIT_USAGE);
    }

    #[test]
    fn too_few_points_is_fit_error() {
        let err = curve_fit(FitForm::Poly, &[1.0, 2.0], &[1.0, 2.0], 3).unwrap_err();
        assert_eq!(err.exit_code(), EXIT_FIT);
    }

    #[test]
    fn non_finite_observations_fail_the_fit() {
        let err = curve_fit(FitForm::Poly, &[1.0, 2.0, 3.0], &[1.0, f64::NAN, 3.0], 2).unwrap_err();
        assert_eq!(err.exit_code(), EXIT_FIT);
    }

    #[test]
    fn power_fit_on_negative_inputs_fails() {
        // ln(x) is undefined for x < 0, so the exponent derivative is NaN.
        let x = [-1.0, -2.0, -3.0, -4.0];
        let y = [1.0, 4.0, 9.0, 16.0];
        let err = curve_fit(FitForm::Power, &x, &y, 3).unwrap_err();
        assert_eq!(err.exit_code(), EXIT_FIT);
    }

    #[test]
    fn label_is_attached() {
        let x = [0.0, 1.0, 2.0, 3.0];
        let y = [7.0, 10.0, 13.0, 16.0];
        let fit = fit_and_label(FitForm::Poly, &x, &y, 2).unwrap();
        assert_eq!(fit.label, "poly: 3.00e+00 x^1 + 7.00e+00 x^0");
    }
}
