//! Fit function evaluation for the polynomial and power-law forms.
//!
//! The fitter relies on two primitive operations:
//! - predict `y(x)` given the parameter vector (residuals, plots, predictions)
//! - fill a Jacobian row `∂y/∂p` at `x` (Levenberg–Marquardt steps)
//!
//! Both are implemented here for each form, plus vectorized helpers.

use rayon::prelude::*;

use crate::domain::FitForm;

/// Below this many points, evaluating in parallel costs more than it saves.
const PAR_THRESHOLD: usize = 4096;

/// Short name of a fit form (`"poly"` or `"power"`).
pub fn get_func_form(form: FitForm) -> &'static str {
    form.name()
}

/// Evaluate a polynomial with coefficients highest degree first (Horner).
pub fn eval_poly(x: f64, coeffs: &[f64]) -> f64 {
    coeffs.iter().fold(0.0, |acc, &c| acc * x + c)
}

/// Evaluate `a * x^b + c`.
pub fn eval_power(x: f64, a: f64, b: f64, c: f64) -> f64 {
    a * x.powf(b) + c
}

/// Polynomial over a sequence of x values.
pub fn fit_func_poly(xs: &[f64], coeffs: &[f64]) -> Vec<f64> {
    xs.iter().map(|&x| eval_poly(x, coeffs)).collect()
}

/// Power law over a sequence of x values.
pub fn fit_func_power(xs: &[f64], a: f64, b: f64, c: f64) -> Vec<f64> {
    xs.iter().map(|&x| eval_power(x, a, b, c)).collect()
}

/// Predict `y(x)` for the given form.
///
/// # Panics
/// Panics if `form` is `Power` and `params` has fewer than 3 entries. The
/// fitter validates parameter counts before calling this.
pub fn predict(form: FitForm, x: f64, params: &[f64]) -> f64 {
    match form {
        FitForm::Poly => eval_poly(x, params),
        FitForm::Power => eval_power(x, params[0], params[1], params[2]),
    }
}

/// Vectorized `predict`; switches to a parallel map on long inputs.
pub fn evaluate(form: FitForm, xs: &[f64], params: &[f64]) -> Vec<f64> {
    if xs.len() >= PAR_THRESHOLD {
        xs.par_iter().map(|&x| predict(form, x, params)).collect()
    } else {
        xs.iter().map(|&x| predict(form, x, params)).collect()
    }
}

/// Fill `out` with the partial derivatives of `y(x)` w.r.t. each parameter.
///
/// # Panics
/// Panics if `out.len() != params.len()`.
pub fn fill_jacobian_row(form: FitForm, x: f64, params: &[f64], out: &mut [f64]) {
    match form {
        FitForm::Poly => {
            // ∂y/∂c_i = x^(n-1-i), built from the constant term upwards.
            let mut pow = 1.0;
            for slot in out.iter_mut().rev() {
                *slot = pow;
                pow *= x;
            }
        }
        FitForm::Power => {
            let (a, b) = (params[0], params[1]);
            let xb = x.powf(b);
            out[0] = xb;
            // lim_{x→0+} x^b ln x = 0 for b > 0; avoid 0 * -inf.
            out[1] = if x == 0.0 { 0.0 } else { a * xb * x.ln() };
            out[2] = 1.0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn poly_degree_one_evaluates_linear() {
        assert_eq!(fit_func_poly(&[5.0], &[2.0, 3.0]), vec![13.0]);
        assert_eq!(eval_poly(2.0, &[1.0, 0.0, -4.0]), 0.0);
    }

    #[test]
    fn power_evaluates_elementwise() {
        let ys = fit_func_power(&[1.0, 2.0, 4.0], 2.0, 2.0, 1.0);
        assert_eq!(ys, vec![3.0, 9.0, 33.0]);
    }

    #[test]
    fn form_names() {
        assert_eq!(get_func_form(FitForm::Power), "power");
        assert_eq!(get_func_form(FitForm::Poly), "poly");
    }

    #[test]
    fn negative_base_with_fractional_exponent_is_nan() {
        assert!(eval_power(-2.0, 1.0, 0.5, 0.0).is_nan());
    }

    #[test]
    fn parallel_and_serial_evaluation_agree() {
        let xs: Vec<f64> = (0..(PAR_THRESHOLD + 10)).map(|i| i as f64).collect();
        let params = [0.5, 1.5, 2.0];
        let ys = evaluate(FitForm::Power, &xs, &params);
        assert_eq!(ys.len(), xs.len());
        for (x, y) in xs.iter().zip(&ys) {
            assert_eq!(*y, eval_power(*x, 0.5, 1.5, 2.0));
        }
    }

    #[test]
    fn jacobian_matches_finite_differences() {
        let x = 3.0;
        for (form, params) in [
            (FitForm::Poly, vec![0.5, -2.0, 4.0]),
            (FitForm::Power, vec![1.2, 1.7, 0.3]),
        ] {
            let mut row = vec![0.0; params.len()];
            fill_jacobian_row(form, x, &params, &mut row);
            for j in 0..params.len() {
                let h = 1e-6;
                let mut hi = params.clone();
                let mut lo = params.clone();
                hi[j] += h;
                lo[j] -= h;
                let fd = (predict(form, x, &hi) - predict(form, x, &lo)) / (2.0 * h);
                assert!((row[j] - fd).abs() < 1e-5, "{form:?} param {j}: {} vs {fd}", row[j]);
            }
        }
    }
}
