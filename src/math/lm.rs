//! Levenberg–Marquardt nonlinear least squares.
//!
//! Minimizes `‖r(p)‖²` for a residual function `r` with a known Jacobian.
//! Each iteration solves the damped Gauss–Newton system as an augmented
//! linear least squares problem
//!
//! ```text
//! [ J       ] δ = [ -r ]
//! [ √λ · D  ]     [  0 ]
//! ```
//!
//! where `D` holds the Jacobian column norms (Marquardt scaling), so that
//! parameters of very different magnitude (a power-law prefactor next to its
//! exponent) are damped evenly.
//!
//! Termination follows the MINPACK conventions: relative reduction of the
//! cost below `ftol`, scaled step size `‖D δ‖ / ‖D p‖` below `xtol`, gradient
//! below `gtol`. It fails once `max_evaluations` residual evaluations have been
//! spent.

use nalgebra::{DMatrix, DVector};
use tracing::debug;

use crate::math::solve_least_squares;

const MIN_LAMBDA: f64 = 1e-12;
const MAX_LAMBDA: f64 = 1e32;

/// A residual function with its Jacobian.
pub trait LeastSquaresProblem {
    /// Residual vector at `params`, or `None` if it is not finite.
    fn residuals(&self, params: &DVector<f64>) -> Option<DVector<f64>>;

    /// Jacobian `∂r_i/∂p_j` at `params`, or `None` if it is not finite.
    fn jacobian(&self, params: &DVector<f64>) -> Option<DMatrix<f64>>;
}

/// Solver tolerances and budget.
#[derive(Debug, Clone)]
pub struct LmOptions {
    pub ftol: f64,
    pub xtol: f64,
    pub gtol: f64,
    pub max_evaluations: usize,
    pub initial_lambda: f64,
}

impl LmOptions {
    /// MINPACK-style defaults for a problem with `num_params` parameters.
    pub fn for_params(num_params: usize) -> Self {
        Self {
            ftol: 1.49012e-8,
            xtol: 1.49012e-8,
            gtol: 0.0,
            max_evaluations: 200 * (num_params + 1),
            initial_lambda: 1e-3,
        }
    }
}

/// Why the solver stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// Residuals are exactly zero.
    ZeroResidual,
    /// Relative cost reduction fell below `ftol`.
    CostReduction,
    /// Scaled step size fell below `xtol`.
    StepSize,
    /// Gradient max-norm fell below `gtol`.
    Gradient,
}

/// Converged solution.
#[derive(Debug, Clone)]
pub struct LmReport {
    pub params: DVector<f64>,
    /// Sum of squared residuals at `params`.
    pub cost: f64,
    pub iterations: usize,
    pub evaluations: usize,
    pub termination: Termination,
}

/// Solver failure.
#[derive(Debug, Clone, PartialEq)]
pub enum LmFailure {
    /// The residuals at the initial guess are not finite.
    NonFiniteStart,
    /// The Jacobian became non-finite at an accepted point.
    NonFiniteJacobian,
    /// No convergence within the evaluation budget.
    MaxEvaluations(usize),
    /// Damping grew without bound and no step reduced the cost.
    Stalled,
}

impl std::fmt::Display for LmFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LmFailure::NonFiniteStart => {
                write!(f, "residuals are not finite at the initial guess")
            }
            LmFailure::NonFiniteJacobian => write!(f, "Jacobian is not finite"),
            LmFailure::MaxEvaluations(n) => write!(
                f,
                "optimal parameters not found: number of calls to function has reached maxfev = {n}"
            ),
            LmFailure::Stalled => write!(f, "damping diverged without reducing the cost"),
        }
    }
}

/// Minimize `‖r(p)‖²` starting from `initial`.
pub fn levenberg_marquardt<P: LeastSquaresProblem>(
    problem: &P,
    initial: DVector<f64>,
    opts: &LmOptions,
) -> Result<LmReport, LmFailure> {
    let mut params = initial;
    let mut residuals = problem
        .residuals(&params)
        .ok_or(LmFailure::NonFiniteStart)?;
    let mut cost = residuals.norm_squared();
    let mut evaluations = 1usize;
    let mut iterations = 0usize;
    let mut lambda = opts.initial_lambda;

    let report = |params, cost, iterations, evaluations, termination| LmReport {
        params,
        cost,
        iterations,
        evaluations,
        termination,
    };

    loop {
        if cost == 0.0 {
            return Ok(report(params, cost, iterations, evaluations, Termination::ZeroResidual));
        }

        let jac = problem
            .jacobian(&params)
            .ok_or(LmFailure::NonFiniteJacobian)?;
        iterations += 1;

        let grad = jac.transpose() * &residuals;
        if grad.amax() <= opts.gtol {
            return Ok(report(params, cost, iterations, evaluations, Termination::Gradient));
        }

        let scale = column_scale(&jac);

        // Inner loop: raise damping until a step lowers the cost.
        loop {
            if evaluations >= opts.max_evaluations {
                return Err(LmFailure::MaxEvaluations(opts.max_evaluations));
            }
            if lambda > MAX_LAMBDA {
                return Err(LmFailure::Stalled);
            }

            let Some(delta) = damped_step(&jac, &residuals, &scale, lambda) else {
                lambda *= 10.0;
                continue;
            };

            let small_step = delta.component_mul(&scale).norm()
                <= opts.xtol * (params.component_mul(&scale).norm() + opts.xtol);
            let candidate = &params + &delta;
            evaluations += 1;

            let trial = problem
                .residuals(&candidate)
                .map(|r| {
                    let c = r.norm_squared();
                    (r, c)
                })
                .filter(|(_, c)| c.is_finite());

            if let Some((r_new, cost_new)) = trial {
                if cost_new < cost {
                    let reduction = cost - cost_new;
                    params = candidate;
                    residuals = r_new;
                    let prev = cost;
                    cost = cost_new;
                    lambda = (lambda / 10.0).max(MIN_LAMBDA);

                    debug!(iterations, evaluations, cost, lambda, "accepted step");

                    if reduction <= opts.ftol * prev {
                        return Ok(report(
                            params,
                            cost,
                            iterations,
                            evaluations,
                            Termination::CostReduction,
                        ));
                    }
                    if small_step {
                        return Ok(report(params, cost, iterations, evaluations, Termination::StepSize));
                    }
                    break;
                }
            }

            if small_step {
                // The damped step is already negligible; the current point is as good as it gets.
                return Ok(report(params, cost, iterations, evaluations, Termination::StepSize));
            }
            lambda *= 10.0;
        }
    }
}

/// Marquardt scaling: Jacobian column norms, with zero columns mapped to 1.
fn column_scale(jac: &DMatrix<f64>) -> DVector<f64> {
    DVector::from_iterator(
        jac.ncols(),
        jac.column_iter().map(|c| {
            let n = c.norm();
            if n > 0.0 { n } else { 1.0 }
        }),
    )
}

fn damped_step(
    jac: &DMatrix<f64>,
    residuals: &DVector<f64>,
    scale: &DVector<f64>,
    lambda: f64,
) -> Option<DVector<f64>> {
    let m = jac.nrows();
    let n = jac.ncols();
    let sqrt_lambda = lambda.sqrt();

    let mut a = DMatrix::<f64>::zeros(m + n, n);
    a.view_mut((0, 0), (m, n)).copy_from(jac);
    for j in 0..n {
        a[(m + j, j)] = sqrt_lambda * scale[j];
    }

    let mut b = DVector::<f64>::zeros(m + n);
    for i in 0..m {
        b[i] = -residuals[i];
    }

    solve_least_squares(&a, &b)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// r_i = exp(k t_i) - y_i
    struct ExpDecay {
        t: Vec<f64>,
        y: Vec<f64>,
    }

    impl LeastSquaresProblem for ExpDecay {
        fn residuals(&self, p: &DVector<f64>) -> Option<DVector<f64>> {
            let r = DVector::from_iterator(
                self.t.len(),
                self.t.iter().zip(&self.y).map(|(t, y)| (p[0] * t).exp() - y),
            );
            r.iter().all(|v| v.is_finite()).then_some(r)
        }

        fn jacobian(&self, p: &DVector<f64>) -> Option<DMatrix<f64>> {
            Some(DMatrix::from_iterator(
                self.t.len(),
                1,
                self.t.iter().map(|t| t * (p[0] * t).exp()),
            ))
        }
    }

    #[test]
    fn recovers_exponential_rate() {
        let t: Vec<f64> = (0..10).map(|i| i as f64 * 0.3).collect();
        let y = t.iter().map(|t| (-0.7 * t).exp()).collect();
        let problem = ExpDecay { t, y };

        let report = levenberg_marquardt(
            &problem,
            DVector::from_element(1, 1.0),
            &LmOptions::for_params(1),
        )
        .unwrap();
        assert!((report.params[0] + 0.7).abs() < 1e-6, "k = {}", report.params[0]);
        assert!(report.cost < 1e-10);
    }

    #[test]
    fn non_finite_start_is_an_error() {
        let problem = ExpDecay {
            t: vec![1000.0],
            y: vec![1.0],
        };
        let err = levenberg_marquardt(
            &problem,
            DVector::from_element(1, 1.0),
            &LmOptions::for_params(1),
        )
        .unwrap_err();
        assert_eq!(err, LmFailure::NonFiniteStart);
    }

    #[test]
    fn evaluation_budget_is_enforced() {
        let t: Vec<f64> = (0..10).map(|i| i as f64 * 0.3).collect();
        let y = t.iter().map(|t| (-0.7 * t).exp()).collect();
        let problem = ExpDecay { t, y };
        let opts = LmOptions {
            max_evaluations: 2,
            ..LmOptions::for_params(1)
        };

        let err = levenberg_marquardt(&problem, DVector::from_element(1, 1.0), &opts).unwrap_err();
        assert_eq!(err, LmFailure::MaxEvaluations(2));
    }
}
