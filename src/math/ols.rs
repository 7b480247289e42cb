//! Linear least squares solver.
//!
//! Every Levenberg–Marquardt step solves a small linear problem of the form:
//!
//! ```text
//! minimize ‖A δ - b‖²
//! ```
//!
//! where `A` is the Jacobian stacked on top of the damping rows. The matrix is
//! tall (more rows than columns), and near the optimum of a badly scaled
//! power-law fit its columns can be almost collinear.
//!
//! Implementation choices:
//! - We use SVD so tall and rank-deficient systems are handled the same way.
//!   (Nalgebra's `QR::solve` is intended for square systems and will panic for
//!   non-square matrices.)
//! - Parameter counts are tiny (a handful of columns), so SVD cost is irrelevant
//!   next to evaluating the model.

use nalgebra::{DMatrix, DVector};

/// Solve a least squares problem using SVD.
///
/// Returns `None` if the system is too ill-conditioned to solve robustly.
pub fn solve_least_squares(a: &DMatrix<f64>, b: &DVector<f64>) -> Option<DVector<f64>> {
    if a.iter().any(|v| !v.is_finite()) || b.iter().any(|v| !v.is_finite()) {
        return None;
    }

    let svd = a.clone().svd(true, true);

    // Try progressively looser tolerances if strict solve fails.
    for &tol in &[1e-12, 1e-10, 1e-8] {
        if let Ok(x) = svd.solve(b, tol) {
            if x.iter().all(|v| v.is_finite()) {
                return Some(x);
            }
        }
    }

    None
}
