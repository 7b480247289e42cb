//! Chart rendering.
//!
//! - `ascii`: terminal rendering shown after a run
//! - `chart`: SVG chart written to disk (Plotters)

pub mod ascii;
pub mod chart;

pub use ascii::*;
pub use chart::*;

use crate::domain::ExtrapolationLine;

/// Downsample the extrapolation line to at most `max_points` (first and last kept).
///
/// The line has one point per unit of input size, which is far more than any
/// rendering can show.
pub fn thin_line(line: &ExtrapolationLine, max_points: usize) -> Vec<(f64, f64)> {
    let n = line.len();
    let max_points = max_points.max(2);
    if n <= max_points {
        return line.xs.iter().copied().zip(line.ys.iter().copied()).collect();
    }

    let step = n.div_ceil(max_points - 1);
    let mut out: Vec<(f64, f64)> = (0..n)
        .step_by(step)
        .map(|i| (line.xs[i], line.ys[i]))
        .collect();
    if out.last().map(|&(x, _)| x) != line.xs.last().copied() {
        out.push((line.xs[n - 1], line.ys[n - 1]));
    }
    out
}
