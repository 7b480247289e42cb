//! ASCII plotting for terminal output.
//!
//! This is intentionally "dumb" (fixed-size grid), optimized for:
//! - quick visual sanity checks in a terminal
//! - deterministic output (helpful for golden tests)
//!
//! Plot elements:
//! - observed points: `o`
//! - fitted/extrapolated curve: `-` line
//! - annotated prediction: `*`

use crate::domain::{ExtrapolationLine, Prediction};
use crate::plot::thin_line;

/// Render observations, the extrapolation line and the prediction.
pub fn render_ascii_plot(
    x: &[f64],
    y: &[f64],
    line: &ExtrapolationLine,
    prediction: Option<&Prediction>,
    width: usize,
    height: usize,
) -> String {
    let width = width.max(10);
    let height = height.max(5);

    let curve = thin_line(line, width * 2);
    let points: Vec<(f64, f64)> = x.iter().copied().zip(y.iter().copied()).collect();

    let (x_min, x_max) = x_range(&points, &curve).unwrap_or((0.0, 1.0));
    let (y_min, y_max) = y_range(&points, &curve).unwrap_or((0.0, 1.0));
    let (y_min, y_max) = pad_range(y_min, y_max, 0.05);

    let mut grid = vec![vec![' '; width]; height];

    // Draw curve first (so points can overlay).
    draw_curve(&mut grid, &curve, x_min, x_max, y_min, y_max);

    for &(px, py) in &points {
        if !(px.is_finite() && py.is_finite()) {
            continue;
        }
        let gx = map_x(px, x_min, x_max, width);
        let gy = map_y(py, y_min, y_max, height);
        grid[gy][gx] = 'o';
    }

    if let Some(p) = prediction {
        let gx = map_x(p.x, x_min, x_max, width);
        let gy = map_y(p.y, y_min, y_max, height);
        grid[gy][gx] = '*';
    }

    // Build final string. We include a small header with ranges.
    let mut out = String::new();
    out.push_str(&format!(
        "Plot: x=[{x_min:.0}, {x_max:.0}] | y=[{y_min:.2}, {y_max:.2}]\n"
    ));

    for row in grid {
        out.push_str(row.into_iter().collect::<String>().trim_end());
        out.push('\n');
    }

    out
}

fn x_range(points: &[(f64, f64)], curve: &[(f64, f64)]) -> Option<(f64, f64)> {
    finite_range(points.iter().chain(curve).map(|&(x, _)| x))
}

fn y_range(points: &[(f64, f64)], curve: &[(f64, f64)]) -> Option<(f64, f64)> {
    finite_range(points.iter().chain(curve).map(|&(_, y)| y))
}

fn finite_range(values: impl Iterator<Item = f64>) -> Option<(f64, f64)> {
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for v in values.filter(|v| v.is_finite()) {
        min = min.min(v);
        max = max.max(v);
    }
    if min.is_finite() && max.is_finite() && max > min {
        Some((min, max))
    } else {
        None
    }
}

fn pad_range(min: f64, max: f64, frac: f64) -> (f64, f64) {
    let span = (max - min).abs();
    let pad = (span * frac).max(1e-12);
    (min - pad, max + pad)
}

fn map_x(x: f64, x_min: f64, x_max: f64, width: usize) -> usize {
    let width = width.max(2);
    let u = ((x - x_min) / (x_max - x_min)).clamp(0.0, 1.0);
    (u * (width as f64 - 1.0)).round() as usize
}

fn map_y(y: f64, y_min: f64, y_max: f64, height: usize) -> usize {
    let height = height.max(2);
    let u = ((y - y_min) / (y_max - y_min)).clamp(0.0, 1.0);
    // y=top is max -> row 0
    (height as f64 - 1.0 - (u * (height as f64 - 1.0))).round() as usize
}

fn draw_curve(grid: &mut [Vec<char>], curve: &[(f64, f64)], x_min: f64, x_max: f64, y_min: f64, y_max: f64) {
    if curve.len() < 2 {
        return;
    }
    let height = grid.len();
    let width = grid[0].len();

    let mut prev = None;
    for &(x, y) in curve {
        if !(x.is_finite() && y.is_finite()) {
            prev = None;
            continue;
        }
        let gx = map_x(x, x_min, x_max, width);
        let gy = map_y(y, y_min, y_max, height);
        if let Some((x0, y0)) = prev {
            draw_line(grid, x0, y0, gx, gy, '-');
        } else {
            grid[gy][gx] = '-';
        }
        prev = Some((gx, gy));
    }
}

/// Integer line drawing (Bresenham-ish).
fn draw_line(grid: &mut [Vec<char>], x0: usize, y0: usize, x1: usize, y1: usize, ch: char) {
    let mut x0 = x0 as isize;
    let mut y0 = y0 as isize;
    let x1 = x1 as isize;
    let y1 = y1 as isize;

    let dx = (x1 - x0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let dy = -(y1 - y0).abs();
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        if y0 >= 0
            && (y0 as usize) < grid.len()
            && x0 >= 0
            && (x0 as usize) < grid[0].len()
            && grid[y0 as usize][x0 as usize] == ' '
        {
            grid[y0 as usize][x0 as usize] = ch;
        }

        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plot_golden_snapshot_small() {
        // Flat fitted line at y=100 from x=0 to x=9, one point above it.
        let line = ExtrapolationLine {
            xs: (0..10).map(|i| i as f64).collect(),
            ys: vec![100.0; 10],
        };
        let x = [0.0, 9.0];
        let y = [100.0, 110.0];

        let txt = render_ascii_plot(&x, &y, &line, None, 10, 5);
        let expected = concat!(
            "Plot: x=[0, 9] | y=[99.50, 110.50]\n",
            "         o\n",
            "\n",
            "\n",
            "\n",
            "o---------\n",
        );
        assert_eq!(txt, expected);
    }

    #[test]
    fn prediction_is_marked() {
        let line = ExtrapolationLine {
            xs: (0..20).map(|i| i as f64).collect(),
            ys: (0..20).map(|i| i as f64).collect(),
        };
        let prediction = Prediction { x: 19.0, y: 19.0 };
        let txt = render_ascii_plot(&[0.0], &[0.0], &line, Some(&prediction), 10, 5);
        let first_row = txt.lines().nth(1).unwrap();
        assert!(first_row.ends_with('*'), "{txt}");
    }
}
