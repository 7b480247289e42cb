//! Plotters-powered fit chart written as SVG.
//!
//! The chart shows:
//! - observed points (blue dots)
//! - the fitted curve extrapolated to `max_x` (dashed red, labelled in the legend)
//! - the prediction at the target input size, with a leader arrow from the
//!   annotation text near the left edge
//!
//! SVG is the only output format: the backend writes text as `<text>`
//! elements, so the file can be named without an image extension.

use std::path::Path;

use plotters::coord::Shift;
use plotters::prelude::*;
use tracing::info;

use crate::domain::{ExtrapolationLine, Prediction};
use crate::error::AppError;
use crate::plot::thin_line;

const CHART_SIZE: (u32, u32) = (1024, 768);

/// Enough points for a smooth curve at `CHART_SIZE`.
const MAX_LINE_POINTS: usize = 2048;

/// A render-only chart description; all data is computed by the caller.
pub struct FitChart<'a> {
    pub title: &'a str,
    pub x_desc: &'a str,
    pub y_desc: &'a str,
    pub x: &'a [f64],
    pub y: &'a [f64],
    pub line: &'a ExtrapolationLine,
    /// Legend entry for the fitted curve.
    pub label: &'a str,
    pub prediction: &'a Prediction,
    pub annotation: &'a str,
}

/// Draw `chart` and write it to `path` as SVG.
pub fn write_chart_svg(path: &Path, chart: &FitChart<'_>) -> Result<(), AppError> {
    let root = SVGBackend::new(path, CHART_SIZE).into_drawing_area();
    draw_chart(&root, chart)
        .map_err(|e| AppError::output(format!("Failed to draw chart '{}': {e}", path.display())))?;
    root.present()
        .map_err(|e| AppError::output(format!("Failed to write chart '{}': {e}", path.display())))?;

    info!(path = %path.display(), "wrote chart");
    Ok(())
}

fn draw_chart<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    chart: &FitChart<'_>,
) -> Result<(), DrawingAreaErrorKind<DB::ErrorType>> {
    let curve = thin_line(chart.line, MAX_LINE_POINTS);
    let points: Vec<(f64, f64)> = chart
        .x
        .iter()
        .copied()
        .zip(chart.y.iter().copied())
        .filter(|(x, y)| x.is_finite() && y.is_finite())
        .collect();
    let p = chart.prediction;

    let (x0, x1) = padded_range(points.iter().chain(&curve).map(|&(x, _)| x), 0.0);
    let (y0, y1) = padded_range(
        points
            .iter()
            .chain(&curve)
            .map(|&(_, y)| y)
            .chain(std::iter::once(p.y)),
        0.05,
    );

    root.fill(&WHITE)?;

    let mut ctx = ChartBuilder::on(root)
        .caption(chart.title, ("sans-serif", 24))
        .margin(20)
        .set_label_area_size(LabelAreaPosition::Left, 70)
        .set_label_area_size(LabelAreaPosition::Bottom, 45)
        .build_cartesian_2d(x0..x1, y0..y1)?;

    ctx.configure_mesh()
        .x_desc(chart.x_desc)
        .y_desc(chart.y_desc)
        .x_labels(8)
        .y_labels(8)
        .x_label_formatter(&|v| format!("{v:.0}"))
        .y_label_formatter(&|v| format!("{v:.1}"))
        .draw()?;

    // 1) Fitted curve over the extrapolation range.
    let red = RED.stroke_width(2);
    ctx.draw_series(DashedLineSeries::new(curve.iter().copied(), 10, 6, red))?
        .label(chart.label)
        .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 24, y)], red));

    // 2) Observed points.
    ctx.draw_series(
        points
            .iter()
            .map(|&(x, y)| Circle::new((x, y), 4, BLUE.filled())),
    )?;

    // 3) Prediction marker, leader arrow and annotation text.
    let text_x = x0 + (x1 - x0) * 0.02;
    let arrow_start = x0 + (x1 - x0) * 0.3;
    ctx.draw_series(std::iter::once(Text::new(
        chart.annotation.to_string(),
        (text_x, p.y),
        ("sans-serif", 16).into_font().color(&BLACK),
    )))?;
    ctx.draw_series(std::iter::once(PathElement::new(
        vec![(arrow_start, p.y), (p.x, p.y)],
        BLACK.stroke_width(1),
    )))?;
    ctx.draw_series(std::iter::once(PathElement::new(
        arrow_head(arrow_start, p, x1 - x0, y1 - y0),
        BLACK.stroke_width(1),
    )))?;
    ctx.draw_series(std::iter::once(Circle::new((p.x, p.y), 5, BLACK.filled())))?;

    ctx.configure_series_labels()
        .position(SeriesLabelPosition::LowerRight)
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .label_font(("sans-serif", 14))
        .draw()?;

    Ok(())
}

/// Two barbs ending at the prediction, opening back towards `from_x`.
fn arrow_head(from_x: f64, p: &Prediction, x_span: f64, y_span: f64) -> Vec<(f64, f64)> {
    let dir = if p.x >= from_x { 1.0 } else { -1.0 };
    let dx = x_span * 0.015 * dir;
    let dy = y_span * 0.015;
    vec![(p.x - dx, p.y + dy), (p.x, p.y), (p.x - dx, p.y - dy)]
}

/// Finite min/max of `values`, padded by `frac` of the span (at least 1 when flat).
fn padded_range(values: impl Iterator<Item = f64>, frac: f64) -> (f64, f64) {
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for v in values.filter(|v| v.is_finite()) {
        min = min.min(v);
        max = max.max(v);
    }
    if !(min.is_finite() && max.is_finite()) {
        return (0.0, 1.0);
    }
    if max - min <= f64::EPSILON * max.abs().max(1.0) {
        return (min - 1.0, max + 1.0);
    }
    let pad = (max - min) * frac;
    (min - pad, max + pad)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn padded_range_handles_flat_and_empty_inputs() {
        assert_eq!(padded_range([5.0, 5.0].into_iter(), 0.05), (4.0, 6.0));
        assert_eq!(padded_range(std::iter::empty(), 0.05), (0.0, 1.0));
        assert_eq!(padded_range([0.0, 10.0, f64::NAN].into_iter(), 0.1), (-1.0, 11.0));
    }

    #[test]
    fn writes_svg_with_title_and_annotation() {
        let dir = std::env::temp_dir().join(format!("jobfit-chart-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("memory-power-fit");

        let line = ExtrapolationLine {
            xs: (0..100).map(|i| i as f64).collect(),
            ys: (0..100).map(|i| 2.0 * i as f64).collect(),
        };
        let prediction = Prediction { x: 90.0, y: 180.0 };
        let chart = FitChart {
            title: "memory-power-fit",
            x_desc: "input_size",
            y_desc: "memory",
            x: &[10.0, 20.0, 30.0],
            y: &[20.0, 40.0, 60.0],
            line: &line,
            label: "poly: 2.00e+00 x^1 + 0.00e+00 x^0",
            prediction: &prediction,
            annotation: "0k rows needs ~180.00",
        };
        write_chart_svg(&path, &chart).unwrap();

        let svg = std::fs::read_to_string(&path).unwrap();
        assert!(svg.contains("<svg"));
        assert!(svg.contains("memory-power-fit"));
        assert!(svg.contains("0k rows needs ~180.00"));
        std::fs::remove_dir_all(&dir).ok();
    }
}
