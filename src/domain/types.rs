//! Shared domain types.
//!
//! These types are intentionally plain data so they can be built by the CLI,
//! consumed by the fitter and handed to the reporting/plotting code without
//! any of those layers knowing about each other.

use std::path::PathBuf;

use clap::ValueEnum;
use serde::Deserialize;

/// Dependent column to fit against `input_size`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Metric {
    /// Peak memory as recorded in the `memory` column.
    Memory,
    /// Wall time, converted from `H:M:S` to seconds.
    Time,
}

impl Metric {
    /// Column name in the stats CSV (also used in default chart titles).
    pub fn column(self) -> &'static str {
        match self {
            Metric::Memory => "memory",
            Metric::Time => "time",
        }
    }
}

/// Functional family used for the regression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FitForm {
    /// `y = c0 x^n + c1 x^(n-1) + ... + cn`, coefficients highest degree first.
    Poly,
    /// `y = a x^b + c`.
    Power,
}

impl FitForm {
    /// Short name of the form, used as the label prefix.
    pub fn name(self) -> &'static str {
        match self {
            FitForm::Poly => "poly",
            FitForm::Power => "power",
        }
    }

    /// Parameter count when the caller does not pick one.
    ///
    /// Polynomials default to a quadratic.
    pub fn default_num_params(self) -> usize {
        3
    }

    /// Check that `num_params` is usable with this form.
    pub fn accepts_num_params(self, num_params: usize) -> bool {
        match self {
            FitForm::Poly => num_params >= 1,
            FitForm::Power => num_params == 3,
        }
    }

    /// Title fragment for charts, e.g. `power` or `deg2`.
    pub fn title_fragment(self, num_params: usize) -> String {
        match self {
            FitForm::Poly => format!("deg{}", num_params.saturating_sub(1)),
            FitForm::Power => "power".to_string(),
        }
    }
}

/// One row of the job resource stats CSV as it appears on disk.
#[derive(Debug, Clone, Deserialize)]
pub struct ObservationRow {
    pub input_size: f64,
    pub memory: f64,
    /// `H:M:S` wall time.
    pub time: String,
}

/// A normalized observation (time converted to seconds).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Observation {
    pub input_size: f64,
    pub memory: f64,
    pub time_s: i64,
}

impl Observation {
    /// Value of the dependent column selected by `metric`.
    pub fn value(&self, metric: Metric) -> f64 {
        match metric {
            Metric::Memory => self.memory,
            Metric::Time => self.time_s as f64,
        }
    }
}

/// Fitted parameters plus diagnostics.
#[derive(Debug, Clone)]
pub struct FitResult {
    pub form: FitForm,
    pub params: Vec<f64>,
    /// Human-readable description of the fitted function.
    pub label: String,
    pub sse: f64,
    pub rmse: f64,
    pub iterations: usize,
    pub evaluations: usize,
}

/// Prediction annotated on the chart.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prediction {
    pub x: f64,
    pub y: f64,
}

/// The fitted curve evaluated over `[x_min, max_x)` with unit step.
#[derive(Debug, Clone)]
pub struct ExtrapolationLine {
    pub xs: Vec<f64>,
    pub ys: Vec<f64>,
}

impl ExtrapolationLine {
    pub fn len(&self) -> usize {
        self.xs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.xs.is_empty()
    }
}

/// A full run's configuration as understood by the pipeline.
///
/// This is derived from CLI flags (plus defaults).
#[derive(Debug, Clone)]
pub struct FitConfig {
    pub csv_path: PathBuf,
    pub metric: Metric,
    pub form: FitForm,
    pub num_params: usize,
    /// Exclusive upper bound of the extrapolation line.
    pub max_x: f64,
    /// Input size at which the prediction is annotated.
    pub target: f64,
    pub title: String,
    /// Trailing rows to leave out of the fit.
    pub drop_last: usize,
    /// Chart path. `None` writes to a file named after the title.
    pub output: Option<PathBuf>,
    /// Whether to write the chart at all (`jobfit fit` does not).
    pub write_chart: bool,
    /// Whether to print the terminal plot.
    pub show: bool,
    pub plot_width: usize,
    pub plot_height: usize,
}

impl FitConfig {
    /// Default run: memory vs. input size, power law, annotated at 200k rows.
    pub fn with_defaults(csv_path: impl Into<PathBuf>) -> Self {
        let metric = Metric::Memory;
        let form = FitForm::Power;
        let num_params = form.default_num_params();
        Self {
            csv_path: csv_path.into(),
            metric,
            form,
            num_params,
            max_x: 210_000.0,
            target: 200_000.0,
            title: default_title(metric, form, num_params),
            drop_last: 0,
            output: None,
            write_chart: true,
            show: true,
            plot_width: 100,
            plot_height: 25,
        }
    }

    /// Path the chart is written to.
    pub fn chart_path(&self) -> PathBuf {
        self.output
            .clone()
            .unwrap_or_else(|| PathBuf::from(&self.title))
    }
}

/// Default chart title, e.g. `memory-power-fit` or `time-deg2-fit`.
pub fn default_title(metric: Metric, form: FitForm, num_params: usize) -> String {
    format!("{}-{}-fit", metric.column(), form.title_fragment(num_params))
}
