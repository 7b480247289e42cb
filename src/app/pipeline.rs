//! Shared "fit pipeline" logic used by both `jobfit plot` and `jobfit fit`.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! CSV load -> column selection -> curve fit -> extrapolation -> prediction -> chart
//!
//! The front-end then only decides what to print.

use std::path::PathBuf;

use crate::domain::{ExtrapolationLine, FitConfig, FitResult, Prediction};
use crate::error::AppError;
use crate::fit::{extrapolation_line, fit_and_label, prediction_at};
use crate::io::{FitData, load_observations, select_columns};
use crate::plot::{FitChart, write_chart_svg};
use crate::report::{RowResidual, annotation_text, compute_residuals};

/// All computed outputs of a single run.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub data: FitData,
    pub fit: FitResult,
    pub line: ExtrapolationLine,
    pub prediction: Prediction,
    pub residuals: Vec<RowResidual>,
    /// Where the chart was written, if it was.
    pub chart_path: Option<PathBuf>,
}

/// Execute the full pipeline and return the computed outputs.
pub fn run_fit(config: &FitConfig) -> Result<RunOutput, AppError> {
    // 1) Load the observation table.
    let observations = load_observations(&config.csv_path)?;

    // 2) Pick the x/y columns for this fit.
    let data = select_columns(&observations, config.metric, config.drop_last)?;

    // 3) Fit and label.
    let fit = fit_and_label(config.form, &data.x, &data.y, config.num_params)?;

    // 4) Extrapolate and predict at the target.
    let line = extrapolation_line(&fit, data.stats.x_min, config.max_x)?;
    let prediction = prediction_at(&fit, &line, config.max_x, config.target)?;
    let residuals = compute_residuals(&data.x, &data.y, &fit)?;

    // 5) Write the chart.
    let chart_path = if config.write_chart {
        let path = config.chart_path();
        let annotation = annotation_text(&prediction);
        let chart = FitChart {
            title: &config.title,
            x_desc: "input_size",
            y_desc: config.metric.column(),
            x: &data.x,
            y: &data.y,
            line: &line,
            label: &fit.label,
            prediction: &prediction,
            annotation: &annotation,
        };
        write_chart_svg(&path, &chart)?;
        Some(path)
    } else {
        None
    };

    Ok(RunOutput {
        data,
        fit,
        line,
        prediction,
        residuals,
        chart_path,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{FitForm, Metric, default_title};
    use crate::error::{EXIT_OUTPUT, EXIT_USAGE};
    use std::path::Path;

    struct TempDir(PathBuf);

    impl TempDir {
        fn new(name: &str) -> Self {
            let dir = std::env::temp_dir().join(format!("jobfit-{name}-{}", std::process::id()));
            std::fs::create_dir_all(&dir).unwrap();
            Self(dir)
        }

        fn path(&self) -> &Path {
            &self.0
        }
    }

    impl Drop for TempDir {
        fn drop(&mut self) {
            std::fs::remove_dir_all(&self.0).ok();
        }
    }

    const STATS_CSV: &str = "input_size,memory,time\n\
                             1000,10,0:00:01\n\
                             5000,50,0:00:05\n\
                             10000,100,0:00:10\n";

    fn config_in(dir: &Path) -> FitConfig {
        let csv = dir.join("job-resource-stats.csv");
        std::fs::write(&csv, STATS_CSV).unwrap();
        let mut config = FitConfig::with_defaults(csv);
        config.output = Some(dir.join(&config.title));
        config
    }

    #[test]
    fn default_run_writes_memory_power_fit() {
        let tmp = TempDir::new("default");
        let config = config_in(tmp.path());

        let run = run_fit(&config).unwrap();

        let chart = tmp.path().join("memory-power-fit");
        assert_eq!(run.chart_path.as_deref(), Some(chart.as_path()));
        assert!(chart.is_file());
        assert!((run.prediction.y - 2_000.0).abs() < 1e-2, "{:?}", run.prediction);
        assert!(run.fit.label.starts_with("power: "));
        assert_eq!(run.line.xs.first(), Some(&1000.0));
        assert_eq!(run.line.len(), 209_000);
        assert_eq!(run.residuals.len(), 3);
    }

    #[test]
    fn time_quadratic_without_chart() {
        let tmp = TempDir::new("time");
        let mut config = config_in(tmp.path());
        config.metric = Metric::Time;
        config.form = FitForm::Poly;
        config.num_params = 3;
        config.title = default_title(config.metric, config.form, config.num_params);
        config.write_chart = false;

        let run = run_fit(&config).unwrap();
        assert!(run.chart_path.is_none());
        assert!(run.fit.label.starts_with("poly: "));
        // time = input_size / 1000 exactly, so the quadratic term vanishes.
        assert!((run.prediction.y - 200.0).abs() < 1e-2, "{:?}", run.prediction);
    }

    #[test]
    fn target_beyond_max_x_fails() {
        let tmp = TempDir::new("target");
        let mut config = config_in(tmp.path());
        config.target = 250_000.0;

        let err = run_fit(&config).unwrap_err();
        assert_eq!(err.exit_code(), EXIT_USAGE);
    }

    #[test]
    fn unwritable_chart_path_is_output_error() {
        let tmp = TempDir::new("output");
        let mut config = config_in(tmp.path());
        config.output = Some(tmp.path().join("missing-dir").join("memory-power-fit"));

        let err = run_fit(&config).unwrap_err();
        assert_eq!(err.exit_code(), EXIT_OUTPUT);
    }

    #[test]
    fn missing_csv_fails() {
        let config = FitConfig::with_defaults("/nonexistent/job-resource-stats.csv");
        let err = run_fit(&config).unwrap_err();
        assert_eq!(err.exit_code(), EXIT_USAGE);
    }
}
