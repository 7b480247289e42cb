//! Command-line parsing for the job resource curve fitter.
//!
//! The goal of this module is to keep **argument parsing** and **command dispatch**
//! separate from the fitting/plotting code.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::domain::{FitForm, Metric};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(
    name = "jobfit",
    version,
    about = "Fit job resource usage against input size and extrapolate"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fit a curve, print the summary and write the annotated chart (default).
    Plot(FitArgs),
    /// Fit a curve and print the summary only.
    Fit(FitArgs),
}

/// Options shared by `plot` and `fit`.
#[derive(Debug, Parser, Clone)]
pub struct FitArgs {
    /// Job resource stats CSV (`input_size`, `memory`, `time` columns).
    #[arg(long, default_value = "job-resource-stats.csv")]
    pub csv: PathBuf,

    /// Column to fit against `input_size`.
    #[arg(short = 'm', long, value_enum, default_value_t = Metric::Memory)]
    pub metric: Metric,

    /// Functional form of the fit.
    #[arg(short = 'f', long, value_enum, default_value_t = FitForm::Power)]
    pub form: FitForm,

    /// Number of fit parameters (power: must be 3; poly: degree + 1). Defaults to 3.
    #[arg(short = 'n', long)]
    pub num_params: Option<usize>,

    /// Exclusive upper bound of the extrapolation line.
    #[arg(long, default_value_t = 210_000.0)]
    pub max_x: f64,

    /// Input size at which the prediction is annotated.
    #[arg(long, default_value_t = 200_000.0)]
    pub target: f64,

    /// Chart title, also used as the output file name. Defaults to `{metric}-{form}-fit`.
    #[arg(long)]
    pub title: Option<String>,

    /// Leave the last N rows out of the fit.
    #[arg(long, default_value_t = 0)]
    pub drop_last: usize,

    /// Write the chart here instead of a file named after the title.
    #[arg(short = 'o', long)]
    pub output: Option<PathBuf>,

    /// Do not print the terminal plot.
    #[arg(long)]
    pub no_show: bool,

    /// Terminal plot width (columns).
    #[arg(long, default_value_t = 100)]
    pub width: usize,

    /// Terminal plot height (rows).
    #[arg(long, default_value_t = 25)]
    pub height: usize,

    /// Log optimizer progress (overridden by `RUST_LOG`).
    #[arg(short = 'v', long)]
    pub verbose: bool,
}

impl Command {
    pub fn args(&self) -> &FitArgs {
        match self {
            Command::Plot(args) | Command::Fit(args) => args,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_fit_flags() {
        let cli = Cli::parse_from([
            "jobfit", "fit", "--metric", "time", "--form", "poly", "-n", "3", "--drop-last", "2",
        ]);
        let Command::Fit(args) = cli.command else {
            panic!("expected fit subcommand");
        };
        assert_eq!(args.metric, Metric::Time);
        assert_eq!(args.form, FitForm::Poly);
        assert_eq!(args.num_params, Some(3));
        assert_eq!(args.drop_last, 2);
        assert_eq!(args.max_x, 210_000.0);
    }
}
