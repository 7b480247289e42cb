//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments
//! - sets up logging
//! - runs the fit pipeline
//! - prints the summary and terminal plot

use std::io;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{Command, FitArgs};
use crate::domain::{FitConfig, default_title};
use crate::error::AppError;

pub mod pipeline;

/// Entry point for the `jobfit` binary.
pub fn run() -> Result<(), AppError> {
    // We want `jobfit` and `jobfit --metric time` to behave like `jobfit plot ...`.
    //
    // Clap requires a subcommand name, so we do a small, explicit rewrite of the
    // argv list before parsing.
    let argv = rewrite_args(std::env::args().collect());
    let cli = crate::cli::Cli::parse_from(argv);

    init_tracing(cli.command.args().verbose);

    match cli.command {
        Command::Plot(args) => handle_run(&args, true),
        Command::Fit(args) => handle_run(&args, false),
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    // Fails only if a global subscriber is already set (e.g. by an embedding tool).
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

fn handle_run(args: &FitArgs, write_chart: bool) -> Result<(), AppError> {
    let config = fit_config_from_args(args, write_chart);
    let run = pipeline::run_fit(&config)?;

    println!(
        "{}",
        crate::report::format_run_summary(&config, &run.data.stats, &run.fit, &run.prediction)
    );
    println!("{}", crate::report::format_residuals(&run.residuals));

    if config.show {
        let plot = crate::plot::render_ascii_plot(
            &run.data.x,
            &run.data.y,
            &run.line,
            Some(&run.prediction),
            config.plot_width,
            config.plot_height,
        );
        println!("{plot}");
    }

    if let Some(path) = &run.chart_path {
        println!("Chart written to {}", path.display());
    }

    Ok(())
}

pub fn fit_config_from_args(args: &FitArgs, write_chart: bool) -> FitConfig {
    let num_params = args.num_params.unwrap_or(args.form.default_num_params());
    FitConfig {
        csv_path: args.csv.clone(),
        metric: args.metric,
        form: args.form,
        num_params,
        max_x: args.max_x,
        target: args.target,
        title: args
            .title
            .clone()
            .unwrap_or_else(|| default_title(args.metric, args.form, num_params)),
        drop_last: args.drop_last,
        output: args.output.clone(),
        write_chart,
        show: !args.no_show,
        plot_width: args.width,
        plot_height: args.height,
    }
}

/// Rewrite argv so `jobfit` defaults to `jobfit plot`.
///
/// Rules:
/// - `jobfit`                        -> `jobfit plot`
/// - `jobfit --metric time ...`      -> `jobfit plot --metric time ...`
/// - `jobfit --help/--version/-h`    -> unchanged (show top-level help/version)
fn rewrite_args(mut argv: Vec<String>) -> Vec<String> {
    let Some(arg1) = argv.get(1).cloned() else {
        argv.push("plot".to_string());
        return argv;
    };

    let is_top_level_help_or_version = matches!(
        arg1.as_str(),
        "-h" | "--help" | "-V" | "--version" | "help"
    );
    if is_top_level_help_or_version {
        return argv;
    }

    let is_subcommand = matches!(arg1.as_str(), "plot" | "fit");
    if is_subcommand {
        return argv;
    }

    // If the first token is a flag, treat it as "plot flags".
    if arg1.starts_with('-') {
        argv.insert(1, "plot".to_string());
        return argv;
    }

    // Otherwise, leave as-is.
    argv
}
