//! CSV ingest and normalization.
//!
//! This module turns the job resource stats CSV into an in-memory observation
//! table and extracts the `(x, y)` columns for one fit.
//!
//! Design goals:
//! - **Strict schema** for required fields (clear errors + exit code 2)
//! - **Fail on the first bad row**, naming its line; there is no partial fit
//! - **Separation of concerns**: no fitting logic here

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::StringRecord;
use tracing::{debug, info};

use crate::domain::{Metric, Observation, ObservationRow};
use crate::error::AppError;

const REQUIRED_COLUMNS: [&str; 3] = ["input_size", "memory", "time"];

/// Summary stats about the points actually used for fitting.
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetStats {
    pub n_points: usize,
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
}

/// The `(x, y)` columns selected for one fit.
#[derive(Debug, Clone)]
pub struct FitData {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub stats: DatasetStats,
}

/// Convert an `H:M:S` string to whole seconds.
///
/// Each field may be fractional; the total is truncated toward zero.
pub fn hms_to_sec(timestr: &str) -> Result<i64, AppError> {
    let fields: Vec<&str> = timestr.trim().split(':').collect();
    let [h, m, s] = fields.as_slice() else {
        return Err(AppError::usage(format!(
            "Invalid time '{timestr}'. Expected H:M:S."
        )));
    };

    let parse = |field: &str| {
        field.trim().parse::<f64>().map_err(|_| {
            AppError::usage(format!(
                "Invalid time '{timestr}': '{field}' is not a number."
            ))
        })
    };

    let total = parse(*h)? * 3600.0 + parse(*m)? * 60.0 + parse(*s)?;
    if !total.is_finite() {
        return Err(AppError::usage(format!("Invalid time '{timestr}'.")));
    }
    Ok(total.trunc() as i64)
}

/// Load the observation table from a CSV file.
pub fn load_observations(path: &Path) -> Result<Vec<Observation>, AppError> {
    let file = File::open(path).map_err(|e| {
        AppError::usage(format!("Failed to open CSV '{}': {e}", path.display()))
    })?;
    let observations = read_observations(file)?;
    info!(path = %path.display(), rows = observations.len(), "loaded job resource stats");
    Ok(observations)
}

/// Parse the observation table from any reader.
pub fn read_observations<R: Read>(source: R) -> Result<Vec<Observation>, AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(source);

    let headers = reader
        .headers()
        .map_err(|e| AppError::usage(format!("Failed to read CSV headers: {e}")))?
        .clone();
    let headers = normalize_headers(&headers);
    ensure_required_columns_exist(&build_header_map(&headers))?;

    let mut observations = Vec::new();
    for (idx, result) in reader.records().enumerate() {
        // +2 because:
        // - records() starts at line 1 after headers
        // - CSV is 1-based line numbers
        let line = idx + 2;

        let record =
            result.map_err(|e| AppError::usage(format!("CSV parse error on line {line}: {e}")))?;
        let row: ObservationRow = record
            .deserialize(Some(&headers))
            .map_err(|e| AppError::usage(format!("Invalid row on line {line}: {e}")))?;
        let time_s = hms_to_sec(&row.time)
            .map_err(|e| AppError::usage(format!("Line {line}: {e}")))?;

        observations.push(Observation {
            input_size: row.input_size,
            memory: row.memory,
            time_s,
        });
    }
    debug!(rows = observations.len(), "parsed observation rows");

    Ok(observations)
}

/// Extract `x = input_size` and `y = metric`, leaving out the last `drop_last` rows.
pub fn select_columns(
    observations: &[Observation],
    metric: Metric,
    drop_last: usize,
) -> Result<FitData, AppError> {
    let keep = observations.len().saturating_sub(drop_last);
    let used = &observations[..keep];

    let x: Vec<f64> = used.iter().map(|o| o.input_size).collect();
    let y: Vec<f64> = used.iter().map(|o| o.value(metric)).collect();

    let stats = compute_stats(&x, &y).ok_or_else(|| {
        AppError::no_data(format!(
            "No rows left to fit ({} read, {drop_last} dropped).",
            observations.len()
        ))
    })?;

    Ok(FitData { x, y, stats })
}

fn compute_stats(x: &[f64], y: &[f64]) -> Option<DatasetStats> {
    if x.is_empty() {
        return None;
    }
    let (x_min, x_max) = min_max(x);
    let (y_min, y_max) = min_max(y);
    Some(DatasetStats {
        n_points: x.len(),
        x_min,
        x_max,
        y_min,
        y_max,
    })
}

fn min_max(values: &[f64]) -> (f64, f64) {
    values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)))
}

fn normalize_headers(headers: &StringRecord) -> StringRecord {
    headers.iter().map(normalize_header_name).collect()
}

fn normalize_header_name(name: &str) -> String {
    // Excel and other tools sometimes emit UTF-8 CSVs with a BOM prefix on the
    // first header. If we don't strip it, schema validation will incorrectly
    // report missing columns.
    name.trim().trim_start_matches('\u{feff}').to_ascii_lowercase()
}

fn build_header_map(headers: &StringRecord) -> HashMap<&str, usize> {
    headers.iter().enumerate().map(|(idx, name)| (name, idx)).collect()
}

fn ensure_required_columns_exist(header_map: &HashMap<&str, usize>) -> Result<(), AppError> {
    let missing: Vec<&str> = REQUIRED_COLUMNS
        .iter()
        .copied()
        .filter(|c| !header_map.contains_key(c))
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(AppError::usage(format!(
            "Missing required column(s): {}",
            missing.join(", ")
        )))
    }
}
