//! Formatting: fit labels, annotation text and the terminal run summary.
//!
//! We keep formatting code in one place so:
//! - the math/fitting code stays clean and testable
//! - output changes are localized (labels appear in the chart legend too)

use crate::domain::{FitConfig, FitForm, FitResult, Prediction};
use crate::io::DatasetStats;
use crate::report::RowResidual;

/// Human-readable description of a fitted function, e.g.
/// `power: 1.50e-03 x^2.10e+00 + 5.00e-01`.
pub fn format_label(form: FitForm, params: &[f64]) -> String {
    let mut label = format!("{}: ", form.name());
    match form {
        FitForm::Poly => {
            let n = params.len();
            for (i, &c) in params.iter().enumerate() {
                label.push_str(&format!("{} x^{} + ", fmt_sci(c), n - i - 1));
            }
            if label.ends_with(" + ") {
                label.truncate(label.len() - " + ".len());
            }
        }
        FitForm::Power => {
            if let [a, b, c] = params {
                label.push_str(&format!("{} x^{} + {}", fmt_sci(*a), fmt_sci(*b), fmt_sci(*c)));
            }
        }
    }
    label
}

/// Scientific notation with two mantissa decimals and a signed exponent of at
/// least two digits (`1.50e-03`), the way C's `%.2e` prints it.
pub fn fmt_sci(v: f64) -> String {
    if v.is_nan() {
        return "nan".to_string();
    }
    if v.is_infinite() {
        return if v > 0.0 { "inf" } else { "-inf" }.to_string();
    }

    let s = format!("{v:.2e}");
    let Some((mantissa, exp)) = s.split_once('e') else {
        return s;
    };
    let exp: i32 = exp.parse().unwrap_or(0);
    let sign = if exp < 0 { '-' } else { '+' };
    format!("{mantissa}e{sign}{:02}", exp.abs())
}

/// Annotation placed next to the predicted point, e.g. `200k rows needs ~2000.00`.
pub fn annotation_text(prediction: &Prediction) -> String {
    let thousands = (prediction.x / 1000.0).trunc() as i64;
    format!("{thousands}k rows needs ~{:.2}", prediction.y)
}

/// Format the full run summary (dataset stats + fit diagnostics + prediction).
pub fn format_run_summary(
    config: &FitConfig,
    stats: &DatasetStats,
    fit: &FitResult,
    prediction: &Prediction,
) -> String {
    let mut out = String::new();

    out.push_str(&format!("=== jobfit - {} ===\n", config.title));
    out.push_str(&format!("CSV: {}\n", config.csv_path.display()));
    out.push_str(&format!(
        "Fit: {} vs input_size | form={} | params={}\n",
        config.metric.column(),
        fit.form.name(),
        config.num_params
    ));
    out.push_str(&format!(
        "Points: n={} | x=[{:.0}, {:.0}] | y=[{:.2}, {:.2}]\n",
        stats.n_points, stats.x_min, stats.x_max, stats.y_min, stats.y_max
    ));
    if config.drop_last > 0 {
        out.push_str(&format!("Dropped trailing rows: {}\n", config.drop_last));
    }

    out.push_str("\nFitted model:\n");
    out.push_str(&format!("- {}\n", fit.label));
    out.push_str(&format!("- params: {}\n", fmt_vec(&fit.params)));
    out.push_str(&format!(
        "- SSE={:.6} RMSE={:.6} (iterations={}, evaluations={})\n",
        fit.sse, fit.rmse, fit.iterations, fit.evaluations
    ));

    out.push_str(&format!(
        "\nPrediction: {}\n",
        annotation_text(prediction)
    ));

    out
}

/// Format observed vs. fitted values for every input row.
pub fn format_residuals(rows: &[RowResidual]) -> String {
    let mut out = String::new();
    out.push_str(
        format!(
            "{:>14} {:>14} {:>14} {:>14}\n",
            "input_size", "observed", "fitted", "residual"
        )
        .trim_end(),
    );
    out.push('\n');
    out.push_str(format!("{:-<14} {:-<14} {:-<14} {:-<14}\n", "", "", "", "").trim_end());
    out.push('\n');

    for r in rows {
        out.push_str(
            format!(
                "{:>14.0} {:>14.2} {:>14.2} {:>14.2}\n",
                r.x, r.y_obs, r.y_fit, r.residual
            )
            .trim_end(),
        );
        out.push('\n');
    }

    out
}

fn fmt_vec(v: &[f64]) -> String {
    let parts: Vec<String> = v.iter().map(|&x| fmt_sci(x)).collect();
    format!("[{}]", parts.join(", "))
}
