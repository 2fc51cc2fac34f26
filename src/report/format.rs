//! Formatted terminal output for `taxipred evaluate`.
//!
//! Formatting lives here so the scoring code stays free of presentation
//! details and output changes stay localized.

use crate::domain::{Categorical, ModelMetrics, TripResidual};
use crate::io::ingest::Dataset;
use crate::model::ModelInfo;
use crate::report::Rankings;

/// Format the run summary: model, dataset stats and metrics.
pub fn format_run_summary(info: &ModelInfo, dataset: &Dataset, metrics: &ModelMetrics) -> String {
    let mut out = String::new();

    out.push_str("=== taxipred - Fare Model Evaluation ===\n");
    out.push_str(&format!(
        "Model: {} v{} ({})\n",
        info.name, info.version, info.display_name
    ));
    if let Some(n) = info.n_trees {
        out.push_str(&format!("Trees: {n}\n"));
    }
    out.push_str(&format!("Features: {}\n", info.features.join(", ")));

    let s = &dataset.stats;
    out.push_str(&format!(
        "Trips: n={} | distance=[{:.2}, {:.2}]km | price=[{:.2}, {:.2}]{} | mean={:.2}\n",
        s.n_rows, s.distance_min, s.distance_max, s.price_min, s.price_max, info.currency, s.price_mean
    ));
    if !dataset.row_errors.is_empty() {
        out.push_str(&format!(
            "Skipped rows: {} of {}\n",
            dataset.row_errors.len(),
            dataset.rows_read
        ));
    }

    out.push_str("\nMetrics:\n");
    out.push_str(&format!(
        "  {:<18} R2={:.4} RMSE={:.3} MAE={:.3} (n={})\n",
        "full dataset", metrics.r2, metrics.rmse, metrics.mae, metrics.n_test
    ));
    if let Some(offline) = &info.metrics {
        out.push_str(&format!(
            "  {:<18} R2={:.4} RMSE={:.3} MAE={:.3} (n={})\n",
            "offline hold-out", offline.r2, offline.rmse, offline.mae, offline.n_test
        ));
    }
    out.push('\n');

    out
}

/// Format the over/under-priced tables.
pub fn format_rankings(rankings: &Rankings, currency: &str) -> String {
    let mut out = String::new();

    out.push_str("Top over-priced (actual above model):\n");
    out.push_str(&format_table(&rankings.over, currency));
    out.push('\n');

    out.push_str("Top under-priced (actual below model):\n");
    out.push_str(&format_table(&rankings.under, currency));

    out
}

fn format_table(rows: &[TripResidual], currency: &str) -> String {
    let mut out = String::new();
    if rows.is_empty() {
        out.push_str("  (none)\n");
        return out;
    }

    let price_header = format!("price {currency}");
    out.push_str(
        format!(
            "{:>5} {:>8} {:>7} {:<18} {:<7} {:<6} {:>10} {:>10} {:>9}\n",
            "row", "km", "min", "when", "traffic", "wx", price_header, "model", "residual"
        )
        .trim_end(),
    );
    out.push('\n');

    out.push_str(
        format!(
            "{:-<5} {:-<8} {:-<7} {:-<18} {:-<7} {:-<6} {:-<10} {:-<10} {:-<9}\n",
            "", "", "", "", "", "", "", "", ""
        )
        .trim_end(),
    );
    out.push('\n');

    for r in rows {
        let t = &r.record.trip;
        let when = format!("{}/{}", t.time_of_day.label(), t.day_of_week.label());
        out.push_str(
            format!(
                "{:>5} {:>8.2} {:>7.1} {:<18} {:<7} {:<6} {:>10.2} {:>10.2} {:>+9.2}\n",
                r.row,
                t.trip_distance_km,
                t.trip_duration_minutes,
                truncate(&when, 18),
                t.traffic_conditions.label(),
                t.weather.label(),
                r.record.trip_price,
                r.predicted,
                r.residual,
            )
            .trim_end(),
        );
        out.push('\n');
    }

    out
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out = String::new();
    for (i, ch) in s.chars().enumerate() {
        if i + 1 >= max {
            break;
        }
        out.push(ch);
    }
    out.push('.');
    out
}
