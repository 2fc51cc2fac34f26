//! Markdown snapshot of the dashboard state, written on demand for
//! inspecting what the API served and what the pages computed.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::fs::create_dir_all;
use std::path::{Path, PathBuf};

use chrono::Local;

use crate::domain::{Categorical, TripRecord};
use crate::error::AppError;
use crate::io::ingest::compute_stats;
use crate::model::ModelInfo;

/// Inputs for a snapshot; borrowed from the running dashboard.
pub struct DashboardSnapshot<'a> {
    pub api_url: &'a str,
    pub model: Option<&'a ModelInfo>,
    pub records: &'a [TripRecord],
    pub prediction: Vec<String>,
    pub route: Vec<String>,
}

/// Write the snapshot to `dir` with a timestamped file name.
pub fn write_snapshot(dir: &Path, snapshot: &DashboardSnapshot<'_>) -> Result<PathBuf, AppError> {
    create_dir_all(dir).map_err(|e| AppError::new(4, format!("Failed to create debug dir: {e}")))?;

    let ts = Local::now().format("%Y%m%d_%H%M%S");
    let path = dir.join(format!("taxipred_debug_{ts}.md"));

    std::fs::write(&path, render_snapshot(snapshot))
        .map_err(|e| AppError::new(4, format!("Failed to write debug file: {e}")))?;
    tracing::info!("Wrote debug snapshot to {}", path.display());

    Ok(path)
}

/// Render the snapshot as markdown.
pub fn render_snapshot(s: &DashboardSnapshot<'_>) -> String {
    let mut out = String::new();

    // Writing into a String cannot fail.
    let _ = writeln!(out, "# taxipred dashboard snapshot");
    let _ = writeln!(out, "- generated: {}", Local::now().to_rfc3339());
    let _ = writeln!(out, "- api_url: {}", s.api_url);

    let _ = writeln!(out, "\n## Model");
    match s.model {
        Some(m) => {
            let _ = writeln!(out, "- name: {} v{}", m.name, m.version);
            let _ = writeln!(out, "- kind: {} ({})", m.display_name, m.kind);
            if let Some(n) = m.n_trees {
                let _ = writeln!(out, "- trees: {n}");
            }
            let _ = writeln!(out, "- loaded_at: {}", m.loaded_at.to_rfc3339());
            if let Some(metrics) = &m.metrics {
                let _ = writeln!(
                    out,
                    "- offline: r2={:.4} rmse={:.3} mae={:.3} n_test={}",
                    metrics.r2, metrics.rmse, metrics.mae, metrics.n_test
                );
            }
        }
        None => {
            let _ = writeln!(out, "- unavailable");
        }
    }

    let _ = writeln!(out, "\n## Dataset");
    match compute_stats(s.records) {
        Some(st) => {
            let _ = writeln!(out, "- rows: {}", st.n_rows);
            let _ = writeln!(out, "- distance_km: {:.2}..{:.2}", st.distance_min, st.distance_max);
            let _ = writeln!(
                out,
                "- price: {:.2}..{:.2} (mean {:.2})",
                st.price_min, st.price_max, st.price_mean
            );

            let _ = writeln!(out, "\n| column | value | trips | mean price |");
            let _ = writeln!(out, "| - | - | - | - |");
            let columns: [(&str, fn(&TripRecord) -> &'static str); 4] = [
                ("Time_of_Day", |r| r.trip.time_of_day.label()),
                ("Day_of_Week", |r| r.trip.day_of_week.label()),
                ("Traffic_Conditions", |r| r.trip.traffic_conditions.label()),
                ("Weather", |r| r.trip.weather.label()),
            ];
            for (column, label_of) in columns {
                for (value, (n, mean)) in group_mean_price(s.records, label_of) {
                    let _ = writeln!(out, "| {column} | {value} | {n} | {mean:.2} |");
                }
            }
        }
        None => {
            let _ = writeln!(out, "- no rows loaded");
        }
    }

    write_section(&mut out, "Last prediction", &s.prediction);
    write_section(&mut out, "Last route", &s.route);

    out
}

fn write_section(out: &mut String, title: &str, lines: &[String]) {
    let _ = writeln!(out, "\n## {title}");
    if lines.is_empty() {
        let _ = writeln!(out, "- none");
    }
    for line in lines {
        let _ = writeln!(out, "- {line}");
    }
}

/// Trip count and mean price per category label, sorted by label.
fn group_mean_price(
    records: &[TripRecord],
    label_of: fn(&TripRecord) -> &'static str,
) -> BTreeMap<&'static str, (usize, f64)> {
    let mut sums: BTreeMap<&'static str, (usize, f64)> = BTreeMap::new();
    for r in records {
        let entry = sums.entry(label_of(r)).or_insert((0, 0.0));
        entry.0 += 1;
        entry.1 += r.trip_price;
    }
    for (n, total) in sums.values_mut() {
        *total /= *n as f64;
    }
    sums
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{TripInput, Weather};

    fn records() -> Vec<TripRecord> {
        vec![
            TripRecord {
                trip: TripInput::default(),
                trip_price: 10.0,
            },
            TripRecord {
                trip: TripInput {
                    weather: Weather::Rain,
                    ..TripInput::default()
                },
                trip_price: 30.0,
            },
            TripRecord {
                trip: TripInput::default(),
                trip_price: 20.0,
            },
        ]
    }

    #[test]
    fn snapshot_lists_dataset_groups_and_results() {
        let records = records();
        let snap = DashboardSnapshot {
            api_url: "http://localhost:8000",
            model: None,
            records: &records,
            prediction: vec!["33.10 SEK".to_string()],
            route: Vec::new(),
        };
        let md = render_snapshot(&snap);
        assert!(md.contains("- api_url: http://localhost:8000"));
        assert!(md.contains("## Model\n- unavailable"));
        assert!(md.contains("- rows: 3"));
        assert!(md.contains("| Weather | Clear | 2 | 15.00 |"));
        assert!(md.contains("| Weather | Rain | 1 | 30.00 |"));
        assert!(md.contains("## Last prediction\n- 33.10 SEK"));
        assert!(md.contains("## Last route\n- none"));
    }

    #[test]
    fn snapshot_file_is_written() {
        let dir = tempfile::tempdir().unwrap();
        let snap = DashboardSnapshot {
            api_url: "x",
            model: None,
            records: &[],
            prediction: Vec::new(),
            route: Vec::new(),
        };
        let path = write_snapshot(&dir.path().join("debug"), &snap).unwrap();
        let text = std::fs::read_to_string(path).unwrap();
        assert!(text.starts_with("# taxipred dashboard snapshot"));
        assert!(text.contains("- no rows loaded"));
    }
}
