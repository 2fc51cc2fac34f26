//! Export per-trip evaluation results to CSV.
//!
//! The export is meant to be easy to consume in spreadsheets or downstream scripts.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::domain::{Categorical, TripResidual};
use crate::error::AppError;

/// Write per-trip predictions and residuals to a CSV file.
pub fn write_residuals_csv(path: &Path, residuals: &[TripResidual]) -> Result<(), AppError> {
    let mut file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create export CSV '{}': {e}", path.display())))?;
    write_residuals(&mut file, residuals)?;
    tracing::info!("Wrote {} rows to {}", residuals.len(), path.display());
    Ok(())
}

fn write_residuals<W: Write>(out: &mut W, residuals: &[TripResidual]) -> Result<(), AppError> {
    writeln!(
        out,
        "row,distance_km,duration_min,time_of_day,day_of_week,traffic,weather,actual_price,predicted_price,residual"
    )
    .map_err(|e| AppError::new(2, format!("Failed to write export CSV header: {e}")))?;

    for r in residuals {
        let t = &r.record.trip;
        writeln!(
            out,
            "{},{:.2},{:.2},{},{},{},{},{:.4},{:.4},{:.4}",
            r.row,
            t.trip_distance_km,
            t.trip_duration_minutes,
            t.time_of_day.label(),
            t.day_of_week.label(),
            t.traffic_conditions.label(),
            t.weather.label(),
            r.record.trip_price,
            r.predicted,
            r.residual,
        )
        .map_err(|e| AppError::new(2, format!("Failed to write export CSV row: {e}")))?;
    }
    Ok(())
}
