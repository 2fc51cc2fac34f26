//! CSV ingest for the cleaned trip dataset.
//!
//! The dataset is already cleaned offline, but we still validate every row:
//! rows that fail to parse are skipped and reported with their line number so
//! that a bad export never takes the server down.

use std::collections::HashMap;
use std::fs::File;
use std::path::Path;

use csv::StringRecord;
use serde::{Deserialize, Serialize};

use crate::domain::{
    Categorical, DayOfWeek, TimeOfDay, TrafficConditions, TripInput, TripRecord, Weather,
};
use crate::error::AppError;

/// Every column the cleaned dataset must provide.
pub const REQUIRED_COLUMNS: [&str; 11] = [
    "Trip_Distance_km",
    "Time_of_Day",
    "Day_of_Week",
    "Passenger_Count",
    "Traffic_Conditions",
    "Weather",
    "Base_Fare",
    "Per_Km_Rate",
    "Per_Minute_Rate",
    "Trip_Duration_Minutes",
    "Trip_Price",
];

/// Summary stats about the rows actually loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetStats {
    pub n_rows: usize,
    pub distance_min: f64,
    pub distance_max: f64,
    pub price_min: f64,
    pub price_max: f64,
    pub price_mean: f64,
}

/// A row-level error encountered during ingest.
#[derive(Debug, Clone)]
pub struct RowError {
    pub line: usize,
    pub message: String,
}

/// Ingest output: parsed records + stats + row errors.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub records: Vec<TripRecord>,
    pub stats: DatasetStats,
    pub row_errors: Vec<RowError>,
    pub rows_read: usize,
}

/// Load the cleaned dataset from a CSV file.
pub fn load_dataset(path: &Path) -> Result<Dataset, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open dataset CSV '{}': {e}", path.display())))?;
    let dataset = read_dataset(file)?;

    if !dataset.row_errors.is_empty() {
        tracing::warn!(
            "Skipped {} of {} rows in {}",
            dataset.row_errors.len(),
            dataset.rows_read,
            path.display()
        );
        for err in dataset.row_errors.iter().take(5) {
            tracing::warn!("  line {}: {}", err.line, err.message);
        }
    }
    tracing::info!("Loaded {} trips from {}", dataset.records.len(), path.display());

    Ok(dataset)
}

/// Parse a dataset from any reader (used by `load_dataset` and tests).
pub fn read_dataset<R: std::io::Read>(reader: R) -> Result<Dataset, AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = reader
        .headers()
        .map_err(|e| AppError::new(2, format!("Failed to read CSV headers: {e}")))?
        .clone();
    let header_map = build_header_map(&headers);

    for column in REQUIRED_COLUMNS {
        if !header_map.contains_key(column) {
            return Err(AppError::new(2, format!("Missing required column: `{column}`")));
        }
    }

    let mut records = Vec::new();
    let mut row_errors = Vec::new();
    let mut rows_read = 0usize;

    for (idx, result) in reader.records().enumerate() {
        // records() starts after the header, and CSV lines are 1-based.
        let line = idx + 2;
        rows_read += 1;

        let record = match result {
            Ok(r) => r,
            Err(e) => {
                row_errors.push(RowError {
                    line,
                    message: format!("CSV parse error: {e}"),
                });
                continue;
            }
        };

        match parse_row(&record, &header_map) {
            Ok(row) => records.push(row),
            Err(message) => row_errors.push(RowError { line, message }),
        }
    }

    let stats = compute_stats(&records)
        .ok_or_else(|| AppError::new(3, "Dataset contains no valid rows."))?;

    Ok(Dataset {
        records,
        stats,
        row_errors,
        rows_read,
    })
}

/// Summary stats over a slice of records; `None` when empty.
pub fn compute_stats(records: &[TripRecord]) -> Option<DatasetStats> {
    if records.is_empty() {
        return None;
    }

    let mut distance_min = f64::INFINITY;
    let mut distance_max = f64::NEG_INFINITY;
    let mut price_min = f64::INFINITY;
    let mut price_max = f64::NEG_INFINITY;
    let mut price_sum = 0.0;

    for r in records {
        distance_min = distance_min.min(r.trip.trip_distance_km);
        distance_max = distance_max.max(r.trip.trip_distance_km);
        price_min = price_min.min(r.trip_price);
        price_max = price_max.max(r.trip_price);
        price_sum += r.trip_price;
    }

    Some(DatasetStats {
        n_rows: records.len(),
        distance_min,
        distance_max,
        price_min,
        price_max,
        price_mean: price_sum / records.len() as f64,
    })
}

fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (normalize_header_name(name), idx))
        .collect()
}

fn normalize_header_name(name: &str) -> String {
    // Spreadsheet exports sometimes prefix the first header with a UTF-8 BOM.
    name.trim().trim_start_matches('\u{feff}').to_string()
}

fn parse_row(record: &StringRecord, header_map: &HashMap<String, usize>) -> Result<TripRecord, String> {
    let trip = TripInput {
        trip_distance_km: parse_f64(record, header_map, "Trip_Distance_km")?,
        time_of_day: parse_category::<TimeOfDay>(record, header_map, "Time_of_Day")?,
        day_of_week: parse_category::<DayOfWeek>(record, header_map, "Day_of_Week")?,
        passenger_count: parse_f64(record, header_map, "Passenger_Count")?,
        traffic_conditions: parse_category::<TrafficConditions>(record, header_map, "Traffic_Conditions")?,
        weather: parse_category::<Weather>(record, header_map, "Weather")?,
        base_fare: parse_f64(record, header_map, "Base_Fare")?,
        per_km_rate: parse_f64(record, header_map, "Per_Km_Rate")?,
        per_minute_rate: parse_f64(record, header_map, "Per_Minute_Rate")?,
        trip_duration_minutes: parse_f64(record, header_map, "Trip_Duration_Minutes")?,
    };
    let trip_price = parse_f64(record, header_map, "Trip_Price")?;

    if let Err(errors) = trip.validate() {
        let parts: Vec<String> = errors.iter().map(|e| format!("`{}`: {}", e.field, e.message)).collect();
        return Err(parts.join("; "));
    }
    if trip_price < 0.0 {
        return Err("Negative `Trip_Price`.".to_string());
    }

    Ok(TripRecord { trip, trip_price })
}

fn get_required<'a>(
    record: &'a StringRecord,
    header_map: &HashMap<String, usize>,
    name: &str,
) -> Result<&'a str, String> {
    let idx = header_map
        .get(name)
        .ok_or_else(|| format!("Missing required column: `{name}`"))?;
    record
        .get(*idx)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| format!("Missing required value: `{name}`"))
}

fn parse_f64(record: &StringRecord, header_map: &HashMap<String, usize>, name: &str) -> Result<f64, String> {
    let raw = get_required(record, header_map, name)?;
    match raw.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(format!("Invalid number '{raw}' in `{name}`.")),
    }
}

fn parse_category<C: Categorical>(
    record: &StringRecord,
    header_map: &HashMap<String, usize>,
    name: &str,
) -> Result<C, String> {
    let raw = get_required(record, header_map, name)?;
    C::from_label(raw).ok_or_else(|| {
        let allowed: Vec<&str> = C::ALL.iter().map(|c| c.label()).collect();
        format!("Unknown value '{raw}' in `{name}` (expected one of: {}).", allowed.join(", "))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "Trip_Distance_km,Time_of_Day,Day_of_Week,Passenger_Count,Traffic_Conditions,Weather,Base_Fare,Per_Km_Rate,Per_Minute_Rate,Trip_Duration_Minutes,Trip_Price";

    #[test]
    fn reads_valid_rows_and_skips_bad_ones() {
        let csv = format!(
            "{HEADER}\n\
             16.87,Afternoon,Weekday,1.0,Medium,Clear,2.22,1.3,0.25,30.32,34.6451\n\
             5.0,Midnight,Weekday,1.0,Low,Clear,2.0,1.0,0.2,10.0,9.0\n\
             ,Morning,Weekend,2.0,High,Rain,3.0,1.0,0.3,20.0,20.0\n\
             41.52,Morning,Weekend,4.0,Low,Rain,3.88,1.92,0.33,59.25,112.4086\n"
        );
        let ds = read_dataset(csv.as_bytes()).unwrap();

        assert_eq!(ds.rows_read, 4);
        assert_eq!(ds.records.len(), 2);
        assert_eq!(ds.row_errors.len(), 2);
        assert_eq!(ds.row_errors[0].line, 3);
        assert!(ds.row_errors[0].message.contains("Midnight"));
        assert_eq!(ds.row_errors[1].line, 4);

        let first = &ds.records[0];
        assert_eq!(first.trip.time_of_day, TimeOfDay::Afternoon);
        assert_eq!(first.trip_price, 34.6451);

        assert_eq!(ds.stats.n_rows, 2);
        assert_eq!(ds.stats.distance_min, 16.87);
        assert_eq!(ds.stats.price_max, 112.4086);
        assert!((ds.stats.price_mean - (34.6451 + 112.4086) / 2.0).abs() < 1e-9);
    }

    #[test]
    fn header_with_bom_and_reordered_columns() {
        let csv = "\u{feff}Trip_Price,Weather,Trip_Distance_km,Time_of_Day,Day_of_Week,Passenger_Count,Traffic_Conditions,Base_Fare,Per_Km_Rate,Per_Minute_Rate,Trip_Duration_Minutes\n\
                   20.0,Fog,10.0,Night,Weekend,3,High,3.0,1.0,0.3,22.0\n";
        let ds = read_dataset(csv.as_bytes()).unwrap();
        assert_eq!(ds.records.len(), 1);
        assert_eq!(ds.records[0].trip.weather, Weather::Fog);
        assert_eq!(ds.records[0].trip_price, 20.0);
    }

    #[test]
    fn missing_column_is_a_schema_error() {
        let csv = "Trip_Distance_km,Trip_Price\n1.0,2.0\n";
        let err = read_dataset(csv.as_bytes()).unwrap_err();
        assert_eq!(err.exit_code(), 2);
        assert!(err.to_string().contains("Time_of_Day"));
    }

    #[test]
    fn all_rows_invalid_is_an_error() {
        let csv = format!("{HEADER}\n-1,Morning,Weekday,1,Low,Clear,2,1,0.2,10,9\n");
        let err = read_dataset(csv.as_bytes()).unwrap_err();
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn shipped_dataset_loads_cleanly() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("data/taxi_trip_pricing_clean.csv");
        let ds = load_dataset(&path).unwrap();
        assert_eq!(ds.records.len(), 480);
        assert!(ds.row_errors.is_empty());
        assert!(ds.stats.price_min >= 0.0);
    }
}
