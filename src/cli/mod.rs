//! Command-line parsing for the taxi fare predictor.
//!
//! Argument parsing and command dispatch stay separate from the model, server
//! and dashboard code.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::domain::{DayOfWeek, TimeOfDay, TrafficConditions, TripInput, Weather};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "taxipred", version, about = "Taxi fare prediction API and dashboard")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Serve the prediction API over HTTP until Ctrl+C.
    Serve(ServeArgs),
    /// Launch the terminal dashboard against a running API.
    Dashboard(DashboardArgs),
    /// Predict one fare locally from the model artifact.
    Predict(PredictArgs),
    /// Score the model on the cleaned dataset and rank the largest misses.
    Evaluate(EvaluateArgs),
}

#[derive(Debug, Args, Clone)]
pub struct ServeArgs {
    /// Interface to bind (env: TAXIPRED_HOST, default 0.0.0.0).
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind (env: TAXIPRED_PORT, default 8000).
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Model artifact JSON (env: TAXIPRED_MODEL).
    #[arg(long, value_name = "JSON")]
    pub model: Option<PathBuf>,

    /// Cleaned dataset CSV served at /taxi (env: TAXIPRED_DATA).
    #[arg(long, value_name = "CSV")]
    pub data: Option<PathBuf>,
}

#[derive(Debug, Args, Clone)]
pub struct DashboardArgs {
    /// Base URL of the API (env: TAXIPRED_API_URL, default http://localhost:8000).
    #[arg(long)]
    pub api_url: Option<String>,

    /// Directory for the dashboard log file.
    #[arg(long, default_value = "logs")]
    pub log_dir: PathBuf,
}

/// Trip features for a one-off prediction; defaults are the example trip.
#[derive(Debug, Args, Clone)]
pub struct PredictArgs {
    #[arg(long, default_value_t = 15.5)]
    pub distance_km: f64,

    #[arg(long, value_enum, default_value_t = TimeOfDay::Morning)]
    pub time_of_day: TimeOfDay,

    #[arg(long, value_enum, default_value_t = DayOfWeek::Weekday)]
    pub day_of_week: DayOfWeek,

    #[arg(long, default_value_t = 2.0)]
    pub passengers: f64,

    #[arg(long, value_enum, default_value_t = TrafficConditions::Medium)]
    pub traffic: TrafficConditions,

    #[arg(long, value_enum, default_value_t = Weather::Clear)]
    pub weather: Weather,

    #[arg(long, default_value_t = 3.5)]
    pub base_fare: f64,

    #[arg(long, default_value_t = 1.5)]
    pub per_km_rate: f64,

    #[arg(long, default_value_t = 0.3)]
    pub per_minute_rate: f64,

    #[arg(long, default_value_t = 25.0)]
    pub duration_min: f64,

    /// Model artifact JSON (env: TAXIPRED_MODEL).
    #[arg(long, value_name = "JSON")]
    pub model: Option<PathBuf>,
}

impl PredictArgs {
    pub fn trip(&self) -> TripInput {
        TripInput {
            trip_distance_km: self.distance_km,
            time_of_day: self.time_of_day,
            day_of_week: self.day_of_week,
            passenger_count: self.passengers,
            traffic_conditions: self.traffic,
            weather: self.weather,
            base_fare: self.base_fare,
            per_km_rate: self.per_km_rate,
            per_minute_rate: self.per_minute_rate,
            trip_duration_minutes: self.duration_min,
        }
    }
}

#[derive(Debug, Args, Clone)]
pub struct EvaluateArgs {
    /// Model artifact JSON (env: TAXIPRED_MODEL).
    #[arg(long, value_name = "JSON")]
    pub model: Option<PathBuf>,

    /// Cleaned dataset CSV (env: TAXIPRED_DATA).
    #[arg(long, value_name = "CSV")]
    pub data: Option<PathBuf>,

    /// Show top-N over- and under-priced trips.
    #[arg(long, default_value_t = 10)]
    pub top: usize,

    /// Render an ASCII plot in the terminal (enabled by default).
    #[arg(long, default_value_t = true)]
    pub plot: bool,

    /// Disable the terminal plot.
    #[arg(long)]
    pub no_plot: bool,

    /// Plot width (columns).
    #[arg(long, default_value_t = 100)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 25)]
    pub height: usize,

    /// Export per-trip residuals to CSV.
    #[arg(long, value_name = "CSV")]
    pub export: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn predict_defaults_are_the_example_trip() {
        let cli = Cli::parse_from(["taxipred", "predict"]);
        let Command::Predict(args) = cli.command else {
            panic!("expected predict");
        };
        assert_eq!(args.trip(), TripInput::default());
    }

    #[test]
    fn predict_accepts_categorical_flags() {
        let cli = Cli::parse_from([
            "taxipred",
            "predict",
            "--distance-km",
            "45",
            "--time-of-day",
            "night",
            "--traffic",
            "high",
            "--duration-min",
            "95",
        ]);
        let Command::Predict(args) = cli.command else {
            panic!("expected predict");
        };
        let trip = args.trip();
        assert_eq!(trip.time_of_day, TimeOfDay::Night);
        assert_eq!(trip.traffic_conditions, TrafficConditions::High);
        assert_eq!(trip.trip_distance_km, 45.0);
    }

    #[test]
    fn unknown_category_is_rejected() {
        assert!(Cli::try_parse_from(["taxipred", "predict", "--weather", "snow"]).is_err());
    }
}
