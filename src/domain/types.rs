//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - deserialized from HTTP request bodies and CSV rows
//! - passed through the encoder/regressor during inference
//! - serialized back to the dashboard

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Currency every fare is quoted in.
pub const CURRENCY: &str = "SEK";

/// Upper bound for `Passenger_Count`.
pub const MAX_PASSENGERS: f64 = 10.0;

/// A categorical trip feature with a fixed, ordered set of labels.
///
/// The ordering only matters for the dashboard (select widgets cycle through
/// `ALL`); the model encodes labels through its own encoder tables.
pub trait Categorical: Copy + PartialEq + Sized + 'static {
    const ALL: &'static [Self];

    /// Label exactly as it appears in the dataset and on the wire.
    fn label(self) -> &'static str;

    fn index(self) -> usize {
        Self::ALL.iter().position(|v| *v == self).unwrap_or(0)
    }

    fn next(self) -> Self {
        let all = Self::ALL;
        all[(self.index() + 1) % all.len()]
    }

    fn prev(self) -> Self {
        let all = Self::ALL;
        all[(self.index() + all.len() - 1) % all.len()]
    }

    fn from_label(raw: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|v| v.label().eq_ignore_ascii_case(raw.trim()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
pub enum TimeOfDay {
    Morning,
    Afternoon,
    Evening,
    Night,
}

impl Categorical for TimeOfDay {
    const ALL: &'static [Self] = &[
        TimeOfDay::Morning,
        TimeOfDay::Afternoon,
        TimeOfDay::Evening,
        TimeOfDay::Night,
    ];

    fn label(self) -> &'static str {
        match self {
            TimeOfDay::Morning => "Morning",
            TimeOfDay::Afternoon => "Afternoon",
            TimeOfDay::Evening => "Evening",
            TimeOfDay::Night => "Night",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
pub enum DayOfWeek {
    Weekday,
    Weekend,
}

impl Categorical for DayOfWeek {
    const ALL: &'static [Self] = &[DayOfWeek::Weekday, DayOfWeek::Weekend];

    fn label(self) -> &'static str {
        match self {
            DayOfWeek::Weekday => "Weekday",
            DayOfWeek::Weekend => "Weekend",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
pub enum TrafficConditions {
    Low,
    Medium,
    High,
}

impl Categorical for TrafficConditions {
    const ALL: &'static [Self] = &[
        TrafficConditions::Low,
        TrafficConditions::Medium,
        TrafficConditions::High,
    ];

    fn label(self) -> &'static str {
        match self {
            TrafficConditions::Low => "Low",
            TrafficConditions::Medium => "Medium",
            TrafficConditions::High => "High",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
pub enum Weather {
    Clear,
    Rain,
    Fog,
}

impl Categorical for Weather {
    const ALL: &'static [Self] = &[Weather::Clear, Weather::Rain, Weather::Fog];

    fn label(self) -> &'static str {
        match self {
            Weather::Clear => "Clear",
            Weather::Rain => "Rain",
            Weather::Fog => "Fog",
        }
    }
}

/// Input features for a single fare prediction.
///
/// Field names on the wire match the cleaned dataset's column headers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripInput {
    #[serde(rename = "Trip_Distance_km")]
    pub trip_distance_km: f64,
    #[serde(rename = "Time_of_Day")]
    pub time_of_day: TimeOfDay,
    #[serde(rename = "Day_of_Week")]
    pub day_of_week: DayOfWeek,
    #[serde(rename = "Passenger_Count")]
    pub passenger_count: f64,
    #[serde(rename = "Traffic_Conditions")]
    pub traffic_conditions: TrafficConditions,
    #[serde(rename = "Weather")]
    pub weather: Weather,
    #[serde(rename = "Base_Fare")]
    pub base_fare: f64,
    #[serde(rename = "Per_Km_Rate")]
    pub per_km_rate: f64,
    #[serde(rename = "Per_Minute_Rate")]
    pub per_minute_rate: f64,
    #[serde(rename = "Trip_Duration_Minutes")]
    pub trip_duration_minutes: f64,
}

impl Default for TripInput {
    /// The example trip the API documents and the dashboard pre-fills.
    fn default() -> Self {
        Self {
            trip_distance_km: 15.5,
            time_of_day: TimeOfDay::Morning,
            day_of_week: DayOfWeek::Weekday,
            passenger_count: 2.0,
            traffic_conditions: TrafficConditions::Medium,
            weather: Weather::Clear,
            base_fare: 3.5,
            per_km_rate: 1.5,
            per_minute_rate: 0.3,
            trip_duration_minutes: 25.0,
        }
    }
}

/// A single field-level validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

impl TripInput {
    /// Value of a numeric column by its wire name.
    pub fn numeric(&self, column: &str) -> Option<f64> {
        match column {
            "Trip_Distance_km" => Some(self.trip_distance_km),
            "Passenger_Count" => Some(self.passenger_count),
            "Base_Fare" => Some(self.base_fare),
            "Per_Km_Rate" => Some(self.per_km_rate),
            "Per_Minute_Rate" => Some(self.per_minute_rate),
            "Trip_Duration_Minutes" => Some(self.trip_duration_minutes),
            _ => None,
        }
    }

    /// Label of a categorical column by its wire name.
    pub fn categorical(&self, column: &str) -> Option<&'static str> {
        match column {
            "Time_of_Day" => Some(self.time_of_day.label()),
            "Day_of_Week" => Some(self.day_of_week.label()),
            "Traffic_Conditions" => Some(self.traffic_conditions.label()),
            "Weather" => Some(self.weather.label()),
            _ => None,
        }
    }

    /// Check the numeric constraints; returns every violation, not just the first.
    pub fn validate(&self) -> Result<(), Vec<FieldError>> {
        let mut errors = Vec::new();

        let positive = [
            ("Trip_Distance_km", self.trip_distance_km),
            ("Passenger_Count", self.passenger_count),
            ("Base_Fare", self.base_fare),
            ("Per_Km_Rate", self.per_km_rate),
            ("Per_Minute_Rate", self.per_minute_rate),
            ("Trip_Duration_Minutes", self.trip_duration_minutes),
        ];
        for (field, value) in positive {
            if !value.is_finite() {
                errors.push(FieldError {
                    field,
                    message: "Input should be a finite number".to_string(),
                });
            } else if value <= 0.0 {
                errors.push(FieldError {
                    field,
                    message: "Input should be greater than 0".to_string(),
                });
            }
        }

        if self.passenger_count.is_finite() && self.passenger_count > MAX_PASSENGERS {
            errors.push(FieldError {
                field: "Passenger_Count",
                message: format!("Input should be less than or equal to {MAX_PASSENGERS}"),
            });
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

/// One row of the cleaned dataset: the model inputs plus the observed price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripRecord {
    #[serde(flatten)]
    pub trip: TripInput,
    #[serde(rename = "Trip_Price")]
    pub trip_price: f64,
}

/// Response body of `POST /predict`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResponse {
    pub predicted_price: f64,
    pub currency: String,
}

/// Clamp a raw price to be non-negative and round it to two decimals.
pub fn round_price(raw: f64) -> f64 {
    let clamped = if raw.is_finite() { raw.max(0.0) } else { 0.0 };
    // `-0.0` would serialize as `-0.0`.
    ((clamped * 100.0).round() / 100.0).abs()
}

/// Response body of `POST /predict/batch`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchPredictionResponse {
    pub predictions: Vec<PredictionResponse>,
    pub count: usize,
}

/// Offline hold-out metrics recorded in the model artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMetrics {
    pub r2: f64,
    pub rmse: f64,
    pub mae: f64,
    #[serde(default)]
    pub n_test: usize,
}

/// Per-trip evaluation output (used for rankings and exports).
#[derive(Debug, Clone)]
pub struct TripResidual {
    /// Zero-based row index in the dataset.
    pub row: usize,
    pub record: TripRecord,
    pub predicted: f64,
    /// `actual - predicted`; positive means the trip was priced above the model.
    pub residual: f64,
}
