//! Trip input form state, independent of rendering.

use crate::domain::{Categorical, TripInput};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Distance,
    TimeOfDay,
    DayOfWeek,
    Passengers,
    Traffic,
    Weather,
    BaseFare,
    PerKm,
    PerMinute,
    Duration,
}

/// Allowed interval and increment of a numeric field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NumericRange {
    pub min: f64,
    pub max: f64,
    pub step: f64,
    pub decimals: usize,
}

impl NumericRange {
    const fn new(min: f64, max: f64, step: f64, decimals: usize) -> Self {
        Self { min, max, step, decimals }
    }

    fn snap(&self, v: f64) -> f64 {
        let scale = 10f64.powi(self.decimals as i32);
        ((v * scale).round() / scale).clamp(self.min, self.max)
    }
}

pub const PREDICT_FIELDS: &[Field] = &[
    Field::Distance,
    Field::TimeOfDay,
    Field::DayOfWeek,
    Field::Passengers,
    Field::Traffic,
    Field::Weather,
    Field::BaseFare,
    Field::PerKm,
    Field::PerMinute,
    Field::Duration,
];

/// The route page derives the distance from geocoding.
pub const ROUTE_FIELDS: &[Field] = &[
    Field::TimeOfDay,
    Field::DayOfWeek,
    Field::Passengers,
    Field::Traffic,
    Field::Weather,
    Field::BaseFare,
    Field::PerKm,
    Field::PerMinute,
    Field::Duration,
];

const ROUTE_DEFAULT_DURATION: f64 = 180.0;

/// Long-distance routes can take most of a day.
const ROUTE_DURATION: NumericRange = NumericRange::new(1.0, 1440.0, 5.0, 0);

impl Field {
    pub fn label(self) -> &'static str {
        match self {
            Field::Distance => "Trip Distance (km)",
            Field::TimeOfDay => "Time of Day",
            Field::DayOfWeek => "Day of Week",
            Field::Passengers => "Number of Passengers",
            Field::Traffic => "Traffic Conditions",
            Field::Weather => "Weather",
            Field::BaseFare => "Base Fare (SEK)",
            Field::PerKm => "Rate per Kilometer (SEK)",
            Field::PerMinute => "Rate per Minute (SEK)",
            Field::Duration => "Trip Duration (minutes)",
        }
    }

    /// `None` for select (categorical) fields.
    pub fn range(self) -> Option<NumericRange> {
        match self {
            Field::Distance => Some(NumericRange::new(0.1, 100.0, 0.1, 1)),
            Field::Passengers => Some(NumericRange::new(1.0, 10.0, 1.0, 0)),
            Field::BaseFare => Some(NumericRange::new(0.1, 20.0, 0.1, 2)),
            Field::PerKm => Some(NumericRange::new(0.1, 10.0, 0.1, 2)),
            Field::PerMinute => Some(NumericRange::new(0.01, 5.0, 0.01, 2)),
            Field::Duration => Some(NumericRange::new(1.0, 300.0, 1.0, 0)),
            Field::TimeOfDay | Field::DayOfWeek | Field::Traffic | Field::Weather => None,
        }
    }

    fn numeric(self, trip: &TripInput) -> Option<f64> {
        match self {
            Field::Distance => Some(trip.trip_distance_km),
            Field::Passengers => Some(trip.passenger_count),
            Field::BaseFare => Some(trip.base_fare),
            Field::PerKm => Some(trip.per_km_rate),
            Field::PerMinute => Some(trip.per_minute_rate),
            Field::Duration => Some(trip.trip_duration_minutes),
            _ => None,
        }
    }

    fn numeric_mut(self, trip: &mut TripInput) -> Option<&mut f64> {
        match self {
            Field::Distance => Some(&mut trip.trip_distance_km),
            Field::Passengers => Some(&mut trip.passenger_count),
            Field::BaseFare => Some(&mut trip.base_fare),
            Field::PerKm => Some(&mut trip.per_km_rate),
            Field::PerMinute => Some(&mut trip.per_minute_rate),
            Field::Duration => Some(&mut trip.trip_duration_minutes),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TripForm {
    fields: &'static [Field],
    selected: usize,
    /// Overrides the default duration limits.
    duration: Option<NumericRange>,
    pub trip: TripInput,
    /// Text buffer while a numeric field is being typed in.
    editing: Option<String>,
}

impl TripForm {
    pub fn predict() -> Self {
        Self {
            fields: PREDICT_FIELDS,
            selected: 0,
            duration: None,
            trip: TripInput::default(),
            editing: None,
        }
    }

    pub fn route() -> Self {
        Self {
            fields: ROUTE_FIELDS,
            selected: 0,
            duration: Some(ROUTE_DURATION),
            trip: TripInput {
                trip_duration_minutes: ROUTE_DEFAULT_DURATION,
                ..TripInput::default()
            },
            editing: None,
        }
    }

    pub fn fields(&self) -> &'static [Field] {
        self.fields
    }

    pub fn selected(&self) -> usize {
        self.selected
    }

    pub fn selected_field(&self) -> Field {
        self.fields[self.selected]
    }

    /// Limits of `field` on this form; `None` for select fields.
    pub fn range(&self, field: Field) -> Option<NumericRange> {
        match (field, self.duration) {
            (Field::Duration, Some(range)) => Some(range),
            _ => field.range(),
        }
    }

    pub fn select_next(&mut self) {
        if self.selected + 1 < self.fields.len() {
            self.selected += 1;
        }
    }

    pub fn select_prev(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    pub fn is_editing(&self) -> bool {
        self.editing.is_some()
    }

    /// Move the selected field by `steps` increments (or options).
    pub fn adjust(&mut self, steps: i32) {
        let field = self.selected_field();
        if let (Some(range), Some(value)) = (self.range(field), field.numeric_mut(&mut self.trip)) {
            *value = range.snap(*value + steps as f64 * range.step);
            return;
        }

        let forward = steps >= 0;
        for _ in 0..steps.unsigned_abs().max(1) {
            let t = &mut self.trip;
            match field {
                Field::TimeOfDay => t.time_of_day = cycle(t.time_of_day, forward),
                Field::DayOfWeek => t.day_of_week = cycle(t.day_of_week, forward),
                Field::Traffic => t.traffic_conditions = cycle(t.traffic_conditions, forward),
                Field::Weather => t.weather = cycle(t.weather, forward),
                _ => {}
            }
        }
    }

    /// Start typing a value into the selected numeric field.
    pub fn begin_edit(&mut self) -> bool {
        if self.range(self.selected_field()).is_none() {
            return false;
        }
        self.editing = Some(String::new());
        true
    }

    pub fn push_char(&mut self, c: char) {
        if let Some(buf) = &mut self.editing {
            if c.is_ascii_digit() || (c == '.' && !buf.contains('.')) {
                buf.push(c);
            }
        }
    }

    pub fn backspace(&mut self) {
        if let Some(buf) = &mut self.editing {
            buf.pop();
        }
    }

    pub fn cancel_edit(&mut self) {
        self.editing = None;
    }

    /// Apply the typed value. Out-of-range input is rejected and the old value kept.
    pub fn commit_edit(&mut self) -> Result<(), String> {
        let Some(buf) = self.editing.take() else {
            return Ok(());
        };
        let field = self.selected_field();
        let Some(range) = self.range(field) else {
            return Ok(());
        };

        let v: f64 = buf
            .parse()
            .map_err(|_| format!("{}: '{buf}' is not a number", field.label()))?;
        if !(range.min..=range.max).contains(&v) {
            return Err(format!(
                "{} must be between {} and {}",
                field.label(),
                fmt_number(range.min, range.decimals),
                fmt_number(range.max, range.decimals)
            ));
        }
        if let Some(value) = field.numeric_mut(&mut self.trip) {
            *value = range.snap(v);
        }
        Ok(())
    }

    /// Display text of a field's current value (or the edit buffer).
    pub fn value_text(&self, field: Field) -> String {
        if field == self.selected_field() {
            if let Some(buf) = &self.editing {
                return format!("{buf}_");
            }
        }
        let t = &self.trip;
        match field {
            Field::TimeOfDay => t.time_of_day.label().to_string(),
            Field::DayOfWeek => t.day_of_week.label().to_string(),
            Field::Traffic => t.traffic_conditions.label().to_string(),
            Field::Weather => t.weather.label().to_string(),
            _ => match (self.range(field), field.numeric(t)) {
                (Some(range), Some(v)) => fmt_number(v, range.decimals),
                _ => String::new(),
            },
        }
    }
}

fn cycle<C: Categorical>(value: C, forward: bool) -> C {
    if forward { value.next() } else { value.prev() }
}

fn fmt_number(v: f64, decimals: usize) -> String {
    format!("{v:.decimals$}")
}

/// Bullet lines describing a trip, shown next to a prediction.
pub fn trip_summary(trip: &TripInput) -> Vec<String> {
    vec![
        format!("Distance: {} km", fmt_trimmed(trip.trip_distance_km)),
        format!("Duration: {} minutes", fmt_trimmed(trip.trip_duration_minutes)),
        format!("Time: {}, {}", trip.time_of_day.label(), trip.day_of_week.label()),
        format!("Traffic: {}", trip.traffic_conditions.label()),
        format!("Weather: {}", trip.weather.label()),
    ]
}

fn fmt_trimmed(v: f64) -> String {
    let s = format!("{v:.2}");
    s.trim_end_matches('0').trim_end_matches('.').to_string()
}
