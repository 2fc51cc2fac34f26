//! Domain types used throughout the service.
//!
//! This module defines:
//!
//! - the categorical trip features (`TimeOfDay`, `DayOfWeek`, `TrafficConditions`, `Weather`)
//! - prediction inputs/outputs (`TripInput`, `PredictionResponse`)
//! - dataset rows and evaluation outputs (`TripRecord`, `TripResidual`)

pub mod types;

pub use types::*;
