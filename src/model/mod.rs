//! The frozen fare model.
//!
//! The artifact is a single JSON document produced offline. It bundles the
//! feature layout, the label encoders, the standard scaler and the fitted
//! regressor. It is validated once on load; after that, inference is a pure
//! function of the trip and cannot panic.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::domain::{ModelMetrics, PredictionResponse, TripInput, CURRENCY, round_price};

pub mod encode;
pub mod regressor;

pub use encode::{FeatureEncoder, FeatureSpec, ScalerSpec};
pub use regressor::{GradientBoosting, LinearModel, RegressionTree, Regressor, TreeNode};

/// Errors raised while loading or evaluating the fare model.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    /// The artifact file could not be opened.
    #[error("Failed to open model artifact '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    /// The artifact is not valid JSON or does not match the schema.
    #[error("Invalid model artifact JSON: {0}")]
    Parse(#[from] serde_json::Error),
    /// The artifact parsed but is internally inconsistent.
    #[error("Invalid model artifact: {0}")]
    Invalid(String),
    /// A categorical value the label encoder was never fitted on.
    #[error("y contains previously unseen label '{value}' for {column}")]
    UnknownCategory { column: String, value: String },
    /// The regressor produced NaN or infinity.
    #[error("model produced a non-finite prediction")]
    NonFinite,
}

/// On-disk artifact schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub name: String,
    pub version: String,
    #[serde(default = "default_currency")]
    pub currency: String,
    pub features: FeatureSpec,
    pub label_encoders: BTreeMap<String, Vec<String>>,
    pub scaler: ScalerSpec,
    pub model: Regressor,
    #[serde(default)]
    pub metrics: Option<ModelMetrics>,
}

fn default_currency() -> String {
    CURRENCY.to_string()
}

/// Descriptive summary served by `GET /model` and shown in the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub name: String,
    pub version: String,
    pub kind: String,
    pub display_name: String,
    pub n_trees: Option<usize>,
    pub currency: String,
    pub features: Vec<String>,
    pub categories: BTreeMap<String, Vec<String>>,
    pub metrics: Option<ModelMetrics>,
    pub loaded_at: DateTime<Utc>,
}

/// A loaded, validated fare model.
#[derive(Debug, Clone)]
pub struct FareModel {
    name: String,
    version: String,
    currency: String,
    features: Vec<String>,
    encoder: FeatureEncoder,
    regressor: Regressor,
    metrics: Option<ModelMetrics>,
    loaded_at: DateTime<Utc>,
}

impl FareModel {
    /// Read and validate an artifact file.
    pub fn load(path: &Path) -> Result<Self, ModelError> {
        let file = File::open(path).map_err(|source| ModelError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let artifact: ModelArtifact = serde_json::from_reader(BufReader::new(file))?;
        let model = Self::from_artifact(artifact)?;
        tracing::info!(
            "Loaded fare model '{}' v{} ({}, {} features) from {}",
            model.name,
            model.version,
            model.regressor.kind(),
            model.encoder.width(),
            path.display()
        );
        Ok(model)
    }

    pub fn from_artifact(artifact: ModelArtifact) -> Result<Self, ModelError> {
        let encoder = FeatureEncoder::new(&artifact.features, &artifact.label_encoders, &artifact.scaler)?;
        artifact.model.validate(encoder.width())?;

        Ok(Self {
            name: artifact.name,
            version: artifact.version,
            currency: artifact.currency,
            features: artifact.features.order,
            encoder,
            regressor: artifact.model,
            metrics: artifact.metrics,
            loaded_at: Utc::now(),
        })
    }

    /// Raw regression output for a trip (not clamped or rounded).
    pub fn predict(&self, trip: &TripInput) -> Result<f64, ModelError> {
        let x = self.encoder.encode(trip)?;
        let y = self.regressor.predict(&x);
        if y.is_finite() { Ok(y) } else { Err(ModelError::NonFinite) }
    }

    /// Customer-facing price: non-negative, rounded to cents, in the model's currency.
    pub fn quote(&self, trip: &TripInput) -> Result<PredictionResponse, ModelError> {
        let raw = self.predict(trip)?;
        Ok(PredictionResponse {
            predicted_price: round_price(raw),
            currency: self.currency.clone(),
        })
    }

    /// Predict many trips in parallel; fails on the first bad trip.
    pub fn predict_batch(&self, trips: &[TripInput]) -> Result<Vec<f64>, ModelError> {
        trips.par_iter().map(|t| self.predict(t)).collect()
    }

    /// `quote` for many trips, in input order.
    pub fn quote_batch(&self, trips: &[TripInput]) -> Result<Vec<PredictionResponse>, ModelError> {
        trips.par_iter().map(|t| self.quote(t)).collect()
    }

    pub fn info(&self) -> ModelInfo {
        ModelInfo {
            name: self.name.clone(),
            version: self.version.clone(),
            kind: self.regressor.kind().to_string(),
            display_name: self.regressor.display_name().to_string(),
            n_trees: self.regressor.n_trees(),
            currency: self.currency.clone(),
            features: self.features.clone(),
            categories: self.encoder.categories(),
            metrics: self.metrics.clone(),
            loaded_at: self.loaded_at,
        }
    }
}
