//! Route handlers.

use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::domain::{BatchPredictionResponse, PredictionResponse, TripInput, TripRecord};
use crate::model::ModelInfo;
use crate::server::AppState;
use crate::server::error::ApiError;

/// Largest accepted `/predict/batch` payload.
pub const MAX_BATCH_SIZE: usize = 1000;

/// Health check plus a map of the available endpoints.
pub async fn root() -> Json<Value> {
    Json(json!({
        "message": "Taxi Price Prediction API is running!",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "data": "/taxi",
            "predict": "/predict",
            "predict_batch": "/predict/batch",
            "model": "/model",
        }
    }))
}

#[derive(Debug, Default, Deserialize)]
pub struct DatasetQuery {
    pub offset: Option<usize>,
    pub limit: Option<usize>,
}

/// The cleaned dataset, optionally paged with `offset` / `limit`.
pub async fn dataset(
    State(state): State<AppState>,
    query: Result<Query<DatasetQuery>, QueryRejection>,
) -> Result<Json<Vec<TripRecord>>, ApiError> {
    let Query(query) = query?;
    let records = state.dataset.as_slice();
    let start = query.offset.unwrap_or(0).min(records.len());
    let end = match query.limit {
        Some(limit) => start.saturating_add(limit).min(records.len()),
        None => records.len(),
    };
    Ok(Json(records[start..end].to_vec()))
}

pub async fn predict(
    State(state): State<AppState>,
    payload: Result<Json<TripInput>, JsonRejection>,
) -> Result<Json<PredictionResponse>, ApiError> {
    let Json(trip) = payload?;
    trip.validate()
        .map_err(|errors| ApiError::Validation(errors.into_iter().map(|e| (None, e)).collect()))?;

    let quote = state.model.quote(&trip)?;
    tracing::debug!(
        "predicted {:.2} {} for {:.2} km / {:.1} min",
        quote.predicted_price,
        quote.currency,
        trip.trip_distance_km,
        trip.trip_duration_minutes
    );
    Ok(Json(quote))
}

pub async fn predict_batch(
    State(state): State<AppState>,
    payload: Result<Json<Vec<TripInput>>, JsonRejection>,
) -> Result<Json<BatchPredictionResponse>, ApiError> {
    let Json(trips) = payload?;
    if trips.len() > MAX_BATCH_SIZE {
        return Err(ApiError::Rejected {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            message: format!("Batch has {} trips; at most {MAX_BATCH_SIZE} are accepted", trips.len()),
        });
    }

    let mut errors = Vec::new();
    for (i, trip) in trips.iter().enumerate() {
        if let Err(errs) = trip.validate() {
            errors.extend(errs.into_iter().map(|e| (Some(i), e)));
        }
    }
    if !errors.is_empty() {
        return Err(ApiError::Validation(errors));
    }

    // Rayon fans out across its own pool; keep it off the async workers.
    let model = state.model.clone();
    let predictions = tokio::task::spawn_blocking(move || model.quote_batch(&trips))
        .await
        .map_err(|e| ApiError::Internal(format!("batch prediction task failed: {e}")))??;
    Ok(Json(BatchPredictionResponse {
        count: predictions.len(),
        predictions,
    }))
}

pub async fn model_info(State(state): State<AppState>) -> Json<ModelInfo> {
    Json(state.model.info())
}
