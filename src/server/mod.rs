//! HTTP API serving the fare model and the cleaned dataset.
//!
//! The model and dataset are loaded once before the listener binds; both are
//! read-only afterwards and shared across requests through `Arc`.

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::config::ServerConfig;
use crate::domain::TripRecord;
use crate::error::AppError;
use crate::model::FareModel;

pub mod error;
pub mod handlers;
#[cfg(test)]
pub(crate) mod test_support;

#[cfg(test)]
pub(crate) use test_support::spawn_test_server;

/// Shared, read-only request state.
#[derive(Debug, Clone)]
pub struct AppState {
    pub model: Arc<FareModel>,
    pub dataset: Arc<Vec<TripRecord>>,
}

impl AppState {
    pub fn new(model: FareModel, dataset: Vec<TripRecord>) -> Self {
        Self {
            model: Arc::new(model),
            dataset: Arc::new(dataset),
        }
    }
}

/// Build the router with all routes and middleware.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::root))
        .route("/taxi", get(handlers::dataset))
        .route("/predict", post(handlers::predict))
        .route("/predict/batch", post(handlers::predict_batch))
        .route("/model", get(handlers::model_info))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Load artifacts and serve until Ctrl+C.
pub fn run(config: &ServerConfig) -> Result<(), AppError> {
    tracing::info!("Loading model artifacts...");
    let model = FareModel::load(&config.model_path)?;
    let dataset = crate::io::load_dataset(&config.data_path)?;
    tracing::info!("Model artifacts loaded successfully!");

    let state = AppState::new(model, dataset.records);

    let runtime = tokio::runtime::Runtime::new()
        .map_err(|e| AppError::new(4, format!("Failed to create runtime: {e}")))?;

    let bind_addr = config.bind_addr();
    runtime.block_on(async move {
        let app = router(state);

        let listener = tokio::net::TcpListener::bind(&bind_addr)
            .await
            .map_err(|e| AppError::new(4, format!("Failed to bind {bind_addr}: {e}")))?;

        tracing::info!("Server listening on http://{bind_addr}");
        tracing::info!("  GET  /               - Health check");
        tracing::info!("  GET  /taxi           - Cleaned dataset");
        tracing::info!("  POST /predict        - Single prediction");
        tracing::info!("  POST /predict/batch  - Batch prediction");
        tracing::info!("  GET  /model          - Model information");

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| AppError::new(4, format!("Server error: {e}")))?;

        tracing::info!("Server stopped");
        Ok(())
    })
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to install Ctrl+C handler: {e}");
        // Without a signal handler, keep serving until the process is killed.
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode};
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use crate::domain::{TripInput, Weather};
    use crate::model::tests::{shipped_model, tiny_linear_artifact};

    fn sample_records() -> Vec<TripRecord> {
        (1..=5)
            .map(|i| TripRecord {
                trip: TripInput {
                    trip_distance_km: i as f64 * 2.0,
                    ..TripInput::default()
                },
                trip_price: i as f64 * 10.0,
            })
            .collect()
    }

    fn app() -> Router {
        router(AppState::new(shipped_model(), sample_records()))
    }

    async fn send(app: Router, req: Request<Body>) -> (StatusCode, Value) {
        let resp = app.oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    fn post_json(uri: &str, body: String) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn root_lists_endpoints() {
        let (status, body) = send(app(), get("/")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Taxi Price Prediction API is running!");
        assert_eq!(body["endpoints"]["predict"], "/predict");
    }

    #[tokio::test]
    async fn predict_returns_rounded_price() {
        let payload = serde_json::to_string(&TripInput::default()).unwrap();
        let (status, body) = send(app(), post_json("/predict", payload)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["predicted_price"], json!(33.1));
        assert_eq!(body["currency"], "SEK");
    }

    #[tokio::test]
    async fn predict_rejects_out_of_range_fields() {
        let mut payload = serde_json::to_value(TripInput::default()).unwrap();
        payload["Trip_Distance_km"] = json!(0.0);
        payload["Passenger_Count"] = json!(12);
        let (status, body) = send(app(), post_json("/predict", payload.to_string())).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["detail"][0]["loc"], json!(["body", "Trip_Distance_km"]));
        assert_eq!(body["detail"][1]["loc"], json!(["body", "Passenger_Count"]));
    }

    #[tokio::test]
    async fn predict_rejects_unknown_category_and_bad_json() {
        let mut payload = serde_json::to_value(TripInput::default()).unwrap();
        payload["Weather"] = json!("Snow");
        let (status, body) = send(app(), post_json("/predict", payload.to_string())).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["detail"].is_string());

        let (status, body) = send(app(), post_json("/predict", "{not json".to_string())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["detail"].is_string());
    }

    #[tokio::test]
    async fn inference_failure_is_a_server_error() {
        let model = FareModel::from_artifact(tiny_linear_artifact()).unwrap();
        let app = router(AppState::new(model, sample_records()));
        let trip = TripInput {
            weather: Weather::Fog,
            ..TripInput::default()
        };
        let payload = serde_json::to_string(&trip).unwrap();
        let (status, body) = send(app, post_json("/predict", payload)).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        let detail = body["detail"].as_str().unwrap();
        assert!(detail.starts_with("Prediction error:"), "{detail}");
        assert!(detail.contains("Fog"));
    }

    #[tokio::test]
    async fn batch_predicts_in_order_and_reports_item_index() {
        let trips = vec![
            TripInput::default(),
            TripInput {
                trip_distance_km: 40.0,
                trip_duration_minutes: 80.0,
                ..TripInput::default()
            },
        ];
        let payload = serde_json::to_string(&trips).unwrap();
        let (status, body) = send(app(), post_json("/predict/batch", payload)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], 2);
        assert_eq!(body["predictions"][0]["predicted_price"], json!(33.1));
        let long = body["predictions"][1]["predicted_price"].as_f64().unwrap();
        assert!(long > 33.1);

        let bad = vec![
            TripInput::default(),
            TripInput {
                base_fare: -1.0,
                ..TripInput::default()
            },
        ];
        let payload = serde_json::to_string(&bad).unwrap();
        let (status, body) = send(app(), post_json("/predict/batch", payload)).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["detail"][0]["loc"], json!(["body", 1, "Base_Fare"]));
    }

    #[tokio::test]
    async fn oversized_batch_is_rejected() {
        let trips = vec![TripInput::default(); handlers::MAX_BATCH_SIZE + 1];
        let payload = serde_json::to_string(&trips).unwrap();
        let (status, body) = send(app(), post_json("/predict/batch", payload)).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        let detail = body["detail"].as_str().unwrap();
        assert!(detail.contains("at most 1000"), "{detail}");

        let trips = vec![TripInput::default(); handlers::MAX_BATCH_SIZE];
        let payload = serde_json::to_string(&trips).unwrap();
        let (status, body) = send(app(), post_json("/predict/batch", payload)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], 1000);
    }

    #[tokio::test]
    async fn batch_inference_failure_is_a_server_error() {
        let model = FareModel::from_artifact(tiny_linear_artifact()).unwrap();
        let app = router(AppState::new(model, sample_records()));
        let trips = vec![
            TripInput::default(),
            TripInput {
                weather: Weather::Fog,
                ..TripInput::default()
            },
        ];
        let payload = serde_json::to_string(&trips).unwrap();
        let (status, body) = send(app, post_json("/predict/batch", payload)).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["detail"].as_str().unwrap().starts_with("Prediction error:"));
    }

    #[tokio::test]
    async fn dataset_is_served_with_paging() {
        let (status, body) = send(app(), get("/taxi")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 5);
        assert_eq!(body[0]["Trip_Price"], json!(10.0));
        assert_eq!(body[0]["Time_of_Day"], "Morning");

        let (_, body) = send(app(), get("/taxi?offset=3&limit=10")).await;
        let rows = body.as_array().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["Trip_Distance_km"], json!(8.0));

        let (_, body) = send(app(), get("/taxi?offset=99")).await;
        assert!(body.as_array().unwrap().is_empty());

        let (status, _) = send(app(), get("/taxi?limit=abc")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn model_info_is_exposed() {
        let (status, body) = send(app(), get("/model")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["kind"], "gradient_boosting");
        assert_eq!(body["n_trees"], 120);
        assert_eq!(body["currency"], "SEK");
    }
}

