//! Blocking client for the taxipred HTTP API.

use std::time::Duration;

use reqwest::blocking::{Client, Response};
use serde::de::DeserializeOwned;

use crate::data::ClientError;
use crate::domain::{PredictionResponse, TripInput, TripRecord};
use crate::model::ModelInfo;

const SERVICE: &str = "backend API";
const TIMEOUT: Duration = Duration::from_secs(10);

pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(TIMEOUT)
            .build()
            .unwrap_or_else(|_| Client::new());
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The full cleaned dataset from `GET /taxi`.
    pub fn fetch_dataset(&self) -> Result<Vec<TripRecord>, ClientError> {
        let resp = self
            .client
            .get(format!("{}/taxi", self.base_url))
            .send()
            .map_err(|e| ClientError::from_send(SERVICE, e))?;
        decode(resp)
    }

    pub fn predict(&self, trip: &TripInput) -> Result<PredictionResponse, ClientError> {
        let resp = self
            .client
            .post(format!("{}/predict", self.base_url))
            .json(trip)
            .send()
            .map_err(|e| ClientError::from_send(SERVICE, e))?;
        decode(resp)
    }

    pub fn model_info(&self) -> Result<ModelInfo, ClientError> {
        let resp = self
            .client
            .get(format!("{}/model", self.base_url))
            .send()
            .map_err(|e| ClientError::from_send(SERVICE, e))?;
        decode(resp)
    }
}

fn decode<T: DeserializeOwned>(resp: Response) -> Result<T, ClientError> {
    let status = resp.status();
    if !status.is_success() {
        tracing::warn!("API responded with status {status}");
        return Err(ClientError::Status(status.as_u16()));
    }
    resp.json().map_err(|e| ClientError::Decode(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::tests::shipped_model;
    use crate::server::{AppState, router, spawn_test_server};

    fn client() -> ApiClient {
        let records = vec![TripRecord {
            trip: TripInput::default(),
            trip_price: 40.0,
        }];
        let url = spawn_test_server(router(AppState::new(shipped_model(), records)));
        ApiClient::new(url)
    }

    #[test]
    fn talks_to_a_live_server() {
        let api = client();

        let quote = api.predict(&TripInput::default()).unwrap();
        assert_eq!(quote.predicted_price, 33.1);
        assert_eq!(quote.currency, "SEK");

        let rows = api.fetch_dataset().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].trip_price, 40.0);

        let info = api.model_info().unwrap();
        assert_eq!(info.n_trees, Some(120));
    }

    #[test]
    fn rejected_input_surfaces_status() {
        let api = client();
        let trip = TripInput {
            trip_duration_minutes: 0.0,
            ..TripInput::default()
        };
        let err = api.predict(&trip).unwrap_err();
        assert_eq!(err, ClientError::Status(422));
        assert_eq!(err.to_string(), "Error: 422");
    }

    #[test]
    fn unreachable_server_is_a_connect_error() {
        let addr = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap();
        let api = ApiClient::new(format!("http://{addr}"));
        let err = api.predict(&TripInput::default()).unwrap_err();
        assert_eq!(err.to_string(), "Cannot connect to backend API");
    }
}
