//! Remote data sources used by the dashboard: the prediction API and the
//! geocoding service.

pub mod api;
pub mod geo;

pub use api::ApiClient;
pub use geo::{GeoPoint, Geocoder, geodesic_km};

/// Failure talking to a remote service.
///
/// `Display` is the exact text the dashboard shows to the user.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ClientError {
    #[error("Cannot connect to {service}")]
    Connect { service: &'static str },
    #[error("Error: {0}")]
    Status(u16),
    #[error("Invalid response: {0}")]
    Decode(String),
    #[error("Could not find location: {0}")]
    NotFound(String),
}

impl ClientError {
    pub(crate) fn from_send(service: &'static str, err: reqwest::Error) -> Self {
        tracing::warn!("{service} request failed: {err}");
        if err.is_connect() || err.is_timeout() {
            ClientError::Connect { service }
        } else {
            ClientError::Decode(err.to_string())
        }
    }
}
