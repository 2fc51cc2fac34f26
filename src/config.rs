//! Runtime configuration.
//!
//! Values are resolved in this order: CLI flag, environment variable (a `.env`
//! file in the working directory is loaded first), built-in default.

use std::path::PathBuf;

use crate::error::AppError;

pub const ENV_HOST: &str = "TAXIPRED_HOST";
pub const ENV_PORT: &str = "TAXIPRED_PORT";
pub const ENV_MODEL: &str = "TAXIPRED_MODEL";
pub const ENV_DATA: &str = "TAXIPRED_DATA";
pub const ENV_API_URL: &str = "TAXIPRED_API_URL";
pub const ENV_GEOCODER_URL: &str = "TAXIPRED_GEOCODER_URL";

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_MODEL_PATH: &str = "models/fare_model.json";
pub const DEFAULT_DATA_PATH: &str = "data/taxi_trip_pricing_clean.csv";
pub const DEFAULT_API_URL: &str = "http://localhost:8000";
pub const DEFAULT_GEOCODER_URL: &str = "https://nominatim.openstreetmap.org";

/// Settings for `taxipred serve`.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub model_path: PathBuf,
    pub data_path: PathBuf,
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Settings for the dashboard.
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardConfig {
    pub api_url: String,
    pub geocoder_url: String,
}

/// Load `.env` if present and return where it was found; a missing file is fine.
pub fn load_dotenv() -> Option<PathBuf> {
    dotenvy::dotenv().ok()
}

pub fn server_config(
    host: Option<String>,
    port: Option<u16>,
    model: Option<PathBuf>,
    data: Option<PathBuf>,
) -> Result<ServerConfig, AppError> {
    let port = match port {
        Some(p) => p,
        None => match env_var(ENV_PORT) {
            Some(raw) => raw
                .parse::<u16>()
                .map_err(|e| AppError::new(2, format!("Invalid {ENV_PORT} '{raw}': {e}")))?,
            None => DEFAULT_PORT,
        },
    };

    Ok(ServerConfig {
        host: host.or_else(|| env_var(ENV_HOST)).unwrap_or_else(|| DEFAULT_HOST.to_string()),
        port,
        model_path: model_path(model),
        data_path: data_path(data),
    })
}

pub fn model_path(flag: Option<PathBuf>) -> PathBuf {
    flag.or_else(|| env_var(ENV_MODEL).map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_MODEL_PATH))
}

pub fn data_path(flag: Option<PathBuf>) -> PathBuf {
    flag.or_else(|| env_var(ENV_DATA).map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_PATH))
}

pub fn dashboard_config(api_url: Option<String>) -> DashboardConfig {
    DashboardConfig {
        api_url: normalize_url(
            api_url
                .or_else(|| env_var(ENV_API_URL))
                .unwrap_or_else(|| DEFAULT_API_URL.to_string()),
        ),
        geocoder_url: normalize_url(env_var(ENV_GEOCODER_URL).unwrap_or_else(|| DEFAULT_GEOCODER_URL.to_string())),
    }
}

/// Non-empty, trimmed environment value.
fn env_var(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn normalize_url(url: String) -> String {
    url.trim().trim_end_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_take_precedence() {
        let cfg = server_config(
            Some("127.0.0.1".to_string()),
            Some(9000),
            Some(PathBuf::from("m.json")),
            Some(PathBuf::from("d.csv")),
        )
        .unwrap();
        assert_eq!(cfg.bind_addr(), "127.0.0.1:9000");
        assert_eq!(cfg.model_path, PathBuf::from("m.json"));
        assert_eq!(cfg.data_path, PathBuf::from("d.csv"));
    }

    #[test]
    fn urls_lose_trailing_slash() {
        let cfg = dashboard_config(Some(" http://api:8000/ ".to_string()));
        assert_eq!(cfg.api_url, "http://api:8000");
    }
}
