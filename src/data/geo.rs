//! Geocoding (Nominatim) and geodesic distance.

use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::USER_AGENT;
use serde::{Deserialize, Serialize};

use crate::data::ClientError;

const SERVICE: &str = "geocoding service";
const AGENT: &str = "taxi_price_predictor";
const TIMEOUT: Duration = Duration::from_secs(10);

// WGS-84 ellipsoid.
const WGS84_A: f64 = 6_378_137.0;
const WGS84_F: f64 = 1.0 / 298.257_223_563;
const WGS84_B: f64 = WGS84_A * (1.0 - WGS84_F);

/// IUGG mean Earth radius, used by the haversine fallback.
const MEAN_EARTH_RADIUS_KM: f64 = 6371.0088;

const VINCENTY_MAX_ITER: usize = 200;
const VINCENTY_TOL: f64 = 1e-12;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    pub fn midpoint(&self, other: &GeoPoint) -> GeoPoint {
        GeoPoint::new((self.lat + other.lat) / 2.0, (self.lon + other.lon) / 2.0)
    }
}

/// A geocoded place.
#[derive(Debug, Clone, PartialEq)]
pub struct Location {
    pub query: String,
    pub display_name: String,
    pub point: GeoPoint,
}

/// Nominatim returns coordinates as strings.
#[derive(Debug, Deserialize)]
struct Place {
    lat: String,
    lon: String,
    #[serde(default)]
    display_name: String,
}

pub struct Geocoder {
    client: Client,
    base_url: String,
}

impl Geocoder {
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

    /// Resolve free text (city or address) to its best match.
    pub fn geocode(&self, query: &str) -> Result<Location, ClientError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(ClientError::NotFound(String::new()));
        }

        let resp = self
            .client
            .get(format!("{}/search", self.base_url))
            .header(USER_AGENT, AGENT)
            .query(&[("q", query), ("format", "json"), ("limit", "1")])
            .send()
            .map_err(|e| ClientError::from_send(SERVICE, e))?;

        if !resp.status().is_success() {
            return Err(ClientError::Status(resp.status().as_u16()));
        }

        let places: Vec<Place> = resp.json().map_err(|e| ClientError::Decode(e.to_string()))?;
        let place = places
            .into_iter()
            .next()
            .ok_or_else(|| ClientError::NotFound(query.to_string()))?;

        let lat = parse_coord(&place.lat, 90.0)?;
        let lon = parse_coord(&place.lon, 180.0)?;
        tracing::debug!("geocoded '{query}' to ({lat:.4}, {lon:.4})");

        Ok(Location {
            query: query.to_string(),
            display_name: place.display_name,
            point: GeoPoint::new(lat, lon),
        })
    }
}

fn parse_coord(raw: &str, bound: f64) -> Result<f64, ClientError> {
    match raw.trim().parse::<f64>() {
        Ok(v) if v.is_finite() && v.abs() <= bound => Ok(v),
        _ => Err(ClientError::Decode(format!("invalid coordinate '{raw}'"))),
    }
}

/// Ellipsoidal distance in km; falls back to haversine when Vincenty does not
/// converge (nearly antipodal points).
pub fn geodesic_km(a: GeoPoint, b: GeoPoint) -> f64 {
    vincenty_km(a, b).unwrap_or_else(|| haversine_km(a, b))
}

/// Great-circle distance on a sphere of mean Earth radius.
pub fn haversine_km(a: GeoPoint, b: GeoPoint) -> f64 {
    let (lat1, lat2) = (a.lat.to_radians(), b.lat.to_radians());
    let dlat = lat2 - lat1;
    let dlon = (b.lon - a.lon).to_radians();
    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    2.0 * MEAN_EARTH_RADIUS_KM * h.sqrt().min(1.0).asin()
}

/// Vincenty's inverse formula on the WGS-84 ellipsoid. `None` if the
/// iteration does not converge.
pub fn vincenty_km(a: GeoPoint, b: GeoPoint) -> Option<f64> {
    let f = WGS84_F;
    let l = (b.lon - a.lon).to_radians();
    let u1 = ((1.0 - f) * a.lat.to_radians().tan()).atan();
    let u2 = ((1.0 - f) * b.lat.to_radians().tan()).atan();
    let (sin_u1, cos_u1) = u1.sin_cos();
    let (sin_u2, cos_u2) = u2.sin_cos();

    let mut lambda = l;
    for _ in 0..VINCENTY_MAX_ITER {
        let (sin_l, cos_l) = lambda.sin_cos();
        let sin_sigma = ((cos_u2 * sin_l).powi(2)
            + (cos_u1 * sin_u2 - sin_u1 * cos_u2 * cos_l).powi(2))
        .sqrt();
        if sin_sigma == 0.0 {
            return Some(0.0);
        }
        let cos_sigma = sin_u1 * sin_u2 + cos_u1 * cos_u2 * cos_l;
        let sigma = sin_sigma.atan2(cos_sigma);
        let sin_alpha = cos_u1 * cos_u2 * sin_l / sin_sigma;
        let cos_sq_alpha = 1.0 - sin_alpha * sin_alpha;
        // Equatorial lines have cos²α = 0.
        let cos_2sigma_m = if cos_sq_alpha != 0.0 {
            cos_sigma - 2.0 * sin_u1 * sin_u2 / cos_sq_alpha
        } else {
            0.0
        };
        let c = f / 16.0 * cos_sq_alpha * (4.0 + f * (4.0 - 3.0 * cos_sq_alpha));

        let lambda_prev = lambda;
        lambda = l
            + (1.0 - c)
                * f
                * sin_alpha
                * (sigma
                    + c * sin_sigma
                        * (cos_2sigma_m + c * cos_sigma * (-1.0 + 2.0 * cos_2sigma_m * cos_2sigma_m)));

        if (lambda - lambda_prev).abs() < VINCENTY_TOL {
            let u_sq = cos_sq_alpha * (WGS84_A * WGS84_A - WGS84_B * WGS84_B) / (WGS84_B * WGS84_B);
            let big_a = 1.0 + u_sq / 16384.0 * (4096.0 + u_sq * (-768.0 + u_sq * (320.0 - 175.0 * u_sq)));
            let big_b = u_sq / 1024.0 * (256.0 + u_sq * (-128.0 + u_sq * (74.0 - 47.0 * u_sq)));
            let delta_sigma = big_b
                * sin_sigma
                * (cos_2sigma_m
                    + big_b / 4.0
                        * (cos_sigma * (-1.0 + 2.0 * cos_2sigma_m * cos_2sigma_m)
                            - big_b / 6.0
                                * cos_2sigma_m
                                * (-3.0 + 4.0 * sin_sigma * sin_sigma)
                                * (-3.0 + 4.0 * cos_2sigma_m * cos_2sigma_m)));
            let meters = WGS84_B * big_a * (sigma - delta_sigma);
            return meters.is_finite().then_some(meters / 1000.0);
        }
    }

    None
}
