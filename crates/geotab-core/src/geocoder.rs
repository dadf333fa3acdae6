//! Geocoding web service client

use crate::error::{Error, Result};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

/// Google geocoding JSON endpoint
pub const DEFAULT_ENDPOINT: &str = "https://maps.googleapis.com/maps/api/geocode/json";

/// Every request is restricted to this country
pub const COUNTRY: &str = "US";

/// Status the service returns when it found at least one result
pub const STATUS_OK: &str = "OK";

/// Settings for [`HttpGeocoder`]
#[derive(Debug, Clone)]
pub struct GeocoderConfig {
    pub endpoint: String,
    pub api_key: Option<String>,
    pub timeout: Duration,
}

impl Default for GeocoderConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            api_key: None,
            timeout: Duration::from_secs(30),
        }
    }
}

impl GeocoderConfig {
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Render the full request URL. A missing key is sent as an empty string.
    pub fn request_url(&self, request: &GeocodeRequest) -> String {
        format!(
            "{}?address={}&key={}&components=administrative_area:{}|country:{}",
            self.endpoint,
            request.address,
            self.api_key.as_deref().unwrap_or(""),
            request.state,
            COUNTRY
        )
    }
}

/// One geocoding query: the normalized address and its state filter
#[derive(Debug, Clone, PartialEq)]
pub struct GeocodeRequest {
    pub address: String,
    pub state: String,
}

impl GeocodeRequest {
    pub fn new(address: impl Into<String>, state: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            state: state.into(),
        }
    }
}

/// The first result of a successful lookup
#[derive(Debug, Clone, PartialEq)]
pub struct GeocodeMatch {
    pub formatted_address: String,
    /// Match precision, e.g. `ROOFTOP` or `APPROXIMATE`
    pub location_type: String,
    pub lat: f64,
    pub lng: f64,
}

/// Outcome of a well-formed geocoding response
#[derive(Debug, Clone, PartialEq)]
pub enum GeocodeResponse {
    Match(GeocodeMatch),
    /// Any status other than `OK`, e.g. `ZERO_RESULTS` or `REQUEST_DENIED`
    NoMatch {
        status: String,
        error_message: Option<String>,
    },
}

#[derive(Debug, Deserialize)]
struct Envelope {
    status: String,
    #[serde(default)]
    results: Vec<serde_json::Value>,
    #[serde(default)]
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawResult {
    formatted_address: String,
    geometry: RawGeometry,
}

#[derive(Debug, Deserialize)]
struct RawGeometry {
    location_type: String,
    location: RawLocation,
}

#[derive(Debug, Deserialize)]
struct RawLocation {
    lat: f64,
    lng: f64,
}

impl GeocodeResponse {
    /// Decode a response body
    ///
    /// Invalid JSON, a missing `status`, or an `OK` response without a
    /// complete first result are errors. Other statuses are `NoMatch`.
    pub fn from_json(body: &str) -> Result<Self> {
        let envelope: Envelope = serde_json::from_str(body)?;

        if envelope.status != STATUS_OK {
            return Ok(GeocodeResponse::NoMatch {
                status: envelope.status,
                error_message: envelope.error_message,
            });
        }

        let first = envelope.results.into_iter().next().ok_or_else(|| {
            Error::MalformedResponse("status OK but no results".to_string())
        })?;
        let raw: RawResult =
            serde_json::from_value(first).map_err(|e| Error::MalformedResponse(e.to_string()))?;

        Ok(GeocodeResponse::Match(GeocodeMatch {
            formatted_address: raw.formatted_address,
            location_type: raw.geometry.location_type,
            lat: raw.geometry.location.lat,
            lng: raw.geometry.location.lng,
        }))
    }
}

/// Anything that can resolve a [`GeocodeRequest`]
pub trait Geocoder {
    fn geocode(&self, request: &GeocodeRequest) -> Result<GeocodeResponse>;
}

/// Blocking HTTP geocoder
pub struct HttpGeocoder {
    client: reqwest::blocking::Client,
    config: GeocoderConfig,
}

impl HttpGeocoder {
    pub fn new(config: GeocoderConfig) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(config.timeout)
            .build()?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &GeocoderConfig {
        &self.config
    }
}

impl Geocoder for HttpGeocoder {
    fn geocode(&self, request: &GeocodeRequest) -> Result<GeocodeResponse> {
        let url = self.config.request_url(request);
        debug!("geocoding '{}' in {}", request.address, request.state);

        let body = self
            .client
            .get(url)
            .send()?
            .error_for_status()?
            .text()?;

        GeocodeResponse::from_json(&body)
    }
}
