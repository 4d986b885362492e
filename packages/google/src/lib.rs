#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Google Places / Geocoding web service provider.
//!
//! Implements the `geo_suggest` provider traits against the HTTP APIs:
//!
//! - Autocomplete: `GET /place/autocomplete/json`
//! - Place details: `GET /place/details/json`
//! - Geocoding: `GET /geocode/json`
//!
//! Session tokens are UUID v4 strings, as recommended by Google.
//!
//! See <https://developers.google.com/maps/documentation/places/web-service>

pub mod response;

use std::time::Duration;

use geo_suggest::provider::{
    AutocompleteProvider, GeocodeProvider, PlaceDetailsProvider, SessionTokenFactory,
};
use geo_suggest_models::{
    AutocompleteRequest, DetailsResponse, GeocodeRequest, GeocodeResponse, LatLngBounds,
    LocationBias, PlaceDetailsRequest, RawPrediction, ServiceStatus, SessionToken,
};
use serde::Deserialize;
use thiserror::Error;

/// Environment variable holding the API key.
pub const API_KEY_ENV: &str = "GOOGLE_MAPS_API_KEY";

const SERVICE_TOML: &str = include_str!("../services/google.toml");

/// Errors from the Google web services.
#[derive(Debug, Error)]
pub enum GoogleError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Response parsing failed.
    #[error("Parse error: {message}")]
    Parse {
        /// Description of the parsing failure.
        message: String,
    },

    /// The service answered with a non-OK status.
    #[error("Google returned status {status}: {}", .message.as_deref().unwrap_or("no message"))]
    Status {
        /// Status code.
        status: ServiceStatus,
        /// `error_message` field, when present.
        message: Option<String>,
    },

    /// No API key configured.
    #[error("{API_KEY_ENV} environment variable not set")]
    MissingApiKey,

    /// Service configuration could not be parsed.
    #[error("Config error: {message}")]
    Config {
        /// Description of the failure.
        message: String,
    },
}

/// Web service settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GoogleConfig {
    /// API base URL (e.g. `"https://maps.googleapis.com/maps/api"`).
    pub base_url: String,
    /// Request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Preferred result language (e.g. `"en"`).
    #[serde(default)]
    pub language: Option<String>,
}

const fn default_timeout_secs() -> u64 {
    10
}

impl GoogleConfig {
    /// Parses a service TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`GoogleError::Config`] if the document is malformed.
    pub fn from_toml_str(toml_str: &str) -> Result<Self, GoogleError> {
        toml::de::from_str(toml_str).map_err(|e| GoogleError::Config {
            message: e.to_string(),
        })
    }
}

impl Default for GoogleConfig {
    fn default() -> Self {
        Self::from_toml_str(SERVICE_TOML)
            .unwrap_or_else(|e| panic!("Failed to parse embedded google service config: {e}"))
    }
}

/// Reads the API key from [`API_KEY_ENV`].
///
/// # Errors
///
/// Returns [`GoogleError::MissingApiKey`] if the variable is unset or empty.
pub fn api_key_from_env() -> Result<String, GoogleError> {
    std::env::var(API_KEY_ENV)
        .ok()
        .filter(|key| !key.is_empty())
        .ok_or(GoogleError::MissingApiKey)
}

/// Places provider backed by the Google web services.
#[derive(Debug, Clone)]
pub struct GooglePlacesClient {
    client: reqwest::Client,
    api_key: String,
    config: GoogleConfig,
}

impl GooglePlacesClient {
    /// Creates a client.
    #[must_use]
    pub const fn new(client: reqwest::Client, api_key: String, config: GoogleConfig) -> Self {
        Self {
            client,
            api_key,
            config,
        }
    }

    /// Creates a client with the embedded configuration and the API key
    /// from the environment.
    ///
    /// # Errors
    ///
    /// Returns [`GoogleError::MissingApiKey`] if no key is set, or
    /// [`GoogleError::Http`] if the HTTP client cannot be built.
    pub fn from_env() -> Result<Self, GoogleError> {
        let api_key = api_key_from_env()?;
        let config = GoogleConfig::default();
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self::new(client, api_key, config))
    }

    /// Fetches autocomplete predictions.
    ///
    /// # Errors
    ///
    /// Returns [`GoogleError`] if the HTTP request fails, the response is
    /// malformed, or the service reports a failure status.
    pub async fn autocomplete(
        &self,
        request: &AutocompleteRequest,
    ) -> Result<Vec<RawPrediction>, GoogleError> {
        let mut query = vec![
            ("input", request.input.clone()),
            ("sessiontoken", request.session_token.to_string()),
        ];
        push_bias(&mut query, &request.bias, true);
        let body = self.get("place/autocomplete/json", query).await?;
        response::parse_autocomplete(&body)
    }

    /// Fetches place details.
    ///
    /// # Errors
    ///
    /// Returns [`GoogleError`] if the HTTP request fails or the response is
    /// malformed. Failure statuses are returned in the response.
    pub async fn details(
        &self,
        request: &PlaceDetailsRequest,
    ) -> Result<DetailsResponse, GoogleError> {
        let mut query = vec![
            ("place_id", request.place_id.clone()),
            ("sessiontoken", request.session_token.to_string()),
        ];
        if let Some(fields) = &request.fields {
            query.push(("fields", fields.join(",")));
        }
        let body = self.get("place/details/json", query).await?;
        response::parse_details(&body)
    }

    /// Geocodes an address.
    ///
    /// The HTTP geocoder has no point bias, so only `bounds` and `country`
    /// of the request bias are sent.
    ///
    /// # Errors
    ///
    /// Returns [`GoogleError`] if the HTTP request fails or the response is
    /// malformed. Failure statuses are returned in the response.
    pub async fn geocode_address(
        &self,
        request: &GeocodeRequest,
    ) -> Result<GeocodeResponse, GoogleError> {
        let mut query = vec![("address", request.address.clone())];
        push_bias(&mut query, &request.bias, false);
        let body = self.get("geocode/json", query).await?;
        response::parse_geocode(&body)
    }

    async fn get(
        &self,
        endpoint: &str,
        mut query: Vec<(&'static str, String)>,
    ) -> Result<serde_json::Value, GoogleError> {
        if let Some(language) = &self.config.language {
            query.push(("language", language.clone()));
        }
        query.push(("key", self.api_key.clone()));

        let url = format!("{}/{endpoint}", self.config.base_url.trim_end_matches('/'));
        let resp = self.client.get(&url).query(&query).send().await?;

        if !resp.status().is_success() {
            return Err(GoogleError::Parse {
                message: format!("{endpoint} returned HTTP {}", resp.status()),
            });
        }

        Ok(resp.json().await?)
    }
}

/// Appends location bias parameters.
///
/// Autocomplete takes `bounds` as a `locationbias` rectangle and falls back
/// to `location`/`radius`; the geocoder takes `bounds` directly.
fn push_bias(query: &mut Vec<(&'static str, String)>, bias: &LocationBias, autocomplete: bool) {
    match (&bias.bounds, autocomplete) {
        (Some(bounds), true) => {
            query.push(("locationbias", format!("rectangle:{}", format_bounds(bounds))));
        }
        (Some(bounds), false) => query.push(("bounds", format_bounds(bounds))),
        (None, true) => {
            if let Some(location) = bias.location {
                query.push(("location", format!("{},{}", location.lat, location.lng)));
                if let Some(radius) = bias.radius {
                    query.push(("radius", radius.to_string()));
                }
            }
        }
        (None, false) => {}
    }

    if !bias.country.is_empty() {
        let components = bias
            .country
            .iter()
            .map(|code| format!("country:{code}"))
            .collect::<Vec<_>>()
            .join("|");
        query.push(("components", components));
    }
}

fn format_bounds(bounds: &LatLngBounds) -> String {
    format!(
        "{},{}|{},{}",
        bounds.south_west.lat, bounds.south_west.lng, bounds.north_east.lat, bounds.north_east.lng
    )
}

#[async_trait::async_trait]
impl AutocompleteProvider for GooglePlacesClient {
    async fn get_place_predictions(&self, request: &AutocompleteRequest) -> Vec<RawPrediction> {
        match self.autocomplete(request).await {
            Ok(predictions) => predictions,
            Err(e) => {
                log::warn!("Autocomplete for {:?} failed: {e}", request.input);
                Vec::new()
            }
        }
    }
}

#[async_trait::async_trait]
impl PlaceDetailsProvider for GooglePlacesClient {
    async fn get_details(&self, request: &PlaceDetailsRequest) -> DetailsResponse {
        self.details(request).await.unwrap_or_else(|e| {
            log::warn!("Place details for {} failed: {e}", request.place_id);
            DetailsResponse {
                result: None,
                status: ServiceStatus::UnknownError,
            }
        })
    }
}

#[async_trait::async_trait]
impl GeocodeProvider for GooglePlacesClient {
    async fn geocode(&self, request: &GeocodeRequest) -> GeocodeResponse {
        self.geocode_address(request).await.unwrap_or_else(|e| {
            log::warn!("Geocoding {:?} failed: {e}", request.address);
            GeocodeResponse {
                results: Vec::new(),
                status: ServiceStatus::UnknownError,
            }
        })
    }
}

impl SessionTokenFactory for GooglePlacesClient {
    fn new_session_token(&self) -> SessionToken {
        SessionToken::new(uuid::Uuid::new_v4().to_string())
    }
}
