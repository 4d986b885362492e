//! Session configuration.
//!
//! Configuration is read from TOML. A default file is embedded at compile
//! time (`config/default.toml`); callers may load their own with
//! [`SuggestConfig::load`] or [`SuggestConfig::from_toml_str`]. Missing keys
//! take the embedded defaults' values.

use std::path::Path;

use geo_suggest_models::{LatLng, LatLngBounds, LocationBias};
use serde::{Deserialize, Serialize};

use crate::SuggestError;

const DEFAULT_CONFIG_TOML: &str = include_str!("../config/default.toml");

/// Country restriction given as a single code or a list of codes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CountryRestriction {
    /// One ISO 3166-1 alpha-2 code (e.g. `"es"`).
    One(String),
    /// Several codes (e.g. `["it", "fr"]`).
    Many(Vec<String>),
}

impl CountryRestriction {
    /// Flattens the restriction into a list of codes.
    #[must_use]
    pub fn codes(&self) -> Vec<String> {
        match self {
            Self::One(code) => vec![code.clone()],
            Self::Many(codes) => codes.clone(),
        }
    }
}

/// Options for a suggest session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuggestConfig {
    /// Minimum search length before predictions are requested. `0`
    /// disables the check.
    #[serde(default = "default_min_length")]
    pub min_length: usize,
    /// Delay before a search is sent; a newer search within the window
    /// replaces it. `0` disables debouncing.
    #[serde(default)]
    pub debounce_ms: u64,
    /// Point around which results are biased.
    #[serde(default)]
    pub location: Option<LatLng>,
    /// Radius in meters around `location`. `0` leaves it unset.
    #[serde(default)]
    pub radius: f64,
    /// Viewport bias; `location` and `radius` are ignored by the provider
    /// when set.
    #[serde(default)]
    pub bounds: Option<LatLngBounds>,
    /// Country restriction.
    #[serde(default)]
    pub country: Option<CountryRestriction>,
    /// Fields requested on place-details calls; all fields when unset.
    #[serde(default)]
    pub place_detail_fields: Option<Vec<String>>,
    /// Discards prediction responses older than the latest search or
    /// clear.
    #[serde(default)]
    pub ignore_stale_responses: bool,
    /// Publishes non-OK free-text geocode statuses as service errors.
    #[serde(default)]
    pub surface_geocode_errors: bool,
}

const fn default_min_length() -> usize {
    3
}

impl SuggestConfig {
    /// Parses a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`SuggestError::Config`] if the document is not valid TOML
    /// or does not match the expected shape.
    pub fn from_toml_str(toml_str: &str) -> Result<Self, SuggestError> {
        toml::de::from_str(toml_str).map_err(|e| SuggestError::Config {
            message: e.to_string(),
        })
    }

    /// Reads and parses a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`SuggestError::Config`] if the file cannot be read or
    /// parsed.
    pub fn load(path: &Path) -> Result<Self, SuggestError> {
        let contents = std::fs::read_to_string(path).map_err(|e| SuggestError::Config {
            message: format!("Failed to read {}: {e}", path.display()),
        })?;
        Self::from_toml_str(&contents)
    }

    /// Returns the configuration embedded in the binary.
    ///
    /// # Panics
    ///
    /// Panics if the embedded TOML is malformed.
    #[must_use]
    pub fn embedded() -> Self {
        Self::from_toml_str(DEFAULT_CONFIG_TOML)
            .unwrap_or_else(|e| panic!("Failed to parse embedded default config: {e}"))
    }

    /// Location parameters sent with autocomplete and geocode requests.
    #[must_use]
    pub fn location_bias(&self) -> LocationBias {
        LocationBias {
            location: self.location,
            radius: (self.radius > 0.0).then_some(self.radius),
            bounds: self.bounds,
            country: self
                .country
                .as_ref()
                .map(CountryRestriction::codes)
                .unwrap_or_default(),
        }
    }
}

impl Default for SuggestConfig {
    fn default() -> Self {
        Self::embedded()
    }
}
