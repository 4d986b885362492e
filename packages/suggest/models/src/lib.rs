#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Shared types for place suggestions and geocoded addresses.
//!
//! Two families of types live here:
//!
//! - **Raw provider shapes** (`RawPrediction`, `RawGeocodeResult`, ...) that
//!   mirror the Google Places / Geocoding JSON payloads field-for-field in
//!   `snake_case`. Every field is optional on the wire, so all of them
//!   deserialize with defaults.
//! - **Normalized shapes** (`NormalizedSuggestion`, `NormalizedAddress`,
//!   `GeocodedSuggestion`) handed to the host application, serialized in
//!   `camelCase`.
//!
//! This crate contains no normalization logic and no I/O.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// A WGS84 coordinate pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    /// Latitude in degrees.
    pub lat: f64,
    /// Longitude in degrees.
    pub lng: f64,
}

/// A rectangular viewport used to bias results.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LatLngBounds {
    /// South-west corner.
    pub south_west: LatLng,
    /// North-east corner.
    pub north_east: LatLng,
}

/// Range of the prediction description that matched the user input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchedSubstring {
    /// Start offset in characters.
    pub offset: u32,
    /// Length in characters.
    pub length: u32,
}

/// An autocomplete candidate as returned by the provider.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawPrediction {
    /// Provider place identifier.
    #[serde(default)]
    pub place_id: String,
    /// Human-readable description (e.g. "400 Broadway, Seattle, WA, USA").
    #[serde(default)]
    pub description: String,
    /// Ranges of `description` matching the input.
    #[serde(default)]
    pub matched_substrings: Vec<MatchedSubstring>,
    /// Place types (e.g. `"route"`, `"geocode"`).
    #[serde(default)]
    pub types: Vec<String>,
}

/// One entry of a raw result's `address_components` array.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressComponent {
    /// Component types (e.g. `["locality", "political"]`).
    #[serde(default)]
    pub types: Vec<String>,
    /// Full text (e.g. "United States").
    #[serde(default)]
    pub long_name: String,
    /// Abbreviated text (e.g. "US").
    #[serde(default)]
    pub short_name: String,
}

/// Geometry block of a raw result.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Geometry {
    /// Resolved coordinate.
    #[serde(default)]
    pub location: Option<LatLng>,
}

/// A place-details or geocoder result as returned by the provider.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawGeocodeResult {
    /// Structured address components.
    #[serde(default)]
    pub address_components: Vec<AddressComponent>,
    /// Address in the `adr` microformat (HTML spans with class names).
    #[serde(default)]
    pub adr_address: Option<String>,
    /// Single-line formatted address.
    #[serde(default)]
    pub formatted_address: Option<String>,
    /// Place name (a street address for plain addresses, a POI name otherwise).
    #[serde(default)]
    pub name: Option<String>,
    /// Result types (e.g. `["street_address"]`, `["point_of_interest"]`).
    #[serde(default)]
    pub types: Vec<String>,
    /// Location data.
    #[serde(default)]
    pub geometry: Option<Geometry>,
    /// Provider place identifier.
    #[serde(default)]
    pub place_id: Option<String>,
}

impl RawGeocodeResult {
    /// Returns the resolved coordinate, if the result carries one.
    #[must_use]
    pub fn location(&self) -> Option<LatLng> {
        self.geometry.as_ref().and_then(|g| g.location)
    }
}

/// Long and short text of an address component.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentName {
    /// Full text.
    pub long_name: String,
    /// Abbreviated text.
    pub short_name: String,
}

/// Address components keyed by component type.
///
/// A component with several types is reachable under each of them. When two
/// components share a type the later one wins.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AddressComponentMap(BTreeMap<String, ComponentName>);

impl AddressComponentMap {
    /// Registers `name` under `component_type`, replacing any previous entry.
    pub fn insert(&mut self, component_type: impl Into<String>, name: ComponentName) {
        self.0.insert(component_type.into(), name);
    }

    /// Looks up the component registered under `component_type`.
    #[must_use]
    pub fn get(&self, component_type: &str) -> Option<&ComponentName> {
        self.0.get(component_type)
    }

    /// Whether a component is registered under `component_type`.
    #[must_use]
    pub fn contains(&self, component_type: &str) -> bool {
        self.0.contains_key(component_type)
    }

    /// Number of distinct component types.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the map has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over `(type, name)` pairs in type order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &ComponentName)> {
        self.0.iter()
    }
}

/// A suggestion as exposed to the host application.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedSuggestion {
    /// Provider place identifier. Fixtures usually have none.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub place_id: Option<String>,
    /// Display text.
    pub description: String,
    /// First matched range of `description`, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matched_substrings: Option<MatchedSubstring>,
    /// Caller-computed label, empty when no labeler is configured.
    #[serde(default)]
    pub label: String,
    /// Caller-injected entry that is geocoded by text, never by place id.
    #[serde(default)]
    pub is_fixture: bool,
}

impl NormalizedSuggestion {
    /// Builds a caller-supplied fixture suggestion.
    ///
    /// Fixtures bypass the place-details lookup and are geocoded from their
    /// description.
    #[must_use]
    pub fn fixture(description: impl Into<String>) -> Self {
        Self {
            place_id: None,
            description: description.into(),
            matched_substrings: None,
            label: String::new(),
            is_fixture: true,
        }
    }

    /// Text used for free-text geocoding: the description, or the label
    /// when the description is empty.
    #[must_use]
    pub fn geocode_text(&self) -> &str {
        if self.description.is_empty() {
            &self.label
        } else {
            &self.description
        }
    }
}

/// Best-effort postal address decomposition of a result.
///
/// Every field is optional; `None` means the heuristic found nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedAddress {
    /// First street line.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub street_address1: Option<String>,
    /// Second street line (often a place name).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub street_address2: Option<String>,
    /// Region; format depends on the country.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    /// City.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    /// Postal code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
    /// Country name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country_name: Option<String>,
    /// ISO 3166-1 alpha-2 country code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country_iso2: Option<String>,
}

/// A selected suggestion enriched with the resolved place details.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeocodedSuggestion {
    /// The suggestion that was geocoded.
    #[serde(flatten)]
    pub suggestion: NormalizedSuggestion,
    /// Resolved coordinate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<LatLng>,
    /// Postal address decomposition.
    pub normalized_address: NormalizedAddress,
    /// Components keyed by type.
    pub address_component_map: AddressComponentMap,
    /// Same value as `normalized_address.region`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    /// Single-line formatted address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formatted_address: Option<String>,
    /// Place name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Result types.
    #[serde(default)]
    pub types: Vec<String>,
    /// Complete provider result.
    pub raw: RawGeocodeResult,
}

/// Status code reported by the places and geocoding services.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ServiceStatus {
    /// The request succeeded.
    Ok,
    /// The request succeeded but matched nothing.
    ZeroResults,
    /// The referenced place no longer exists.
    NotFound,
    /// Quota exhausted.
    OverQueryLimit,
    /// Daily quota exhausted or billing not enabled.
    OverDailyLimit,
    /// The API key is not allowed to use the service.
    RequestDenied,
    /// A required parameter was missing or malformed.
    InvalidRequest,
    /// Server-side failure; retrying may succeed.
    UnknownError,
    /// Geocoder failed to reach its backend.
    Error,
}

impl ServiceStatus {
    /// Parses a wire status code, mapping anything unrecognized to
    /// [`ServiceStatus::UnknownError`].
    #[must_use]
    pub fn from_code(code: &str) -> Self {
        code.parse().unwrap_or(Self::UnknownError)
    }

    /// Whether this is the success sentinel.
    #[must_use]
    pub const fn is_ok(self) -> bool {
        matches!(self, Self::Ok)
    }
}

/// Error descriptor published when a provider call fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceError {
    /// Status returned by the provider.
    pub status: ServiceStatus,
}

/// Opaque token grouping autocomplete and details calls into one billing
/// session on the provider side.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionToken(String);

impl SessionToken {
    /// Wraps a provider-specific token value.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the token as sent on the wire.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SessionToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Location parameters shared by autocomplete and geocode requests.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LocationBias {
    /// Point around which to bias results.
    #[serde(default)]
    pub location: Option<LatLng>,
    /// Radius in meters around `location`.
    #[serde(default)]
    pub radius: Option<f64>,
    /// Viewport bias. Takes precedence over `location`/`radius`.
    #[serde(default)]
    pub bounds: Option<LatLngBounds>,
    /// ISO 3166-1 alpha-2 country restriction, empty for none.
    #[serde(default)]
    pub country: Vec<String>,
}

/// Request for autocomplete predictions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutocompleteRequest {
    /// User input.
    pub input: String,
    /// Current session token.
    pub session_token: SessionToken,
    /// Location bias.
    #[serde(flatten)]
    pub bias: LocationBias,
}

/// Request for the details of one place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaceDetailsRequest {
    /// Place to resolve.
    pub place_id: String,
    /// Session token of the autocomplete session this lookup closes.
    pub session_token: SessionToken,
    /// Restricts the returned fields; `None` returns everything.
    #[serde(default)]
    pub fields: Option<Vec<String>>,
}

/// Free-text geocoding request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeocodeRequest {
    /// Address text to resolve.
    pub address: String,
    /// Location bias.
    #[serde(flatten)]
    pub bias: LocationBias,
}

/// Response of a place-details call.
#[derive(Debug, Clone, PartialEq)]
pub struct DetailsResponse {
    /// Resolved place, absent on failure.
    pub result: Option<RawGeocodeResult>,
    /// Provider status.
    pub status: ServiceStatus,
}

/// Response of a geocode call.
#[derive(Debug, Clone, PartialEq)]
pub struct GeocodeResponse {
    /// Candidate results, best first.
    pub results: Vec<RawGeocodeResult>,
    /// Provider status.
    pub status: ServiceStatus,
}
