#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Place suggestions and address normalization over a places provider.
//!
//! The pipeline has three pure stages and one stateful one:
//!
//! 1. [`extract`] pulls microformat fields out of `adr_address` HTML.
//! 2. [`suggestions`] reshapes raw autocomplete predictions.
//! 3. [`address`] turns a place result into a postal address.
//! 4. [`session`] tracks the session token, loading flag and suggestion
//!    list, and [`service::GeoSuggest`] drives it against a
//!    [`provider::PlacesProvider`], publishing [`SuggestEvent`]s.
//!
//! [`loader`] builds the script tag that loads the browser-side places
//! library for pages that embed it.

pub mod address;
pub mod config;
pub mod extract;
pub mod loader;
pub mod provider;
pub mod service;
pub mod session;
pub mod suggestions;

use geo_suggest_models::{GeocodedSuggestion, NormalizedSuggestion, ServiceError, ServiceStatus};
use thiserror::Error;

pub use config::SuggestConfig;
pub use service::GeoSuggest;
pub use session::{SessionState, SuggestSession};
pub use suggestions::NormalizeOptions;

/// Notification published to the host application.
#[derive(Debug, Clone, PartialEq)]
pub enum SuggestEvent {
    /// A new suggestion list (possibly empty).
    Suggestions(Vec<NormalizedSuggestion>),
    /// A selected suggestion was resolved.
    Geocoded(Box<GeocodedSuggestion>),
    /// A details or geocode call failed.
    ServiceError(ServiceError),
}

/// Render-time state of a session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionSnapshot {
    /// Whether a prediction request is pending.
    pub loading: bool,
    /// Currently published suggestions.
    pub suggestions: Vec<NormalizedSuggestion>,
}

/// Errors from suggest operations.
#[derive(Debug, Error)]
pub enum SuggestError {
    /// No provider was injected or registered.
    #[error("Tried to use GeoSuggest before a places provider was loaded")]
    NotInitialized,

    /// The provider answered a details/geocode call with a non-OK status.
    #[error("Places service returned status {status}")]
    ProviderStatus {
        /// Status returned by the provider.
        status: ServiceStatus,
    },

    /// The loader was given neither an API key string nor a parameter object.
    #[error("LoadGmaps load error: apiKey should either be a string or an object")]
    MalformedApiKey,

    /// The loader (or the global provider registration) ran more than once.
    #[error("LoadGmaps load error: LoadGmaps loaded multiple times.")]
    AlreadyLoaded,

    /// The page has the maps library without the places library.
    #[error(
        "LoadGmaps load error: Google Maps is already loaded, but does not contain the places API."
    )]
    MissingPlacesLibrary,

    /// Configuration could not be read or parsed.
    #[error("Config error: {message}")]
    Config {
        /// Description of the failure.
        message: String,
    },
}
