//! Places provider abstraction.
//!
//! A provider answers three kinds of requests (autocomplete, place details,
//! free-text geocode) and mints session tokens. [`PlacesProvider`] is
//! implemented automatically for any type implementing all four traits.

use std::sync::{Arc, OnceLock};

use geo_suggest_models::{
    AutocompleteRequest, DetailsResponse, GeocodeRequest, GeocodeResponse, PlaceDetailsRequest,
    RawPrediction, SessionToken,
};

use crate::SuggestError;

/// Source of autocomplete predictions.
#[async_trait::async_trait]
pub trait AutocompleteProvider: Send + Sync {
    /// Returns predictions for a partial input.
    ///
    /// There is no error channel: failures surface as an empty list.
    async fn get_place_predictions(&self, request: &AutocompleteRequest) -> Vec<RawPrediction>;
}

/// Source of place details.
#[async_trait::async_trait]
pub trait PlaceDetailsProvider: Send + Sync {
    /// Resolves a place identifier.
    async fn get_details(&self, request: &PlaceDetailsRequest) -> DetailsResponse;
}

/// Free-text geocoder.
#[async_trait::async_trait]
pub trait GeocodeProvider: Send + Sync {
    /// Resolves an address string.
    async fn geocode(&self, request: &GeocodeRequest) -> GeocodeResponse;
}

/// Mints session tokens.
pub trait SessionTokenFactory: Send + Sync {
    /// Returns a fresh token.
    fn new_session_token(&self) -> SessionToken;
}

/// Everything a suggest session needs from a provider.
pub trait PlacesProvider:
    AutocompleteProvider + PlaceDetailsProvider + GeocodeProvider + SessionTokenFactory
{
}

impl<T> PlacesProvider for T where
    T: AutocompleteProvider + PlaceDetailsProvider + GeocodeProvider + SessionTokenFactory
{
}

static GLOBAL_PROVIDER: OnceLock<Arc<dyn PlacesProvider>> = OnceLock::new();

/// Registers the process-wide provider used by sessions constructed
/// without one.
///
/// # Errors
///
/// Returns [`SuggestError::AlreadyLoaded`] if a provider was already
/// registered.
pub fn register_global_provider(provider: Arc<dyn PlacesProvider>) -> Result<(), SuggestError> {
    GLOBAL_PROVIDER
        .set(provider)
        .map_err(|_| SuggestError::AlreadyLoaded)?;
    log::debug!("Registered global places provider");
    Ok(())
}

/// Returns the process-wide provider, if one was registered.
#[must_use]
pub fn global_provider() -> Option<Arc<dyn PlacesProvider>> {
    GLOBAL_PROVIDER.get().cloned()
}
