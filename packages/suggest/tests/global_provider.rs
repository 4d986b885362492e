//! Process-wide provider registration.
//!
//! Lives in its own test binary so the global slot starts empty.

use std::sync::Arc;

use geo_suggest::provider::{
    AutocompleteProvider, GeocodeProvider, PlaceDetailsProvider, SessionTokenFactory,
    global_provider, register_global_provider,
};
use geo_suggest::{GeoSuggest, SuggestConfig, SuggestError, SuggestEvent};
use geo_suggest_models::{
    AddressComponent, AutocompleteRequest, DetailsResponse, GeocodeRequest, GeocodeResponse,
    NormalizedSuggestion, PlaceDetailsRequest, RawGeocodeResult, RawPrediction, ServiceStatus,
    SessionToken,
};

struct FixedProvider;

#[async_trait::async_trait]
impl AutocompleteProvider for FixedProvider {
    async fn get_place_predictions(&self, request: &AutocompleteRequest) -> Vec<RawPrediction> {
        vec![RawPrediction {
            place_id: "seattle".to_string(),
            description: format!("{}, Seattle, WA, USA", request.input),
            ..RawPrediction::default()
        }]
    }
}

#[async_trait::async_trait]
impl PlaceDetailsProvider for FixedProvider {
    async fn get_details(&self, _request: &PlaceDetailsRequest) -> DetailsResponse {
        DetailsResponse {
            result: Some(RawGeocodeResult {
                name: Some("400 Broadway".to_string()),
                types: vec!["street_address".to_string()],
                address_components: vec![AddressComponent {
                    types: vec!["locality".to_string(), "political".to_string()],
                    long_name: "Seattle".to_string(),
                    short_name: "Seattle".to_string(),
                }],
                ..RawGeocodeResult::default()
            }),
            status: ServiceStatus::Ok,
        }
    }
}

#[async_trait::async_trait]
impl GeocodeProvider for FixedProvider {
    async fn geocode(&self, _request: &GeocodeRequest) -> GeocodeResponse {
        GeocodeResponse {
            results: Vec::new(),
            status: ServiceStatus::ZeroResults,
        }
    }
}

impl SessionTokenFactory for FixedProvider {
    fn new_session_token(&self) -> SessionToken {
        SessionToken::new("fixed")
    }
}

#[tokio::test]
async fn sessions_fall_back_to_the_registered_provider() {
    let (geo, mut events) = GeoSuggest::new(SuggestConfig::default(), None);
    assert!(matches!(
        geo.search("400 Broadway").await,
        Err(SuggestError::NotInitialized)
    ));

    register_global_provider(Arc::new(FixedProvider)).unwrap();
    assert!(global_provider().is_some());

    let suggestions = geo.search("400 Broadway").await.unwrap().unwrap();
    assert_eq!(suggestions.len(), 1);
    assert_eq!(suggestions[0].place_id.as_deref(), Some("seattle"));
    assert!(matches!(events.recv().await, Some(SuggestEvent::Suggestions(_))));

    let geocoded = geo.select(suggestions[0].clone()).await.unwrap().unwrap();
    assert_eq!(
        geocoded.normalized_address.city.as_deref(),
        Some("Seattle")
    );

    let fixture = geo
        .select(NormalizedSuggestion::fixture("Nowhere"))
        .await
        .unwrap();
    assert!(fixture.is_none());

    assert!(matches!(
        register_global_provider(Arc::new(FixedProvider)),
        Err(SuggestError::AlreadyLoaded)
    ));
}
