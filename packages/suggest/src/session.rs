//! Suggest session state machine.
//!
//! [`SuggestSession`] owns everything that changes over the life of one
//! autocomplete session: the session token, the loading flag, the published
//! suggestion list and the pending geocode count. It never talks to a
//! provider itself. Each operation is split into a `begin_*` step that
//! returns the request to send and a `finish_*` step that consumes the
//! response, so the caller decides how and when requests run.
//!
//! Overlapping searches are not cancelled. Every prediction response clears
//! the loading flag and replaces the list, so the last response to arrive
//! wins unless [`SuggestConfig::ignore_stale_responses`] is set.

use geo_suggest_models::{
    AutocompleteRequest, DetailsResponse, GeocodeRequest, GeocodeResponse, GeocodedSuggestion,
    NormalizedSuggestion, PlaceDetailsRequest, RawPrediction, ServiceError, SessionToken,
};

use crate::address::build_geocoded_suggestion;
use crate::config::SuggestConfig;
use crate::provider::SessionTokenFactory;
use crate::suggestions::{NormalizeOptions, normalize_suggestions};

/// Coarse session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Nothing in flight.
    Idle,
    /// At least one prediction request is in flight.
    SearchPending,
    /// A details or geocode request is in flight.
    GeocodePending,
}

/// Identifies one issued prediction request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct SearchTicket(u64);

/// Request to send for a selected suggestion.
#[derive(Debug, Clone, PartialEq)]
pub enum GeocodeCall {
    /// Resolve by place identifier.
    Details(PlaceDetailsRequest),
    /// Resolve by free text.
    Geocode(GeocodeRequest),
}

/// Result of finishing a geocode.
#[derive(Debug, Clone, PartialEq)]
pub enum GeocodeOutcome {
    /// The suggestion was resolved.
    Geocoded(Box<GeocodedSuggestion>),
    /// The provider reported a failure that must be published.
    ServiceError(ServiceError),
    /// The response was discarded without notifying the caller.
    Dropped,
}

/// State of one autocomplete session.
#[derive(Debug)]
pub struct SuggestSession {
    config: SuggestConfig,
    options: NormalizeOptions,
    token: Option<SessionToken>,
    loading: bool,
    pending_searches: usize,
    pending_geocodes: usize,
    suggestions: Vec<NormalizedSuggestion>,
    latest_search: u64,
}

impl SuggestSession {
    /// Creates an idle session.
    #[must_use]
    pub fn new(config: SuggestConfig, options: NormalizeOptions) -> Self {
        Self {
            config,
            options,
            token: None,
            loading: false,
            pending_searches: 0,
            pending_geocodes: 0,
            suggestions: Vec::new(),
            latest_search: 0,
        }
    }

    /// Session configuration.
    #[must_use]
    pub const fn config(&self) -> &SuggestConfig {
        &self.config
    }

    /// Current coarse state.
    #[must_use]
    pub const fn state(&self) -> SessionState {
        if self.pending_geocodes > 0 {
            SessionState::GeocodePending
        } else if self.loading {
            SessionState::SearchPending
        } else {
            SessionState::Idle
        }
    }

    /// Whether a prediction request is pending.
    #[must_use]
    pub const fn loading(&self) -> bool {
        self.loading
    }

    /// Currently published suggestions.
    #[must_use]
    pub fn suggestions(&self) -> &[NormalizedSuggestion] {
        &self.suggestions
    }

    /// Current session token, if one was minted.
    #[must_use]
    pub const fn session_token(&self) -> Option<&SessionToken> {
        self.token.as_ref()
    }

    /// Empties the suggestion list and returns the (empty) list to publish.
    ///
    /// Clearing supersedes every search in flight. With
    /// [`SuggestConfig::ignore_stale_responses`] their responses are
    /// discarded, so the session is no longer loading.
    pub fn clear_suggestions(&mut self) -> Vec<NormalizedSuggestion> {
        self.latest_search += 1;
        if self.config.ignore_stale_responses {
            self.loading = false;
        }
        self.suggestions.clear();
        Vec::new()
    }

    /// Prepares a prediction request for `search`.
    ///
    /// Returns `None` without changing state when the search is empty or
    /// shorter than the configured minimum length.
    pub fn begin_search<F>(
        &mut self,
        search: &str,
        tokens: &F,
    ) -> Option<(SearchTicket, AutocompleteRequest)>
    where
        F: SessionTokenFactory + ?Sized,
    {
        if search.is_empty() {
            return None;
        }

        let min_length = self.config.min_length;
        if min_length > 0 && search.chars().count() < min_length {
            log::trace!("Skipping search shorter than {min_length} characters");
            return None;
        }

        self.latest_search += 1;
        self.pending_searches += 1;
        self.loading = true;

        let request = AutocompleteRequest {
            input: search.to_string(),
            session_token: self.current_token(tokens),
            bias: self.config.location_bias(),
        };

        Some((SearchTicket(self.latest_search), request))
    }

    /// Consumes a prediction response.
    ///
    /// Returns the suggestion list to publish, or `None` when the response
    /// is stale and stale responses are ignored.
    pub fn finish_search(
        &mut self,
        ticket: SearchTicket,
        raw: &[RawPrediction],
    ) -> Option<Vec<NormalizedSuggestion>> {
        self.pending_searches = self.pending_searches.saturating_sub(1);

        if self.config.ignore_stale_responses && ticket.0 != self.latest_search {
            log::debug!(
                "Ignoring stale predictions for search #{} (latest is #{})",
                ticket.0,
                self.latest_search
            );
            return None;
        }

        self.loading = false;
        self.suggestions = normalize_suggestions(raw, &self.options);
        Some(self.suggestions.clone())
    }

    /// Abandons a prediction request whose response will never arrive.
    ///
    /// Loading stops once no other search is in flight, or right away when
    /// `ticket` is the latest search and stale responses are ignored.
    pub fn cancel_search(&mut self, ticket: SearchTicket) {
        self.pending_searches = self.pending_searches.saturating_sub(1);

        let latest = ticket.0 == self.latest_search;
        if self.pending_searches == 0 || (latest && self.config.ignore_stale_responses) {
            self.loading = false;
        }
        log::debug!("Search #{} cancelled", ticket.0);
    }

    /// Abandons a details or geocode request whose response will never
    /// arrive.
    pub fn cancel_geocode(&mut self) {
        self.pending_geocodes = self.pending_geocodes.saturating_sub(1);
        log::debug!("Geocode cancelled");
    }

    /// Prepares the request resolving `suggestion`.
    ///
    /// Suggestions with a place identifier are resolved through place
    /// details; fixtures and suggestions without one are geocoded from
    /// their text.
    pub fn begin_geocode<F>(&mut self, suggestion: &NormalizedSuggestion, tokens: &F) -> GeocodeCall
    where
        F: SessionTokenFactory + ?Sized,
    {
        self.pending_geocodes += 1;

        match suggestion.place_id.as_deref() {
            Some(place_id) if !place_id.is_empty() && !suggestion.is_fixture => {
                GeocodeCall::Details(PlaceDetailsRequest {
                    place_id: place_id.to_string(),
                    session_token: self.current_token(tokens),
                    fields: self.config.place_detail_fields.clone(),
                })
            }
            _ => GeocodeCall::Geocode(GeocodeRequest {
                address: suggestion.geocode_text().to_string(),
                bias: self.config.location_bias(),
            }),
        }
    }

    /// Consumes a place-details response.
    ///
    /// On success the session token is rotated; any other status is
    /// published as a service error.
    pub fn finish_details<F>(
        &mut self,
        suggestion: NormalizedSuggestion,
        response: DetailsResponse,
        tokens: &F,
    ) -> GeocodeOutcome
    where
        F: SessionTokenFactory + ?Sized,
    {
        self.pending_geocodes = self.pending_geocodes.saturating_sub(1);

        if !response.status.is_ok() {
            return GeocodeOutcome::ServiceError(ServiceError {
                status: response.status,
            });
        }

        let Some(result) = response.result else {
            log::warn!("Place details returned OK without a result; dropping");
            return GeocodeOutcome::Dropped;
        };

        self.rotate_token(tokens);
        GeocodeOutcome::Geocoded(Box::new(build_geocoded_suggestion(suggestion, result)))
    }

    /// Consumes a free-text geocode response.
    ///
    /// The first result wins. Non-OK statuses are dropped with a warning
    /// unlike the details path, unless
    /// [`SuggestConfig::surface_geocode_errors`] is set.
    // TODO: decide with consumers whether geocode failures should always be
    // published like details failures, then remove `surface_geocode_errors`.
    pub fn finish_geocode<F>(
        &mut self,
        suggestion: NormalizedSuggestion,
        response: GeocodeResponse,
        tokens: &F,
    ) -> GeocodeOutcome
    where
        F: SessionTokenFactory + ?Sized,
    {
        self.pending_geocodes = self.pending_geocodes.saturating_sub(1);

        if !response.status.is_ok() {
            if self.config.surface_geocode_errors {
                return GeocodeOutcome::ServiceError(ServiceError {
                    status: response.status,
                });
            }
            log::warn!(
                "Geocoding {:?} failed with status {}; not publishing",
                suggestion.geocode_text(),
                response.status
            );
            return GeocodeOutcome::Dropped;
        }

        let Some(result) = response.results.into_iter().next() else {
            log::warn!("Geocoder returned OK without results; dropping");
            return GeocodeOutcome::Dropped;
        };

        self.rotate_token(tokens);
        GeocodeOutcome::Geocoded(Box::new(build_geocoded_suggestion(suggestion, result)))
    }

    fn current_token<F>(&mut self, tokens: &F) -> SessionToken
    where
        F: SessionTokenFactory + ?Sized,
    {
        self.token
            .get_or_insert_with(|| tokens.new_session_token())
            .clone()
    }

    fn rotate_token<F>(&mut self, tokens: &F)
    where
        F: SessionTokenFactory + ?Sized,
    {
        self.token = Some(tokens.new_session_token());
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use geo_suggest_models::{RawGeocodeResult, ServiceStatus};

    use super::*;

    #[derive(Default)]
    struct CountingTokens(AtomicUsize);

    impl SessionTokenFactory for CountingTokens {
        fn new_session_token(&self) -> SessionToken {
            let n = self.0.fetch_add(1, Ordering::SeqCst) + 1;
            SessionToken::new(format!("token-{n}"))
        }
    }

    fn session() -> SuggestSession {
        SuggestSession::new(SuggestConfig::default(), NormalizeOptions::default())
    }

    fn place(id: &str) -> NormalizedSuggestion {
        NormalizedSuggestion {
            place_id: Some(id.to_string()),
            description: "400 Broadway".to_string(),
            ..NormalizedSuggestion::default()
        }
    }

    fn prediction(place_id: &str) -> RawPrediction {
        RawPrediction {
            place_id: place_id.to_string(),
            description: place_id.to_uppercase(),
            ..RawPrediction::default()
        }
    }

    fn ok_details() -> DetailsResponse {
        DetailsResponse {
            result: Some(RawGeocodeResult {
                name: Some("400 Broadway".to_string()),
                ..RawGeocodeResult::default()
            }),
            status: ServiceStatus::Ok,
        }
    }

    #[test]
    fn short_search_is_skipped() {
        let tokens = CountingTokens::default();
        let mut session = session();

        assert!(session.begin_search("a", &tokens).is_none());
        assert_eq!(session.state(), SessionState::Idle);
        assert!(session.session_token().is_none());
    }

    #[test]
    fn zero_min_length_disables_check() {
        let tokens = CountingTokens::default();
        let mut config = SuggestConfig::default();
        config.min_length = 0;
        let mut session = SuggestSession::new(config, NormalizeOptions::default());

        assert!(session.begin_search("a", &tokens).is_some());
    }

    #[test]
    fn min_length_counts_characters() {
        let tokens = CountingTokens::default();
        let mut session = session();

        assert!(session.begin_search("été", &tokens).is_some());
    }

    #[test]
    fn search_sets_loading_until_response() {
        let tokens = CountingTokens::default();
        let mut session = session();

        let (ticket, request) = session.begin_search("abc", &tokens).unwrap();
        assert_eq!(request.input, "abc");
        assert_eq!(request.session_token.as_str(), "token-1");
        assert!(session.loading());
        assert_eq!(session.state(), SessionState::SearchPending);

        let published = session
            .finish_search(ticket, &[prediction("a"), prediction("b")])
            .unwrap();
        assert!(!session.loading());
        assert_eq!(session.state(), SessionState::Idle);
        assert_eq!(published.len(), 2);
        assert_eq!(session.suggestions(), published.as_slice());
    }

    #[test]
    fn token_is_reused_across_searches() {
        let tokens = CountingTokens::default();
        let mut session = session();

        let (_, first) = session.begin_search("abc", &tokens).unwrap();
        let (_, second) = session.begin_search("abcd", &tokens).unwrap();
        assert_eq!(first.session_token, second.session_token);
    }

    #[test]
    fn last_response_wins_by_default() {
        let tokens = CountingTokens::default();
        let mut session = session();

        let (older, _) = session.begin_search("abc", &tokens).unwrap();
        let (newer, _) = session.begin_search("abcd", &tokens).unwrap();

        session.finish_search(newer, &[prediction("new")]).unwrap();
        session.finish_search(older, &[prediction("old")]).unwrap();

        assert_eq!(session.suggestions()[0].place_id.as_deref(), Some("old"));
    }

    #[test]
    fn stale_responses_can_be_ignored() {
        let tokens = CountingTokens::default();
        let mut config = SuggestConfig::default();
        config.ignore_stale_responses = true;
        let mut session = SuggestSession::new(config, NormalizeOptions::default());

        let (older, _) = session.begin_search("abc", &tokens).unwrap();
        let (newer, _) = session.begin_search("abcd", &tokens).unwrap();

        assert!(session.finish_search(older, &[prediction("old")]).is_none());
        assert!(session.loading());
        session.finish_search(newer, &[prediction("new")]).unwrap();

        assert!(!session.loading());
        assert_eq!(session.suggestions()[0].place_id.as_deref(), Some("new"));
    }

    #[test]
    fn clear_empties_list() {
        let tokens = CountingTokens::default();
        let mut session = session();
        let (ticket, _) = session.begin_search("abc", &tokens).unwrap();
        session.finish_search(ticket, &[prediction("a")]);

        assert!(session.clear_suggestions().is_empty());
        assert!(session.suggestions().is_empty());
    }

    #[test]
    fn clear_supersedes_search_in_flight_when_ignoring_stale() {
        let tokens = CountingTokens::default();
        let mut config = SuggestConfig::default();
        config.ignore_stale_responses = true;
        let mut session = SuggestSession::new(config, NormalizeOptions::default());

        let (ticket, _) = session.begin_search("abc", &tokens).unwrap();
        session.clear_suggestions();
        assert!(!session.loading());
        assert_eq!(session.state(), SessionState::Idle);

        assert!(session.finish_search(ticket, &[prediction("a")]).is_none());
        assert!(session.suggestions().is_empty());
    }

    #[test]
    fn clear_keeps_last_response_wins_by_default() {
        let tokens = CountingTokens::default();
        let mut session = session();

        let (ticket, _) = session.begin_search("abc", &tokens).unwrap();
        session.clear_suggestions();
        assert!(session.loading());

        assert!(session.finish_search(ticket, &[prediction("a")]).is_some());
        assert!(!session.loading());
        assert_eq!(session.suggestions().len(), 1);
    }

    #[test]
    fn cancelled_search_stops_loading() {
        let tokens = CountingTokens::default();
        let mut session = session();

        let (ticket, _) = session.begin_search("abc", &tokens).unwrap();
        session.cancel_search(ticket);

        assert!(!session.loading());
        assert_eq!(session.state(), SessionState::Idle);
    }

    #[test]
    fn cancelled_search_keeps_loading_while_another_is_in_flight() {
        let tokens = CountingTokens::default();
        let mut session = session();

        let (older, _) = session.begin_search("abc", &tokens).unwrap();
        let (newer, _) = session.begin_search("abcd", &tokens).unwrap();
        session.cancel_search(newer);
        assert!(session.loading());

        session.finish_search(older, &[prediction("old")]).unwrap();
        assert!(!session.loading());
    }

    #[test]
    fn cancelled_geocode_returns_to_idle() {
        let tokens = CountingTokens::default();
        let mut session = session();

        session.begin_geocode(&NormalizedSuggestion::fixture("Pike Place"), &tokens);
        assert_eq!(session.state(), SessionState::GeocodePending);

        session.cancel_geocode();
        assert_eq!(session.state(), SessionState::Idle);
    }

    #[test]
    fn place_suggestion_uses_details_with_current_token() {
        let tokens = CountingTokens::default();
        let mut config = SuggestConfig::default();
        config.place_detail_fields = Some(vec!["adr_address".to_string()]);
        let mut session = SuggestSession::new(config, NormalizeOptions::default());
        session.begin_search("abc", &tokens);

        let call = session.begin_geocode(&place("p1"), &tokens);
        assert_eq!(session.state(), SessionState::GeocodePending);
        let GeocodeCall::Details(request) = call else {
            panic!("expected details call");
        };
        assert_eq!(request.place_id, "p1");
        assert_eq!(request.session_token.as_str(), "token-1");
        assert_eq!(request.fields, Some(vec!["adr_address".to_string()]));
    }

    #[test]
    fn successful_details_rotates_token() {
        let tokens = CountingTokens::default();
        let mut session = session();
        let suggestion = place("p1");
        session.begin_geocode(&suggestion, &tokens);

        let outcome = session.finish_details(suggestion, ok_details(), &tokens);

        assert!(matches!(outcome, GeocodeOutcome::Geocoded(_)));
        assert_eq!(session.session_token().unwrap().as_str(), "token-2");
        assert_eq!(session.state(), SessionState::Idle);

        let GeocodeCall::Details(next) = session.begin_geocode(&place("p2"), &tokens) else {
            panic!("expected details call");
        };
        assert_eq!(next.session_token.as_str(), "token-2");
    }

    #[test]
    fn failed_details_publishes_error_and_keeps_token() {
        let tokens = CountingTokens::default();
        let mut session = session();
        let suggestion = place("p1");
        session.begin_geocode(&suggestion, &tokens);

        let outcome = session.finish_details(
            suggestion,
            DetailsResponse {
                result: None,
                status: ServiceStatus::NotFound,
            },
            &tokens,
        );

        assert_eq!(
            outcome,
            GeocodeOutcome::ServiceError(ServiceError {
                status: ServiceStatus::NotFound
            })
        );
        assert_eq!(session.session_token().unwrap().as_str(), "token-1");
    }

    #[test]
    fn fixture_is_geocoded_by_text() {
        let tokens = CountingTokens::default();
        let mut session = session();
        let mut fixture = NormalizedSuggestion::fixture("Home, 1 Main St");
        fixture.place_id = Some("ignored".to_string());

        let call = session.begin_geocode(&fixture, &tokens);

        let GeocodeCall::Geocode(request) = call else {
            panic!("expected geocode call");
        };
        assert_eq!(request.address, "Home, 1 Main St");
        assert!(session.session_token().is_none());
    }

    #[test]
    fn failed_geocode_is_dropped_by_default() {
        let tokens = CountingTokens::default();
        let mut session = session();
        let fixture = NormalizedSuggestion::fixture("nowhere");
        session.begin_geocode(&fixture, &tokens);

        let outcome = session.finish_geocode(
            fixture,
            GeocodeResponse {
                results: Vec::new(),
                status: ServiceStatus::ZeroResults,
            },
            &tokens,
        );

        assert_eq!(outcome, GeocodeOutcome::Dropped);
        assert_eq!(session.state(), SessionState::Idle);
    }

    #[test]
    fn failed_geocode_can_be_surfaced() {
        let tokens = CountingTokens::default();
        let mut config = SuggestConfig::default();
        config.surface_geocode_errors = true;
        let mut session = SuggestSession::new(config, NormalizeOptions::default());
        let fixture = NormalizedSuggestion::fixture("nowhere");

        let outcome = session.finish_geocode(
            fixture,
            GeocodeResponse {
                results: Vec::new(),
                status: ServiceStatus::ZeroResults,
            },
            &tokens,
        );

        assert_eq!(
            outcome,
            GeocodeOutcome::ServiceError(ServiceError {
                status: ServiceStatus::ZeroResults
            })
        );
    }

    #[test]
    fn successful_geocode_uses_first_result() {
        let tokens = CountingTokens::default();
        let mut session = session();
        let fixture = NormalizedSuggestion::fixture("Pike Place");

        let outcome = session.finish_geocode(
            fixture,
            GeocodeResponse {
                results: vec![
                    RawGeocodeResult {
                        name: Some("Pike Place".to_string()),
                        ..RawGeocodeResult::default()
                    },
                    RawGeocodeResult {
                        name: Some("Pike Street".to_string()),
                        ..RawGeocodeResult::default()
                    },
                ],
                status: ServiceStatus::Ok,
            },
            &tokens,
        );

        let GeocodeOutcome::Geocoded(geocoded) = outcome else {
            panic!("expected geocoded outcome");
        };
        assert_eq!(
            geocoded.normalized_address.street_address1.as_deref(),
            Some("Pike Place")
        );
        assert!(session.session_token().is_some());
    }
}
