//! Async driver running a [`SuggestSession`] against a places provider.
//!
//! [`GeoSuggest`] is the host-facing entry point. It acquires the provider
//! lazily, applies the optional debounce, performs the provider calls and
//! publishes every outcome on an unbounded [`SuggestEvent`] channel. The
//! session lock is never held across a provider call, so concurrent
//! searches overlap exactly as the session's last-response-wins rules
//! describe.
//!
//! Dropping a `search` or `select` future while its provider call is in
//! flight cancels the request on the session, so a timed-out or aborted
//! call never leaves the session loading.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex as StdMutex, MutexGuard};
use std::time::Duration;

use geo_suggest_models::{GeocodedSuggestion, NormalizedSuggestion};
use tokio::sync::{Mutex, mpsc};

use crate::config::SuggestConfig;
use crate::provider::{
    self, AutocompleteProvider, GeocodeProvider, PlaceDetailsProvider, PlacesProvider,
};
use crate::session::{GeocodeCall, GeocodeOutcome, SearchTicket, SessionState, SuggestSession};
use crate::suggestions::NormalizeOptions;
use crate::{SessionSnapshot, SuggestError, SuggestEvent};

/// Suggest session bound to a provider and an event channel.
pub struct GeoSuggest {
    provider: Mutex<Option<Arc<dyn PlacesProvider>>>,
    session: StdMutex<SuggestSession>,
    debounce: Duration,
    search_generation: AtomicU64,
    events: mpsc::UnboundedSender<SuggestEvent>,
}

impl std::fmt::Debug for GeoSuggest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeoSuggest")
            .field("debounce", &self.debounce)
            .finish_non_exhaustive()
    }
}

impl GeoSuggest {
    /// Creates a session.
    ///
    /// When `provider` is `None` the process-wide provider registered with
    /// [`provider::register_global_provider`] is used on first use.
    #[must_use]
    pub fn new(
        config: SuggestConfig,
        provider: Option<Arc<dyn PlacesProvider>>,
    ) -> (Self, mpsc::UnboundedReceiver<SuggestEvent>) {
        Self::with_options(config, NormalizeOptions::default(), provider)
    }

    /// Creates a session with caller hooks for filtering and labeling
    /// predictions.
    #[must_use]
    pub fn with_options(
        config: SuggestConfig,
        options: NormalizeOptions,
        provider: Option<Arc<dyn PlacesProvider>>,
    ) -> (Self, mpsc::UnboundedReceiver<SuggestEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        let debounce = Duration::from_millis(config.debounce_ms);

        let geo = Self {
            provider: Mutex::new(provider),
            session: StdMutex::new(SuggestSession::new(config, options)),
            debounce,
            search_generation: AtomicU64::new(0),
            events,
        };

        (geo, rx)
    }

    /// Returns the render-time state.
    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        let session = self.session();
        SessionSnapshot {
            loading: session.loading(),
            suggestions: session.suggestions().to_vec(),
        }
    }

    /// Returns the coarse session state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.session().state()
    }

    /// Handles a change of the search text.
    ///
    /// Returns the published suggestion list, or `None` when nothing was
    /// published (search too short, superseded during debounce, or a stale
    /// response that was ignored).
    ///
    /// # Errors
    ///
    /// Returns [`SuggestError::NotInitialized`] if no provider is available.
    pub async fn search(
        &self,
        text: &str,
    ) -> Result<Option<Vec<NormalizedSuggestion>>, SuggestError> {
        if !self.debounce.is_zero() {
            let generation = self.search_generation.fetch_add(1, Ordering::SeqCst) + 1;
            tokio::time::sleep(self.debounce).await;
            if self.search_generation.load(Ordering::SeqCst) != generation {
                log::trace!("Search {text:?} superseded during debounce");
                return Ok(None);
            }
        }

        if text.is_empty() {
            let cleared = self.session().clear_suggestions();
            self.emit(SuggestEvent::Suggestions(cleared.clone()));
            return Ok(Some(cleared));
        }

        let provider = self.acquire_provider().await?;

        let begun = self.session().begin_search(text, &*provider);
        let Some((ticket, request)) = begun else {
            return Ok(None);
        };
        let mut pending = PendingCall::new(&self.session, Pending::Search(ticket));

        log::debug!("Requesting predictions for {:?}", request.input);
        let raw = provider.get_place_predictions(&request).await;

        pending.complete();
        let published = self.session().finish_search(ticket, &raw);
        if let Some(suggestions) = &published {
            self.emit(SuggestEvent::Suggestions(suggestions.clone()));
        }

        Ok(published)
    }

    /// Resolves a selected suggestion.
    ///
    /// Returns the geocoded suggestion, or `None` when the response was
    /// dropped.
    ///
    /// # Errors
    ///
    /// Returns [`SuggestError::NotInitialized`] if no provider is available
    /// and [`SuggestError::ProviderStatus`] if the provider reported a
    /// failure (the failure is also published as an event).
    pub async fn select(
        &self,
        suggestion: NormalizedSuggestion,
    ) -> Result<Option<GeocodedSuggestion>, SuggestError> {
        let provider = self.acquire_provider().await?;

        let call = self.session().begin_geocode(&suggestion, &*provider);
        let mut pending = PendingCall::new(&self.session, Pending::Geocode);

        let outcome = match call {
            GeocodeCall::Details(request) => {
                log::debug!("Requesting details for place {}", request.place_id);
                let response = provider.get_details(&request).await;
                pending.complete();
                self.session().finish_details(suggestion, response, &*provider)
            }
            GeocodeCall::Geocode(request) => {
                log::debug!("Geocoding {:?}", request.address);
                let response = provider.geocode(&request).await;
                pending.complete();
                self.session().finish_geocode(suggestion, response, &*provider)
            }
        };

        match outcome {
            GeocodeOutcome::Geocoded(geocoded) => {
                self.emit(SuggestEvent::Geocoded(geocoded.clone()));
                Ok(Some(*geocoded))
            }
            GeocodeOutcome::ServiceError(error) => {
                log::warn!("Places service error: {}", error.status);
                self.emit(SuggestEvent::ServiceError(error));
                Err(SuggestError::ProviderStatus {
                    status: error.status,
                })
            }
            GeocodeOutcome::Dropped => Ok(None),
        }
    }

    async fn acquire_provider(&self) -> Result<Arc<dyn PlacesProvider>, SuggestError> {
        let mut slot = self.provider.lock().await;
        if let Some(provider) = slot.as_ref() {
            return Ok(Arc::clone(provider));
        }

        let Some(provider) = provider::global_provider() else {
            log::warn!("Tried to init GeoSuggest before loading a places provider");
            return Err(SuggestError::NotInitialized);
        };

        log::debug!("Using global places provider");
        *slot = Some(Arc::clone(&provider));
        Ok(provider)
    }

    fn session(&self) -> MutexGuard<'_, SuggestSession> {
        lock_session(&self.session)
    }

    fn emit(&self, event: SuggestEvent) {
        if self.events.send(event).is_err() {
            log::trace!("Suggest event receiver dropped");
        }
    }
}

fn lock_session(session: &StdMutex<SuggestSession>) -> MutexGuard<'_, SuggestSession> {
    session
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
}

/// Provider call in flight on behalf of the session.
#[derive(Debug, Clone, Copy)]
enum Pending {
    Search(SearchTicket),
    Geocode,
}

/// Cancels its call on the session when dropped before [`Self::complete`].
struct PendingCall<'a> {
    session: &'a StdMutex<SuggestSession>,
    pending: Option<Pending>,
}

impl<'a> PendingCall<'a> {
    const fn new(session: &'a StdMutex<SuggestSession>, pending: Pending) -> Self {
        Self {
            session,
            pending: Some(pending),
        }
    }

    /// Marks the response as received; the caller finishes the call itself.
    fn complete(&mut self) {
        self.pending = None;
    }
}

impl Drop for PendingCall<'_> {
    fn drop(&mut self) {
        let Some(pending) = self.pending.take() else {
            return;
        };

        let mut session = lock_session(self.session);
        match pending {
            Pending::Search(ticket) => session.cancel_search(ticket),
            Pending::Geocode => session.cancel_geocode(),
        }
    }
}
