//! Address resolution through a place-autocomplete service
//!
//! Suggestions are debounced as the visitor types. A place is only resolved
//! to a coordinate once the visitor commits to a suggestion. Every
//! suggest/resolve sequence shares one session token, which is replaced when
//! the input is cleared or a resolution completes.

pub mod google;
pub mod nominatim;

use crate::config::PlacesConfig;
use crate::constants::search::MIN_DEBOUNCE_MS;
use crate::coord::Coordinate;
use crate::debounce::Debouncer;
use crate::error::{Error, Result};
use crate::geo::LocationFix;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::debug;

/// One autocomplete suggestion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaceSuggestion {
    /// Text shown to the visitor
    pub label: String,

    /// Provider-specific handle passed back to `resolve`
    pub place_ref: String,
}

/// Groups a suggest/resolve sequence for provider billing
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionToken(String);

impl SessionToken {
    /// Mint a fresh random token
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SessionToken {
    fn default() -> Self {
        Self::new()
    }
}

impl From<String> for SessionToken {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Trait for place-autocomplete providers
#[async_trait]
pub trait PlaceBackend: Send + Sync {
    /// Backend name (e.g., "google", "nominatim")
    fn name(&self) -> &'static str;

    /// Suggestions for partially typed text, in provider order
    async fn autocomplete(
        &self,
        input: &str,
        session: &SessionToken,
    ) -> Result<Vec<PlaceSuggestion>>;

    /// Coordinate of a suggested place, or None if the provider has no location for it
    async fn place_location(
        &self,
        place_ref: &str,
        session: &SessionToken,
    ) -> Result<Option<Coordinate>>;
}

/// Debounced, session-tokened front end over a [`PlaceBackend`]
pub struct AddressResolver {
    backend: Arc<dyn PlaceBackend>,
    debouncer: Debouncer,
    session: Mutex<SessionToken>,
}

impl AddressResolver {
    /// Create a resolver; the debounce interval must be at least 150 ms
    pub fn new(backend: Arc<dyn PlaceBackend>, debounce: Duration) -> Result<Self> {
        if debounce < Duration::from_millis(MIN_DEBOUNCE_MS) {
            return Err(Error::InvalidArgument(format!(
                "Autocomplete debounce must be at least {}ms, got {}ms",
                MIN_DEBOUNCE_MS,
                debounce.as_millis()
            )));
        }

        Ok(Self {
            backend,
            debouncer: Debouncer::new(debounce),
            session: Mutex::new(SessionToken::new()),
        })
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Current session token
    pub fn session_token(&self) -> SessionToken {
        match self.session.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Start a new autocomplete session
    pub fn reset_session(&self) {
        let mut guard = match self.session.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard = SessionToken::new();
    }

    /// Debounced suggestions for the text typed so far
    ///
    /// Returns `Ok(None)` when a newer keystroke superseded this call.
    /// Clearing the input cancels any pending lookup and starts a new session.
    pub async fn suggest(&self, text: &str) -> Result<Option<Vec<PlaceSuggestion>>> {
        let text = text.trim();
        if text.is_empty() {
            self.debouncer.cancel();
            self.reset_session();
            return Ok(Some(Vec::new()));
        }

        let session = self.session_token();
        match self
            .debouncer
            .run(|| self.backend.autocomplete(text, &session))
            .await
        {
            Some(result) => result.map(Some),
            None => {
                debug!("Suggestion lookup for {:?} superseded", text);
                Ok(None)
            }
        }
    }

    /// Resolve the suggestion the visitor committed to
    pub async fn resolve(&self, place_ref: &str) -> Result<LocationFix> {
        self.debouncer.cancel();
        let session = self.session_token();
        let result = self.lookup_place(place_ref, &session).await;
        self.reset_session();
        result
    }

    /// Undebounced suggestion lookup under a caller-held session
    pub async fn lookup_suggestions(
        &self,
        text: &str,
        session: &SessionToken,
    ) -> Result<Vec<PlaceSuggestion>> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(Vec::new());
        }
        self.backend.autocomplete(text, session).await
    }

    /// Resolve a place under a caller-held session
    pub async fn lookup_place(&self, place_ref: &str, session: &SessionToken) -> Result<LocationFix> {
        if place_ref.trim().is_empty() {
            return Err(Error::InvalidArgument("Empty place reference".to_string()));
        }

        let coordinate = self
            .backend
            .place_location(place_ref, session)
            .await?
            .ok_or_else(|| Error::NotFound(format!("No location for place {}", place_ref)))?;

        coordinate.validate().map_err(|e| {
            Error::Unavailable(format!("Place service returned an invalid location: {}", e))
        })?;

        debug!("Resolved place {} to {}", place_ref, coordinate);
        Ok(LocationFix::precise(coordinate))
    }
}

/// Build the configured place backend
pub fn get_place_backend(config: &PlacesConfig) -> Result<Arc<dyn PlaceBackend>> {
    match config.backend.as_str() {
        "google" => {
            if config.api_key.is_empty() {
                return Err(Error::Config(
                    "places.api_key is required for the google backend".to_string(),
                ));
            }
            Ok(Arc::new(google::GoogleBackend::new(&config.api_key)?))
        }
        "nominatim" => Ok(Arc::new(nominatim::NominatimBackend::new()?)),
        other => Err(Error::Config(format!("Unknown places backend: {}", other))),
    }
}

/// List available place backends
pub fn available_backends() -> Vec<&'static str> {
    vec!["google", "nominatim"]
}
