//! Search session orchestration
//!
//! Drives the location → nearest → hydrate → filter pipeline in response to
//! visitor actions and publishes a [`SearchState`] snapshot after every
//! change. Coordinate-driven queries are tagged with a request sequence
//! number; a response only commits while its number is still the latest
//! issued, so a slow older query can never overwrite a newer one.

use crate::config::SearchConfig;
use crate::coord::Coordinate;
use crate::error::{Error, Result, SearchError};
use crate::geo::places::AddressResolver;
use crate::geo::{GeoProvider, LocationFix};
use crate::search::filter::{self, SearchFilters};
use crate::search::hydrate::{HydratedListing, ListingHydrator};
use crate::search::nearest::{validate_radius, NearestSpotService};
use crate::storage::ParkingType;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Where the session is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchStatus {
    /// No coordinate and no results yet
    Idle,
    /// A location acquisition or query is in flight
    Locating,
    /// Results reflect the latest completed query
    Ready,
    /// The last acquisition or query failed; previous results are kept
    Error,
}

/// Snapshot of a search session, published to the view layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchState {
    pub coordinate: Option<LocationFix>,
    pub radius_meters: f64,
    #[serde(flatten)]
    pub filters: SearchFilters,
    pub status: SearchStatus,
    pub loading: bool,
    pub error: Option<SearchError>,
    pub results: Vec<HydratedListing>,
}

impl SearchState {
    fn new(radius_meters: f64) -> Self {
        Self {
            coordinate: None,
            radius_meters,
            filters: SearchFilters::default(),
            status: SearchStatus::Idle,
            loading: false,
            error: None,
            results: Vec::new(),
        }
    }

    /// The filters that apply in the current mode
    ///
    /// Free text is only applied when there is no coordinate.
    fn effective_filters(&self) -> SearchFilters {
        if self.coordinate.is_some() {
            self.filters.facets_only()
        } else {
            self.filters.clone()
        }
    }
}

/// Monotonic request numbering for last-request-wins
#[derive(Debug, Default)]
pub struct RequestSequence {
    latest: AtomicU64,
}

impl RequestSequence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a new ticket; every earlier ticket becomes stale
    pub fn issue(&self) -> u64 {
        self.latest.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Whether `ticket` is the most recently issued one
    pub fn is_current(&self, ticket: u64) -> bool {
        self.latest.load(Ordering::SeqCst) == ticket
    }

    /// Make every outstanding ticket stale
    pub fn invalidate(&self) {
        self.latest.fetch_add(1, Ordering::SeqCst);
    }
}

/// Tunables taken from the `[search]` config section
#[derive(Debug, Clone)]
pub struct SearchSettings {
    pub radius_meters: f64,
    pub max_results: usize,
    pub browse_limit: usize,
    pub fallback_to_ip: bool,
}

impl From<&SearchConfig> for SearchSettings {
    fn from(config: &SearchConfig) -> Self {
        Self {
            radius_meters: config.radius_meters,
            max_results: config.max_results,
            browse_limit: config.browse_limit,
            fallback_to_ip: config.fallback_to_ip,
        }
    }
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self::from(&SearchConfig::default())
    }
}

/// Unfiltered result sets of the last completed queries
#[derive(Default)]
struct Session {
    geo: Option<Vec<HydratedListing>>,
    browse: Option<Vec<HydratedListing>>,
}

/// One visitor's search session
pub struct SearchOrchestrator {
    geo: GeoProvider,
    resolver: Arc<AddressResolver>,
    nearest: NearestSpotService,
    hydrator: ListingHydrator,
    settings: SearchSettings,
    geo_sequence: RequestSequence,
    browse_sequence: RequestSequence,
    session: Mutex<Session>,
    state: watch::Sender<SearchState>,
}

impl SearchOrchestrator {
    pub fn new(
        geo: GeoProvider,
        resolver: Arc<AddressResolver>,
        nearest: NearestSpotService,
        hydrator: ListingHydrator,
        settings: SearchSettings,
    ) -> Self {
        let (state, _) = watch::channel(SearchState::new(settings.radius_meters));
        Self {
            geo,
            resolver,
            nearest,
            hydrator,
            settings,
            geo_sequence: RequestSequence::new(),
            browse_sequence: RequestSequence::new(),
            session: Mutex::new(Session::default()),
            state,
        }
    }

    /// Current snapshot
    pub fn state(&self) -> SearchState {
        self.state.borrow().clone()
    }

    /// Receive every published snapshot
    pub fn subscribe(&self) -> watch::Receiver<SearchState> {
        self.state.subscribe()
    }

    /// Locate the visitor with the device, optionally falling back to IP
    pub async fn set_location_from_device(&self) -> SearchState {
        let ticket = self.begin_locating();

        let fix = match self.geo.acquire_precise().await {
            Ok(fix) => Ok(fix),
            Err(e) if self.settings.fallback_to_ip => {
                info!("Device location failed ({}), falling back to IP", e);
                self.geo.acquire_approximate().await
            }
            Err(e) => Err(e),
        };

        self.finish_locating(ticket, fix).await
    }

    /// Locate the visitor approximately from their IP address
    pub async fn set_location_from_ip(&self) -> SearchState {
        let ticket = self.begin_locating();
        let fix = self.geo.acquire_approximate().await;
        self.finish_locating(ticket, fix).await
    }

    /// Search around the place the visitor picked from the suggestions
    pub async fn set_location_from_address(&self, place_ref: &str) -> SearchState {
        let ticket = self.begin_locating();
        let fix = self.resolver.resolve(place_ref).await;
        self.finish_locating(ticket, fix).await
    }

    /// Search around an already known location
    pub async fn set_location(&self, fix: LocationFix) -> SearchState {
        let ticket = self.begin_locating();
        let fix = fix.coordinate.validate().map(|_| fix);
        self.finish_locating(ticket, fix).await
    }

    /// Drop the coordinate immediately, without waiting for queries in flight
    ///
    /// Falls back to the last browse results when there are any, otherwise
    /// the geo results are cleared.
    pub fn reset_location(&self) -> SearchState {
        self.geo_sequence.invalidate();
        self.state.send_modify(|s| {
            s.coordinate = None;
            s.loading = false;
            s.error = None;
            let has_browse = {
                let mut session = self.lock_session();
                session.geo = None;
                session.browse.is_some()
            };
            if has_browse {
                s.status = SearchStatus::Ready;
                self.refilter(s);
            } else {
                s.status = SearchStatus::Idle;
                s.results = Vec::new();
            }
        });
        self.state()
    }

    /// Drop the coordinate and switch to the browse/text path
    pub async fn clear_location(&self) -> SearchState {
        self.reset_location();
        let has_browse = self.lock_session().browse.is_some();
        if !has_browse {
            self.run_browse().await;
        }
        self.state()
    }

    /// Change the free-text query
    ///
    /// Only affects results on the browse/text path.
    pub async fn set_free_text(&self, text: &str) -> SearchState {
        let mut needs_fetch = false;
        self.state.send_modify(|s| {
            s.filters.free_text = text.to_string();
            needs_fetch = s.coordinate.is_none() && self.lock_session().browse.is_none();
            self.refilter(s);
        });

        if needs_fetch {
            self.run_browse().await;
        }
        self.state()
    }

    /// Require every amenity in `ids`; re-filters without querying
    pub fn set_amenity_filter(&self, ids: BTreeSet<String>) -> SearchState {
        self.state.send_modify(|s| {
            s.filters.amenity_ids = ids;
            self.refilter(s);
        });
        self.state()
    }

    /// Restrict to `types` (empty means any); re-filters without querying
    pub fn set_parking_types(&self, types: BTreeSet<ParkingType>) -> SearchState {
        self.state.send_modify(|s| {
            s.filters.parking_types = types;
            self.refilter(s);
        });
        self.state()
    }

    /// Change the search radius and re-run the geo query if there is a coordinate
    pub async fn set_radius(&self, radius_meters: f64) -> Result<SearchState> {
        validate_radius(radius_meters)?;

        let mut coordinate = None;
        self.state.send_modify(|s| {
            s.radius_meters = radius_meters;
            coordinate = s.coordinate.clone();
        });

        match coordinate {
            Some(fix) => Ok(self.set_location(fix).await),
            None => Ok(self.state()),
        }
    }

    /// Re-run the query for the current mode
    pub async fn refresh(&self) -> SearchState {
        let coordinate = self.state.borrow().coordinate.clone();
        match coordinate {
            Some(fix) => self.set_location(fix).await,
            None => {
                self.run_browse().await;
                self.state()
            }
        }
    }

    fn lock_session(&self) -> MutexGuard<'_, Session> {
        self.session.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Recompute displayed results from the base set of the current mode
    ///
    /// Without a base set for the mode the displayed results stay as they are.
    fn refilter(&self, state: &mut SearchState) {
        let session = self.lock_session();
        let base = if state.coordinate.is_some() {
            session.geo.as_ref()
        } else {
            session.browse.as_ref()
        };
        if let Some(base) = base {
            state.results = filter::apply(base, &state.effective_filters());
        }
    }

    fn begin_locating(&self) -> u64 {
        let ticket = self.geo_sequence.issue();
        self.state.send_modify(|s| {
            s.status = SearchStatus::Locating;
            s.loading = true;
            s.error = None;
        });
        ticket
    }

    async fn finish_locating(&self, ticket: u64, fix: Result<LocationFix>) -> SearchState {
        match fix {
            Ok(fix) => self.run_geo(ticket, fix).await,
            Err(e) => self.fail_geo(ticket, &e),
        }
        self.state()
    }

    async fn run_geo(&self, ticket: u64, fix: LocationFix) {
        let center = fix.coordinate;
        let accepted = self.state.send_if_modified(|s| {
            if !self.geo_sequence.is_current(ticket) {
                return false;
            }
            s.coordinate = Some(fix);
            // the old base belongs to the previous coordinate
            self.lock_session().geo = None;
            true
        });
        if !accepted {
            debug!("Location fix for request {} superseded", ticket);
            return;
        }

        let radius = self.state.borrow().radius_meters;
        match self.query_geo(center, radius).await {
            Ok(base) => self.commit_geo(ticket, base),
            Err(e) => self.fail_geo(ticket, &e),
        }
    }

    async fn query_geo(&self, center: Coordinate, radius: f64) -> Result<Vec<HydratedListing>> {
        let candidates = self
            .nearest
            .find_nearest(center, self.settings.max_results, radius)
            .await?;
        self.hydrator.hydrate(&candidates).await
    }

    fn commit_geo(&self, ticket: u64, base: Vec<HydratedListing>) {
        let committed = self.state.send_if_modified(|s| {
            if !self.geo_sequence.is_current(ticket) {
                return false;
            }
            self.lock_session().geo = Some(base);
            self.refilter(s);
            s.status = SearchStatus::Ready;
            s.loading = false;
            s.error = None;
            true
        });

        if committed {
            info!("Geo search {} committed", ticket);
        } else {
            debug!("Discarded stale geo response {}", ticket);
        }
    }

    fn fail_geo(&self, ticket: u64, err: &Error) {
        warn!("Geo search {} failed: {}", ticket, err);
        self.state.send_if_modified(|s| {
            if !self.geo_sequence.is_current(ticket) {
                return false;
            }
            s.status = SearchStatus::Error;
            s.loading = false;
            s.error = Some(SearchError::from(err));
            true
        });
    }

    /// Fetch the newest listings for the text path
    ///
    /// The browse set is stored even if a coordinate arrived meanwhile, but
    /// only shown while there is no coordinate.
    async fn run_browse(&self) {
        let ticket = self.browse_sequence.issue();
        self.state.send_modify(|s| {
            if s.coordinate.is_none() {
                s.loading = true;
            }
        });

        let result = self.hydrator.browse(self.settings.browse_limit).await;

        self.state.send_if_modified(|s| {
            if !self.browse_sequence.is_current(ticket) {
                return false;
            }
            let shown = s.coordinate.is_none();
            match result {
                Ok(base) => {
                    self.lock_session().browse = Some(base);
                    if shown {
                        self.refilter(s);
                        if s.status != SearchStatus::Locating {
                            s.status = SearchStatus::Ready;
                            s.loading = false;
                        }
                        s.error = None;
                    }
                }
                Err(e) => {
                    warn!("Browse query failed: {}", e);
                    if shown && s.status != SearchStatus::Locating {
                        s.status = SearchStatus::Error;
                        s.loading = false;
                        s.error = Some(SearchError::from(&e));
                    }
                }
            }
            shown
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::geo::places::testing::FakePlaces;
    use crate::geo::testing::ScriptedSource;
    use crate::storage::fixtures::{amenity, listing_at, listing_north_of, FlakyStore};
    use crate::storage::memory::MemoryStore;
    use crate::storage::{Amenity, DistanceCandidate, ListingRecord, ListingStore};
    use async_trait::async_trait;
    use std::time::Duration;
    use tokio::sync::Notify;

    const HOME: Coordinate = Coordinate {
        lat: 34.80,
        lng: -87.68,
    };
    const AWAY: Coordinate = Coordinate {
        lat: 40.00,
        lng: -80.00,
    };

    /// Store whose nearest query blocks for one chosen latitude until released
    struct GatedStore {
        inner: Arc<dyn ListingStore>,
        gate_lat: f64,
        entered: Notify,
        release: Notify,
    }

    #[async_trait]
    impl ListingStore for GatedStore {
        fn name(&self) -> &'static str {
            "gated"
        }

        async fn query_nearest(
            &self,
            center: Coordinate,
            max_results: usize,
            max_distance_meters: f64,
        ) -> Result<Vec<DistanceCandidate>> {
            if center.lat == self.gate_lat {
                self.entered.notify_one();
                self.release.notified().await;
            }
            self.inner
                .query_nearest(center, max_results, max_distance_meters)
                .await
        }

        async fn fetch_by_ids(&self, ids: &[String]) -> Result<Vec<ListingRecord>> {
            self.inner.fetch_by_ids(ids).await
        }

        async fn fetch_active(&self, limit: usize) -> Result<Vec<ListingRecord>> {
            self.inner.fetch_active(limit).await
        }

        async fn fetch_active_amenities(&self) -> Result<Vec<Amenity>> {
            self.inner.fetch_active_amenities().await
        }
    }

    fn records() -> Vec<ListingRecord> {
        let mut near = listing_north_of("home-near", HOME, 100.0);
        near.amenities = vec![amenity("ev", "EV Charging"), amenity("cov", "Covered")];
        near.parking_type = Some(ParkingType::Garage);

        let mut mid = listing_north_of("home-mid", HOME, 2000.0);
        mid.amenities = vec![amenity("ev", "EV Charging")];
        mid.address = "9 Oak Ave".to_string();

        let far = listing_north_of("home-far", HOME, 6000.0);

        let mut away = listing_at("away", AWAY);
        away.city = "Pittsburgh".to_string();
        away.created_at += chrono::Duration::days(1);

        vec![near, mid, far, away]
    }

    struct Harness {
        orchestrator: Arc<SearchOrchestrator>,
        store: Arc<FlakyStore>,
        memory: Arc<MemoryStore>,
        device: Arc<ScriptedSource>,
        ip: Arc<ScriptedSource>,
    }

    fn harness_with(
        device: ScriptedSource,
        ip: ScriptedSource,
        settings: SearchSettings,
    ) -> Harness {
        let memory = Arc::new(MemoryStore::from_records(records(), Vec::new()));
        let store = Arc::new(FlakyStore::new(memory.clone()));
        let places = Arc::new(FakePlaces::default().with_place("p-away", "Pittsburgh, PA", AWAY));
        let resolver =
            Arc::new(AddressResolver::new(places, Duration::from_millis(150)).unwrap());
        let device = Arc::new(device);
        let ip = Arc::new(ip);

        let orchestrator = SearchOrchestrator::new(
            GeoProvider::new(device.clone(), ip.clone()),
            resolver,
            NearestSpotService::new(store.clone()),
            ListingHydrator::new(store.clone()),
            settings,
        );

        Harness {
            orchestrator: Arc::new(orchestrator),
            store,
            memory,
            device,
            ip,
        }
    }

    fn harness() -> Harness {
        harness_with(
            ScriptedSource::fix(LocationFix::precise(HOME)),
            ScriptedSource::fix(LocationFix::approximate(AWAY, Some("Pittsburgh".into()))),
            SearchSettings::default(),
        )
    }

    fn ids(state: &SearchState) -> Vec<&str> {
        state.results.iter().map(|l| l.id.as_str()).collect()
    }

    #[test]
    fn test_request_sequence() {
        let seq = RequestSequence::new();
        let first = seq.issue();
        assert!(seq.is_current(first));

        let second = seq.issue();
        assert!(!seq.is_current(first));
        assert!(seq.is_current(second));

        seq.invalidate();
        assert!(!seq.is_current(second));
    }

    #[test]
    fn test_initial_state_is_idle() {
        let h = harness();
        let state = h.orchestrator.state();
        assert_eq!(state.status, SearchStatus::Idle);
        assert_eq!(state.radius_meters, 5000.0);
        assert!(state.results.is_empty());
    }

    #[tokio::test]
    async fn test_device_location_runs_pipeline() {
        let h = harness();
        let state = h.orchestrator.set_location_from_device().await;

        assert_eq!(state.status, SearchStatus::Ready);
        assert!(!state.loading);
        assert_eq!(ids(&state), vec!["home-near", "home-mid"]);
        assert!(state.results[0].distance_meters.unwrap() < state.results[1].distance_meters.unwrap());
        assert!(!state.coordinate.as_ref().unwrap().is_approximate);
    }

    #[tokio::test]
    async fn test_denied_without_fallback_is_error() {
        let h = harness_with(
            ScriptedSource::denied(),
            ScriptedSource::fix(LocationFix::approximate(AWAY, None)),
            SearchSettings::default(),
        );

        let state = h.orchestrator.set_location_from_device().await;

        assert_eq!(state.status, SearchStatus::Error);
        assert_eq!(state.error.as_ref().unwrap().kind, ErrorKind::PermissionDenied);
        assert!(state.results.is_empty());
        assert!(state.coordinate.is_none());
    }

    #[tokio::test]
    async fn test_denied_with_fallback_uses_ip() {
        let settings = SearchSettings {
            fallback_to_ip: true,
            ..SearchSettings::default()
        };
        let h = harness_with(
            ScriptedSource::denied(),
            ScriptedSource::fix(LocationFix::approximate(AWAY, None)),
            settings,
        );

        let state = h.orchestrator.set_location_from_device().await;

        assert_eq!(state.status, SearchStatus::Ready);
        assert!(state.coordinate.as_ref().unwrap().is_approximate);
        assert_eq!(ids(&state), vec!["away"]);
        assert_eq!(h.device.calls.load(Ordering::SeqCst), 1);
        assert_eq!(h.ip.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_ip_location_skips_device() {
        let h = harness();

        let state = h.orchestrator.set_location_from_ip().await;
        assert_eq!(state.status, SearchStatus::Ready);
        assert_eq!(ids(&state), vec!["away"]);
        let fix = state.coordinate.as_ref().unwrap();
        assert!(fix.is_approximate);
        assert_eq!(fix.label.as_deref(), Some("Pittsburgh"));
        assert_eq!(h.device.calls.load(Ordering::SeqCst), 0);
        assert_eq!(h.ip.calls.load(Ordering::SeqCst), 1);

        h.ip.set_fix(LocationFix::approximate(HOME, None));
        let state = h.orchestrator.set_location_from_ip().await;
        assert_eq!(ids(&state), vec!["home-near", "home-mid"]);
        assert_eq!(h.ip.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_previous_results() {
        let h = harness();
        h.orchestrator.set_location_from_device().await;

        h.store.set_offline(true);
        let state = h.orchestrator.refresh().await;

        assert_eq!(state.status, SearchStatus::Error);
        assert_eq!(state.error.as_ref().unwrap().kind, ErrorKind::Unavailable);
        assert_eq!(ids(&state), vec!["home-near", "home-mid"]);
    }

    #[tokio::test]
    async fn test_filter_change_does_not_requery() {
        let h = harness();
        h.orchestrator.set_location_from_device().await;
        let queries = h.store.nearest_calls.load(Ordering::SeqCst);
        let fetches = h.store.fetch_calls.load(Ordering::SeqCst);

        let state = h
            .orchestrator
            .set_amenity_filter(["ev", "cov"].iter().map(|s| s.to_string()).collect());
        assert_eq!(ids(&state), vec!["home-near"]);

        let state = h.orchestrator.set_amenity_filter(BTreeSet::new());
        assert_eq!(ids(&state), vec!["home-near", "home-mid"]);

        let state = h
            .orchestrator
            .set_parking_types([ParkingType::Garage].into_iter().collect());
        assert_eq!(ids(&state), vec!["home-near"]);

        assert_eq!(h.store.nearest_calls.load(Ordering::SeqCst), queries);
        assert_eq!(h.store.fetch_calls.load(Ordering::SeqCst), fetches);
    }

    #[tokio::test]
    async fn test_free_text_ignored_on_geo_path() {
        let h = harness();
        h.orchestrator.set_location_from_device().await;

        let state = h.orchestrator.set_free_text("oak").await;
        assert_eq!(state.filters.free_text, "oak");
        assert_eq!(ids(&state), vec!["home-near", "home-mid"]);
        assert_eq!(h.store.active_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_text_path_browses_and_filters() {
        let h = harness();

        let state = h.orchestrator.set_free_text("oak ave").await;
        assert_eq!(state.status, SearchStatus::Ready);
        assert_eq!(ids(&state), vec!["home-mid"]);

        let state = h.orchestrator.set_free_text("").await;
        assert_eq!(state.results.len(), 4);
        assert_eq!(state.results[0].id, "away");
        assert_eq!(h.store.active_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_address_resolution() {
        let h = harness();

        let state = h.orchestrator.set_location_from_address("p-away").await;
        assert_eq!(ids(&state), vec!["away"]);

        let state = h.orchestrator.set_location_from_address("missing").await;
        assert_eq!(state.status, SearchStatus::Error);
        assert_eq!(state.error.as_ref().unwrap().kind, ErrorKind::NotFound);
        assert_eq!(ids(&state), vec!["away"]);
    }

    #[tokio::test]
    async fn test_invalid_coordinate_is_invalid_argument() {
        let h = harness();
        let state = h
            .orchestrator
            .set_location(LocationFix::precise(Coordinate::new(0.0, 181.0)))
            .await;
        assert_eq!(state.error.as_ref().unwrap().kind, ErrorKind::InvalidArgument);
    }

    #[tokio::test]
    async fn test_radius_change_requeries() {
        let h = harness();
        h.orchestrator.set_location_from_device().await;

        let state = h.orchestrator.set_radius(10_000.0).await.unwrap();
        assert_eq!(ids(&state), vec!["home-near", "home-mid", "home-far"]);
        assert_eq!(h.store.nearest_calls.load(Ordering::SeqCst), 2);

        assert!(h.orchestrator.set_radius(-1.0).await.is_err());
        assert_eq!(h.orchestrator.state().radius_meters, 10_000.0);
    }

    #[tokio::test]
    async fn test_deleted_listing_dropped_from_results() {
        let h = harness();
        h.orchestrator.set_location_from_device().await;

        h.memory.remove("home-mid").await;
        let state = h.orchestrator.refresh().await;

        assert_eq!(state.status, SearchStatus::Ready);
        assert_eq!(ids(&state), vec!["home-near"]);
    }

    #[tokio::test]
    async fn test_clear_location_falls_back_to_browse() {
        let h = harness();
        h.orchestrator.set_location_from_device().await;

        let state = h.orchestrator.clear_location().await;
        assert!(state.coordinate.is_none());
        assert_eq!(state.status, SearchStatus::Ready);
        assert_eq!(state.results.len(), 4);
    }

    fn gated_orchestrator(gate: Coordinate) -> (Arc<SearchOrchestrator>, Arc<GatedStore>) {
        let memory: Arc<dyn ListingStore> =
            Arc::new(MemoryStore::from_records(records(), Vec::new()));
        let store = Arc::new(GatedStore {
            inner: memory,
            gate_lat: gate.lat,
            entered: Notify::new(),
            release: Notify::new(),
        });
        let resolver = Arc::new(
            AddressResolver::new(Arc::new(FakePlaces::default()), Duration::from_millis(150))
                .unwrap(),
        );
        let orchestrator = SearchOrchestrator::new(
            GeoProvider::new(
                Arc::new(ScriptedSource::unavailable()),
                Arc::new(ScriptedSource::unavailable()),
            ),
            resolver,
            NearestSpotService::new(store.clone()),
            ListingHydrator::new(store.clone()),
            SearchSettings::default(),
        );
        (Arc::new(orchestrator), store)
    }

    #[tokio::test]
    async fn test_late_older_response_is_discarded() {
        let (orchestrator, store) = gated_orchestrator(HOME);

        let slow = {
            let orchestrator = orchestrator.clone();
            tokio::spawn(async move { orchestrator.set_location(LocationFix::precise(HOME)).await })
        };
        store.entered.notified().await;

        let state = orchestrator.set_location(LocationFix::precise(AWAY)).await;
        assert_eq!(ids(&state), vec!["away"]);

        store.release.notify_one();
        slow.await.unwrap();

        let state = orchestrator.state();
        assert_eq!(ids(&state), vec!["away"]);
        assert_eq!(state.coordinate.as_ref().unwrap().coordinate, AWAY);
        assert_eq!(state.status, SearchStatus::Ready);
    }

    #[tokio::test]
    async fn test_reset_is_synchronous_and_discards_in_flight_query() {
        let (orchestrator, store) = gated_orchestrator(HOME);

        let slow = {
            let orchestrator = orchestrator.clone();
            tokio::spawn(async move { orchestrator.set_location(LocationFix::precise(HOME)).await })
        };
        store.entered.notified().await;

        let state = orchestrator.reset_location();
        assert!(state.coordinate.is_none());
        assert!(!state.loading);

        store.release.notify_one();
        slow.await.unwrap();

        let state = orchestrator.state();
        assert!(state.coordinate.is_none());
        assert!(state.results.is_empty());
    }

    #[tokio::test]
    async fn test_clear_location_without_browse_drops_geo_results() {
        let h = harness();
        h.orchestrator.set_location_from_device().await;

        h.store.set_offline(true);
        let state = h.orchestrator.clear_location().await;
        assert!(state.coordinate.is_none());
        assert_eq!(state.status, SearchStatus::Error);
        assert_eq!(state.error.as_ref().unwrap().kind, ErrorKind::Unavailable);
        assert!(state.results.is_empty());

        let state = h
            .orchestrator
            .set_amenity_filter(["ev"].iter().map(|s| s.to_string()).collect());
        assert!(state.results.is_empty());

        h.store.set_offline(false);
        let state = h.orchestrator.refresh().await;
        assert_eq!(state.status, SearchStatus::Ready);
        let mut found = ids(&state);
        found.sort();
        assert_eq!(found, vec!["home-mid", "home-near"]);
    }

    #[tokio::test]
    async fn test_filter_while_locating_keeps_previous_results() {
        let (orchestrator, store) = gated_orchestrator(AWAY);
        let ev: BTreeSet<String> = ["ev"].iter().map(|s| s.to_string()).collect();

        orchestrator.set_location(LocationFix::precise(HOME)).await;
        orchestrator.set_amenity_filter(ev);
        let state = orchestrator.clear_location().await;
        let mut shown = ids(&state);
        shown.sort();
        assert_eq!(shown, vec!["home-mid", "home-near"]);

        let moving = {
            let orchestrator = orchestrator.clone();
            tokio::spawn(async move { orchestrator.set_location(LocationFix::precise(AWAY)).await })
        };
        store.entered.notified().await;

        let state = orchestrator
            .set_amenity_filter(["ev", "cov"].iter().map(|s| s.to_string()).collect());
        assert_eq!(state.status, SearchStatus::Locating);
        let mut during = ids(&state);
        during.sort();
        assert_eq!(during, shown);

        store.release.notify_one();
        let state = moving.await.unwrap();
        assert_eq!(state.status, SearchStatus::Ready);
        assert!(state.results.is_empty());

        let state = orchestrator.set_amenity_filter(BTreeSet::new());
        assert_eq!(ids(&state), vec!["away"]);
    }

    #[tokio::test]
    async fn test_subscribers_see_locating() {
        let (orchestrator, store) = gated_orchestrator(HOME);
        let rx = orchestrator.subscribe();

        let task = {
            let orchestrator = orchestrator.clone();
            tokio::spawn(async move { orchestrator.set_location(LocationFix::precise(HOME)).await })
        };
        store.entered.notified().await;

        {
            let state = rx.borrow();
            assert_eq!(state.status, SearchStatus::Locating);
            assert!(state.loading);
            assert_eq!(state.coordinate.as_ref().unwrap().coordinate, HOME);
        }

        store.release.notify_one();
        task.await.unwrap();
        assert_eq!(rx.borrow().status, SearchStatus::Ready);
        assert!(!rx.borrow().loading);
    }

    #[tokio::test]
    async fn test_subscribers_see_updates() {
        let h = harness();
        let mut rx = h.orchestrator.subscribe();

        h.orchestrator.set_location_from_device().await;

        assert!(rx.has_changed().unwrap());
        let state = rx.borrow_and_update().clone();
        assert_eq!(state.status, SearchStatus::Ready);
    }
}
