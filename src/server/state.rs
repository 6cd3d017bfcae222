//! Server shared state
//!
//! Holds configuration and the search services shared by every request.

use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::error::Result;
use crate::geo::places::{get_place_backend, AddressResolver, PlaceBackend};
use crate::geo::{get_ip_locator, ClientLocator};
use crate::search::{AmenityCache, ListingHydrator, NearestSpotService};
use crate::storage::{open_store, ListingStore};
use std::sync::Arc;

/// Shared state for the HTTP server
pub struct AppState {
    /// Configuration
    pub config: Config,

    store: Arc<dyn ListingStore>,
    nearest: NearestSpotService,
    hydrator: ListingHydrator,
    amenities: AmenityCache,
    resolver: AddressResolver,
    locator: Arc<dyn ClientLocator>,
}

impl AppState {
    /// Build state from configuration, opening the configured backends
    pub fn new(config: Config) -> Result<Self> {
        let store = open_store(&config.storage)?;
        let places = get_place_backend(&config.places)?;
        let locator: Arc<dyn ClientLocator> = Arc::new(get_ip_locator());
        Self::from_parts(config, store, places, locator, Arc::new(SystemClock))
    }

    /// Build state around explicit collaborators
    pub fn from_parts(
        config: Config,
        store: Arc<dyn ListingStore>,
        places: Arc<dyn PlaceBackend>,
        locator: Arc<dyn ClientLocator>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let resolver = AddressResolver::new(places, config.search.suggest_debounce())?;
        let amenities = AmenityCache::new(store.clone(), config.search.amenity_cache_ttl(), clock);

        Ok(Self {
            nearest: NearestSpotService::new(store.clone()),
            hydrator: ListingHydrator::new(store.clone()),
            store,
            amenities,
            resolver,
            locator,
            config,
        })
    }

    pub fn store(&self) -> &Arc<dyn ListingStore> {
        &self.store
    }

    pub fn nearest(&self) -> &NearestSpotService {
        &self.nearest
    }

    pub fn hydrator(&self) -> &ListingHydrator {
        &self.hydrator
    }

    pub fn amenities(&self) -> &AmenityCache {
        &self.amenities
    }

    pub fn resolver(&self) -> &AddressResolver {
        &self.resolver
    }

    pub fn locator(&self) -> &Arc<dyn ClientLocator> {
        &self.locator
    }
}
