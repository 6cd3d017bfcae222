//! Process-wide amenity reference list cache
//!
//! The list is read-mostly. A refresh swaps in a whole new list, so readers
//! only ever see a complete snapshot.

use crate::clock::Clock;
use crate::error::Result;
use crate::storage::{Amenity, ListingStore};
use chrono::{DateTime, Utc};
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tracing::debug;

struct CacheEntry {
    fetched_at: DateTime<Utc>,
    amenities: Arc<Vec<Amenity>>,
}

/// Time-bounded cache over `fetch_active_amenities`
pub struct AmenityCache {
    store: Arc<dyn ListingStore>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
    entry: RwLock<Option<CacheEntry>>,
}

impl AmenityCache {
    pub fn new(store: Arc<dyn ListingStore>, ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            ttl,
            clock,
            entry: RwLock::new(None),
        }
    }

    /// The cached list, refreshed from storage once it is older than the TTL
    pub async fn get(&self) -> Result<Arc<Vec<Amenity>>> {
        if let Some(fresh) = self.cached() {
            return Ok(fresh);
        }

        let amenities = Arc::new(self.store.fetch_active_amenities().await?);
        debug!("Refreshed amenity cache with {} entries", amenities.len());

        let mut entry = self.entry.write().unwrap_or_else(|e| e.into_inner());
        *entry = Some(CacheEntry {
            fetched_at: self.clock.now(),
            amenities: amenities.clone(),
        });
        Ok(amenities)
    }

    /// Force the next `get` to hit storage
    pub fn invalidate(&self) {
        let mut entry = self.entry.write().unwrap_or_else(|e| e.into_inner());
        *entry = None;
    }

    fn cached(&self) -> Option<Arc<Vec<Amenity>>> {
        let entry = self.entry.read().unwrap_or_else(|e| e.into_inner());
        let entry = entry.as_ref()?;

        // A clock that moved backwards counts as expired
        let age = self.clock.now().signed_duration_since(entry.fetched_at);
        let fresh = age.to_std().map(|age| age < self.ttl).unwrap_or(false);

        fresh.then(|| entry.amenities.clone())
    }
}
