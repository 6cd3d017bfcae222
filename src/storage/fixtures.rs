//! Shared listing fixtures and store doubles for unit tests

use crate::coord::distance::destination;
use crate::coord::Coordinate;
use crate::error::{Error, Result};
use crate::storage::{Amenity, DistanceCandidate, ListingRecord, ListingStore, ParkingType};
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

pub fn amenity(id: &str, name: &str) -> Amenity {
    Amenity {
        id: id.to_string(),
        name: name.to_string(),
    }
}

/// An active listing at an exact point
pub fn listing_at(id: &str, point: Coordinate) -> ListingRecord {
    ListingRecord {
        id: id.to_string(),
        title: format!("Spot {}", id),
        description: None,
        address: "123 Main St".to_string(),
        city: "Springfield".to_string(),
        state: "IL".to_string(),
        zip_code: "62701".to_string(),
        lat: point.lat,
        lng: point.lng,
        price_per_day: 20.0,
        is_active: true,
        is_featured: false,
        parking_type: Some(ParkingType::Driveway),
        spaces_available: 1,
        created_at: Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap(),
        images: Vec::new(),
        amenities: Vec::new(),
    }
}

/// An active listing `meters` due north of `center`
pub fn listing_north_of(id: &str, center: Coordinate, meters: f64) -> ListingRecord {
    listing_at(id, destination(center, 0.0, meters))
}

/// Store wrapper that can be switched offline and counts round trips
pub struct FlakyStore {
    inner: Arc<dyn ListingStore>,
    offline: AtomicBool,
    pub nearest_calls: AtomicUsize,
    pub fetch_calls: AtomicUsize,
    pub active_calls: AtomicUsize,
    pub amenity_calls: AtomicUsize,
}

impl FlakyStore {
    pub fn new(inner: Arc<dyn ListingStore>) -> Self {
        Self {
            inner,
            offline: AtomicBool::new(false),
            nearest_calls: AtomicUsize::new(0),
            fetch_calls: AtomicUsize::new(0),
            active_calls: AtomicUsize::new(0),
            amenity_calls: AtomicUsize::new(0),
        }
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn check(&self) -> Result<()> {
        if self.offline.load(Ordering::SeqCst) {
            Err(Error::Unavailable("storage offline".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl ListingStore for FlakyStore {
    fn name(&self) -> &'static str {
        "flaky"
    }

    async fn query_nearest(
        &self,
        center: Coordinate,
        max_results: usize,
        max_distance_meters: f64,
    ) -> Result<Vec<DistanceCandidate>> {
        self.nearest_calls.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        self.inner
            .query_nearest(center, max_results, max_distance_meters)
            .await
    }

    async fn fetch_by_ids(&self, ids: &[String]) -> Result<Vec<ListingRecord>> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        self.inner.fetch_by_ids(ids).await
    }

    async fn fetch_active(&self, limit: usize) -> Result<Vec<ListingRecord>> {
        self.active_calls.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        self.inner.fetch_active(limit).await
    }

    async fn fetch_active_amenities(&self) -> Result<Vec<Amenity>> {
        self.amenity_calls.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        self.inner.fetch_active_amenities().await
    }
}
