//! In-memory listing store
//!
//! Keeps active listings in an R-tree keyed by `[lng, lat]`. A nearest
//! query first collects the points inside the radius' bounding rectangles,
//! then computes exact haversine distances on that short list only.

use crate::coord::distance::{bounding_boxes, haversine_distance};
use crate::coord::Coordinate;
use crate::error::{Error, Result};
use crate::storage::{Amenity, DistanceCandidate, ListingRecord, ListingStore};
use async_trait::async_trait;
use rstar::{RTree, RTreeObject, AABB};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// R-tree entry for one active listing
#[derive(Debug, Clone, PartialEq)]
struct IndexedListing {
    id: String,
    point: [f64; 2],
}

impl IndexedListing {
    fn from_record(record: &ListingRecord) -> Self {
        Self {
            id: record.id.clone(),
            point: [record.lng, record.lat],
        }
    }
}

impl RTreeObject for IndexedListing {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.point)
    }
}

/// On-disk fixture layout
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Fixture {
    #[serde(default)]
    pub amenities: Vec<Amenity>,
    #[serde(default)]
    pub listings: Vec<ListingRecord>,
}

#[derive(Default)]
struct Inner {
    listings: HashMap<String, ListingRecord>,
    index: RTree<IndexedListing>,
    amenities: Vec<Amenity>,
}

impl Inner {
    fn upsert(&mut self, record: ListingRecord) {
        if let Some(previous) = self.listings.remove(&record.id) {
            if previous.is_active {
                self.index.remove(&IndexedListing::from_record(&previous));
            }
        }
        if record.is_active {
            self.index.insert(IndexedListing::from_record(&record));
        }
        self.listings.insert(record.id.clone(), record);
    }
}

/// Listing store held entirely in memory
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
        }
    }

    /// Create a store pre-populated with listings and amenities
    pub fn from_records(listings: Vec<ListingRecord>, amenities: Vec<Amenity>) -> Self {
        let mut inner = Inner {
            amenities,
            ..Inner::default()
        };
        let (active, inactive): (Vec<_>, Vec<_>) =
            listings.into_iter().partition(|l| l.is_active);

        inner.index = RTree::bulk_load(active.iter().map(IndexedListing::from_record).collect());
        for record in active.into_iter().chain(inactive) {
            inner.listings.insert(record.id.clone(), record);
        }

        Self {
            inner: RwLock::new(inner),
        }
    }

    /// Load a JSON fixture file (`{"amenities": [...], "listings": [...]}`)
    pub fn load_fixture(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            Error::Config(format!(
                "Failed to read listings file {}: {}",
                path.display(),
                e
            ))
        })?;
        let fixture: Fixture = serde_json::from_str(&content).map_err(|e| {
            Error::Config(format!(
                "Failed to parse listings file {}: {}",
                path.display(),
                e
            ))
        })?;

        info!(
            "Loaded {} listings and {} amenities from {}",
            fixture.listings.len(),
            fixture.amenities.len(),
            path.display()
        );

        Ok(Self::from_records(fixture.listings, fixture.amenities))
    }

    /// Insert or replace a listing
    pub async fn upsert(&self, record: ListingRecord) {
        self.inner.write().await.upsert(record);
    }

    /// Delete a listing, returning it if it existed
    pub async fn remove(&self, id: &str) -> Option<ListingRecord> {
        let mut inner = self.inner.write().await;
        let removed = inner.listings.remove(id)?;
        if removed.is_active {
            inner.index.remove(&IndexedListing::from_record(&removed));
        }
        Some(removed)
    }

    /// Toggle a listing's active flag; returns false if the id is unknown
    pub async fn set_active(&self, id: &str, active: bool) -> bool {
        let mut inner = self.inner.write().await;
        let Some(mut record) = inner.listings.get(id).cloned() else {
            return false;
        };
        record.is_active = active;
        inner.upsert(record);
        true
    }

    /// Number of listings (active or not)
    #[cfg(test)]
    pub async fn len(&self) -> usize {
        self.inner.read().await.listings.len()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ListingStore for MemoryStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn query_nearest(
        &self,
        center: Coordinate,
        max_results: usize,
        max_distance_meters: f64,
    ) -> Result<Vec<DistanceCandidate>> {
        center.validate()?;

        let inner = self.inner.read().await;
        let mut seen = HashSet::new();
        let mut candidates = Vec::new();

        for bbox in bounding_boxes(center, max_distance_meters) {
            let envelope = AABB::from_corners(
                [bbox.min_lng, bbox.min_lat],
                [bbox.max_lng, bbox.max_lat],
            );
            for entry in inner.index.locate_in_envelope(&envelope) {
                if !seen.insert(entry.id.as_str()) {
                    continue;
                }
                let point = Coordinate::new(entry.point[1], entry.point[0]);
                let distance = haversine_distance(center, point);
                if distance <= max_distance_meters {
                    candidates.push(DistanceCandidate {
                        listing_id: entry.id.clone(),
                        distance_meters: distance,
                    });
                }
            }
        }

        candidates.sort_by(|a, b| {
            a.distance_meters
                .total_cmp(&b.distance_meters)
                .then_with(|| a.listing_id.cmp(&b.listing_id))
        });
        candidates.truncate(max_results);

        debug!(
            "Memory store found {} candidates within {}m of {}",
            candidates.len(),
            max_distance_meters,
            center
        );

        Ok(candidates)
    }

    async fn fetch_by_ids(&self, ids: &[String]) -> Result<Vec<ListingRecord>> {
        let inner = self.inner.read().await;
        let wanted: HashSet<&str> = ids.iter().map(String::as_str).collect();

        let mut records: Vec<ListingRecord> = wanted
            .into_iter()
            .filter_map(|id| inner.listings.get(id).cloned())
            .collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        Ok(records)
    }

    async fn fetch_active(&self, limit: usize) -> Result<Vec<ListingRecord>> {
        let inner = self.inner.read().await;

        let mut records: Vec<ListingRecord> = inner
            .listings
            .values()
            .filter(|l| l.is_active)
            .cloned()
            .collect();
        records.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        records.truncate(limit);

        Ok(records)
    }

    async fn fetch_active_amenities(&self) -> Result<Vec<Amenity>> {
        let inner = self.inner.read().await;
        let mut amenities = inner.amenities.clone();
        amenities.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(amenities)
    }
}
