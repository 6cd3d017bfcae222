//! Listing hydration
//!
//! Turns ordered distance candidates into full listings in one batched
//! fetch, keeping the candidate order exactly.

use crate::coord::Coordinate;
use crate::error::Result;
use crate::storage::{
    Amenity, DistanceCandidate, ListingImage, ListingRecord, ListingStore, ParkingType,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tracing::debug;

/// A listing ready for display
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HydratedListing {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub address: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    pub coordinate: Coordinate,
    pub price_per_day: f64,
    pub is_featured: bool,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub parking_type: Option<ParkingType>,
    pub spaces_available: u32,
    pub created_at: DateTime<Utc>,

    /// Distance from the search point; absent on the browse path
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance_meters: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_image: Option<String>,
    #[serde(default)]
    pub images: Vec<ListingImage>,
    #[serde(default)]
    pub amenities: Vec<Amenity>,
}

impl HydratedListing {
    pub fn from_record(record: ListingRecord, distance_meters: Option<f64>) -> Self {
        let primary_image = primary_image(&record.images);
        Self {
            coordinate: record.coordinate(),
            id: record.id,
            title: record.title,
            description: record.description,
            address: record.address,
            city: record.city,
            state: record.state,
            zip_code: record.zip_code,
            price_per_day: record.price_per_day,
            is_featured: record.is_featured,
            parking_type: record.parking_type,
            spaces_available: record.spaces_available,
            created_at: record.created_at,
            distance_meters,
            primary_image,
            images: record.images,
            amenities: record.amenities,
        }
    }

    /// True while at least one space is left
    pub fn is_available(&self) -> bool {
        self.spaces_available > 0
    }

    pub fn amenity_ids(&self) -> BTreeSet<&str> {
        self.amenities.iter().map(|a| a.id.as_str()).collect()
    }
}

/// The image flagged primary, else the first one
fn primary_image(images: &[ListingImage]) -> Option<String> {
    images
        .iter()
        .find(|i| i.is_primary)
        .or_else(|| images.first())
        .map(|i| i.url.clone())
}

/// Fetches full listing data for candidates and browse results
#[derive(Clone)]
pub struct ListingHydrator {
    store: Arc<dyn ListingStore>,
}

impl ListingHydrator {
    pub fn new(store: Arc<dyn ListingStore>) -> Self {
        Self { store }
    }

    /// Full listings for `candidates`, in the same order
    ///
    /// Ids that no longer resolve to an active listing are dropped.
    pub async fn hydrate(&self, candidates: &[DistanceCandidate]) -> Result<Vec<HydratedListing>> {
        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<String> = candidates.iter().map(|c| c.listing_id.clone()).collect();
        let mut by_id: HashMap<String, ListingRecord> = self
            .store
            .fetch_by_ids(&ids)
            .await?
            .into_iter()
            .filter(|r| r.is_active)
            .map(|r| (r.id.clone(), r))
            .collect();

        let hydrated: Vec<HydratedListing> = candidates
            .iter()
            .filter_map(|c| {
                by_id
                    .remove(&c.listing_id)
                    .map(|r| HydratedListing::from_record(r, Some(c.distance_meters)))
            })
            .collect();

        if hydrated.len() < candidates.len() {
            debug!(
                "Dropped {} candidates that no longer resolve",
                candidates.len() - hydrated.len()
            );
        }

        Ok(hydrated)
    }

    /// Newest active listings, with no distance attached
    pub async fn browse(&self, limit: usize) -> Result<Vec<HydratedListing>> {
        let records = self.store.fetch_active(limit).await?;
        Ok(records
            .into_iter()
            .filter(|r| r.is_active)
            .take(limit)
            .map(|r| HydratedListing::from_record(r, None))
            .collect())
    }
}
