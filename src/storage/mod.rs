//! Listing storage
//!
//! Defines the `ListingStore` query interface the search pipeline consumes,
//! the persisted listing shapes it returns, and the available backends.
//! Each backend is a single file implementing the trait.

pub mod memory;
pub mod postgrest;

#[cfg(test)]
pub(crate) mod fixtures;

use crate::config::StorageConfig;
use crate::coord::Coordinate;
use crate::error::{Error, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;

/// A reference amenity (e.g. "EV charging", "Covered")
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Amenity {
    pub id: String,
    pub name: String,
}

/// An image attached to a listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListingImage {
    pub url: String,
    #[serde(default)]
    pub is_primary: bool,
}

/// Kind of parking space offered
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ParkingType {
    Driveway,
    Garage,
    Lot,
    Street,
    /// Any value stored by the listing component that we do not know about
    Other(String),
}

impl ParkingType {
    /// The facet values offered to visitors
    pub fn known() -> Vec<ParkingType> {
        vec![Self::Driveway, Self::Garage, Self::Lot, Self::Street]
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Driveway => "driveway",
            Self::Garage => "garage",
            Self::Lot => "lot",
            Self::Street => "street",
            Self::Other(other) => other,
        }
    }
}

impl From<String> for ParkingType {
    fn from(value: String) -> Self {
        match value.trim().to_lowercase().as_str() {
            "driveway" => Self::Driveway,
            "garage" => Self::Garage,
            "lot" => Self::Lot,
            "street" => Self::Street,
            _ => Self::Other(value),
        }
    }
}

impl From<ParkingType> for String {
    fn from(value: ParkingType) -> Self {
        value.as_str().to_string()
    }
}

impl std::str::FromStr for ParkingType {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self::from(s.to_string()))
    }
}

impl std::fmt::Display for ParkingType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A persisted listing together with its images and amenities
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListingRecord {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub address: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    pub lat: f64,
    pub lng: f64,
    pub price_per_day: f64,
    pub is_active: bool,
    #[serde(default)]
    pub is_featured: bool,
    #[serde(default, rename = "type")]
    pub parking_type: Option<ParkingType>,
    #[serde(default)]
    pub spaces_available: u32,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub images: Vec<ListingImage>,
    #[serde(default)]
    pub amenities: Vec<Amenity>,
}

impl ListingRecord {
    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.lat, self.lng)
    }
}

/// A listing id paired with its distance from the query point
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistanceCandidate {
    pub listing_id: String,
    pub distance_meters: f64,
}

/// Read-only query interface over the listing tables
///
/// Implementations must be thread-safe (Send + Sync) to work with the async
/// server and the search orchestrator.
#[async_trait]
pub trait ListingStore: Send + Sync {
    /// Backend name (e.g., "memory", "postgrest")
    fn name(&self) -> &'static str;

    /// Active listings within `max_distance_meters` of `center`, nearest first
    ///
    /// Backends may return more or unsorted rows; the nearest-spot service
    /// normalizes the answer.
    async fn query_nearest(
        &self,
        center: Coordinate,
        max_results: usize,
        max_distance_meters: f64,
    ) -> Result<Vec<DistanceCandidate>>;

    /// Full records for the given ids, in any order; unknown ids are skipped
    async fn fetch_by_ids(&self, ids: &[String]) -> Result<Vec<ListingRecord>>;

    /// Newest active listings, newest first
    async fn fetch_active(&self, limit: usize) -> Result<Vec<ListingRecord>>;

    /// The amenity reference list, ordered by name
    async fn fetch_active_amenities(&self) -> Result<Vec<Amenity>>;
}

/// Open the storage backend named in the configuration
pub fn open_store(config: &StorageConfig) -> Result<Arc<dyn ListingStore>> {
    match config.backend.as_str() {
        "memory" => {
            let store = match &config.listings_file {
                Some(path) => memory::MemoryStore::load_fixture(path)?,
                None => {
                    warn!("Memory storage has no listings_file, starting empty");
                    memory::MemoryStore::new()
                }
            };
            Ok(Arc::new(store))
        }
        "postgrest" => {
            if config.url.is_empty() {
                return Err(Error::Config(
                    "storage.url is required for the postgrest backend".to_string(),
                ));
            }
            Ok(Arc::new(postgrest::PostgrestStore::new(
                &config.url,
                &config.api_key,
            )?))
        }
        other => Err(Error::Config(format!("Unknown storage backend: {}", other))),
    }
}

/// List available storage backends
pub fn available_backends() -> Vec<&'static str> {
    vec!["memory", "postgrest"]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parking_type_parsing() {
        assert_eq!(ParkingType::from("Garage".to_string()), ParkingType::Garage);
        assert_eq!(
            ParkingType::from("carport".to_string()),
            ParkingType::Other("carport".to_string())
        );
        assert_eq!(ParkingType::Street.to_string(), "street");
    }

    #[test]
    fn test_parking_type_serde() {
        let parsed: ParkingType = serde_json::from_str("\"lot\"").unwrap();
        assert_eq!(parsed, ParkingType::Lot);
        assert_eq!(serde_json::to_string(&ParkingType::Driveway).unwrap(), "\"driveway\"");
    }

    #[test]
    fn test_open_store_unknown_backend() {
        let config = StorageConfig {
            backend: "redis".to_string(),
            ..StorageConfig::default()
        };
        assert!(open_store(&config).is_err());
    }

    #[test]
    fn test_open_store_postgrest_requires_url() {
        let config = StorageConfig {
            backend: "postgrest".to_string(),
            ..StorageConfig::default()
        };
        let err = open_store(&config).err().unwrap();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_open_store_default_is_memory() {
        let store = open_store(&StorageConfig::default()).unwrap();
        assert_eq!(store.name(), "memory");
    }
}
