//! PostgREST listing store (Supabase-style REST over Postgres)
//!
//! Nearest-neighbor search is delegated to the `find_nearest_parking_spots`
//! database function, which runs against a spatial index. Full records are
//! fetched in one request with images and amenities embedded.

use crate::constants::api::USER_AGENT;
use crate::coord::Coordinate;
use crate::error::{Error, Result};
use crate::storage::{
    Amenity, DistanceCandidate, ListingImage, ListingRecord, ListingStore, ParkingType,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Embedded relations requested with every listing row
const LISTING_SELECT: &str =
    "*,parking_spot_images(image_url,is_primary),parking_spot_amenities(amenities(id,name))";

/// PostgREST-backed listing store
#[derive(Debug, Clone)]
pub struct PostgrestStore {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

/// Arguments of the nearest-spots database function
#[derive(Debug, Serialize)]
struct NearestArgs {
    user_lat: f64,
    user_lng: f64,
    max_results: usize,
    max_distance_meters: f64,
}

/// Row returned by the nearest-spots database function
#[derive(Debug, Deserialize)]
struct NearestRow {
    id: String,
    distance_meters: f64,
}

#[derive(Debug, Deserialize)]
struct ImageRow {
    image_url: String,
    is_primary: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct AmenityLinkRow {
    amenities: Option<Amenity>,
}

/// `parking_spots` row with embedded relations
#[derive(Debug, Deserialize)]
struct ListingRow {
    id: String,
    title: String,
    description: Option<String>,
    address: Option<String>,
    city: Option<String>,
    state: Option<String>,
    zip_code: Option<String>,
    #[serde(alias = "lat")]
    latitude: f64,
    #[serde(alias = "lng")]
    longitude: f64,
    price_per_day: f64,
    is_active: Option<bool>,
    is_featured: Option<bool>,
    #[serde(rename = "type")]
    parking_type: Option<String>,
    spaces_available: Option<u32>,
    created_at: DateTime<Utc>,
    #[serde(default)]
    parking_spot_images: Vec<ImageRow>,
    #[serde(default)]
    parking_spot_amenities: Vec<AmenityLinkRow>,
}

impl From<ListingRow> for ListingRecord {
    fn from(row: ListingRow) -> Self {
        ListingRecord {
            id: row.id,
            title: row.title,
            description: row.description,
            address: row.address.unwrap_or_default(),
            city: row.city.unwrap_or_default(),
            state: row.state.unwrap_or_default(),
            zip_code: row.zip_code.unwrap_or_default(),
            lat: row.latitude,
            lng: row.longitude,
            price_per_day: row.price_per_day,
            is_active: row.is_active.unwrap_or(false),
            is_featured: row.is_featured.unwrap_or(false),
            parking_type: row.parking_type.map(ParkingType::from),
            spaces_available: row.spaces_available.unwrap_or(0),
            created_at: row.created_at,
            images: row
                .parking_spot_images
                .into_iter()
                .map(|i| ListingImage {
                    url: i.image_url,
                    is_primary: i.is_primary.unwrap_or(false),
                })
                .collect(),
            amenities: row
                .parking_spot_amenities
                .into_iter()
                .filter_map(|link| link.amenities)
                .collect(),
        }
    }
}

impl PostgrestStore {
    /// Create a store for the project at `base_url` (e.g. `https://xyz.supabase.co`)
    pub fn new(base_url: &str, api_key: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| Error::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    fn rest_url(&self, path: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, path)
    }

    /// PostgREST `in` filter for a list of ids
    fn id_filter(ids: &[String]) -> String {
        let quoted: Vec<String> = ids
            .iter()
            .map(|id| format!("\"{}\"", id.replace('"', "")))
            .collect();
        format!("in.({})", quoted.join(","))
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        if self.api_key.is_empty() {
            request
        } else {
            request
                .header("apikey", &self.api_key)
                .bearer_auth(&self.api_key)
        }
    }

    async fn send<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
        what: &str,
    ) -> Result<T> {
        let response = self.authorized(request).send().await.map_err(|e| {
            if e.is_timeout() {
                Error::Timeout(format!("{} request timed out", what))
            } else {
                Error::Unavailable(format!("{} request failed: {}", what, e))
            }
        })?;

        if !response.status().is_success() {
            warn!("Storage returned {} for {}", response.status(), what);
            return Err(Error::Unavailable(format!(
                "{} returned status: {}",
                what,
                response.status()
            )));
        }

        response
            .json()
            .await
            .map_err(|e| Error::Unavailable(format!("Failed to parse {} response: {}", what, e)))
    }
}

#[async_trait]
impl ListingStore for PostgrestStore {
    fn name(&self) -> &'static str {
        "postgrest"
    }

    async fn query_nearest(
        &self,
        center: Coordinate,
        max_results: usize,
        max_distance_meters: f64,
    ) -> Result<Vec<DistanceCandidate>> {
        center.validate()?;

        let args = NearestArgs {
            user_lat: center.lat,
            user_lng: center.lng,
            max_results,
            max_distance_meters,
        };
        let request = self
            .client
            .post(self.rest_url("rpc/find_nearest_parking_spots"))
            .json(&args);

        let rows: Vec<NearestRow> = self.send(request, "find_nearest_parking_spots").await?;
        debug!("find_nearest_parking_spots returned {} rows", rows.len());

        Ok(rows
            .into_iter()
            .map(|row| DistanceCandidate {
                listing_id: row.id,
                distance_meters: row.distance_meters,
            })
            .collect())
    }

    async fn fetch_by_ids(&self, ids: &[String]) -> Result<Vec<ListingRecord>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let request = self.client.get(self.rest_url("parking_spots")).query(&[
            ("select", LISTING_SELECT.to_string()),
            ("id", Self::id_filter(ids)),
        ]);

        let rows: Vec<ListingRow> = self.send(request, "parking_spots").await?;
        Ok(rows.into_iter().map(ListingRecord::from).collect())
    }

    async fn fetch_active(&self, limit: usize) -> Result<Vec<ListingRecord>> {
        let request = self.client.get(self.rest_url("parking_spots")).query(&[
            ("select", LISTING_SELECT.to_string()),
            ("is_active", "eq.true".to_string()),
            ("order", "created_at.desc".to_string()),
            ("limit", limit.to_string()),
        ]);

        let rows: Vec<ListingRow> = self.send(request, "parking_spots").await?;
        Ok(rows.into_iter().map(ListingRecord::from).collect())
    }

    async fn fetch_active_amenities(&self) -> Result<Vec<Amenity>> {
        let request = self
            .client
            .get(self.rest_url("amenities"))
            .query(&[("select", "id,name"), ("order", "name.asc")]);

        self.send(request, "amenities").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rest_url_trims_trailing_slash() {
        let store = PostgrestStore::new("https://example.supabase.co/", "key").unwrap();
        assert_eq!(
            store.rest_url("amenities"),
            "https://example.supabase.co/rest/v1/amenities"
        );
    }

    #[test]
    fn test_id_filter() {
        let ids = vec!["a1".to_string(), "b\"2".to_string()];
        assert_eq!(PostgrestStore::id_filter(&ids), "in.(\"a1\",\"b2\")");
    }

    #[test]
    fn test_listing_row_conversion() {
        let json = serde_json::json!({
            "id": "spot-1",
            "title": "Covered driveway",
            "description": null,
            "address": "12 Elm St",
            "city": "Florence",
            "state": "AL",
            "zip_code": "35630",
            "latitude": 34.80,
            "longitude": -87.68,
            "price_per_day": 15.5,
            "is_active": true,
            "is_featured": null,
            "type": "garage",
            "spaces_available": 2,
            "created_at": "2025-03-01T10:00:00Z",
            "parking_spot_images": [
                {"image_url": "a.jpg", "is_primary": null},
                {"image_url": "b.jpg", "is_primary": true}
            ],
            "parking_spot_amenities": [
                {"amenities": {"id": "ev", "name": "EV Charging"}},
                {"amenities": null}
            ]
        });

        let row: ListingRow = serde_json::from_value(json).unwrap();
        let record = ListingRecord::from(row);

        assert_eq!(record.id, "spot-1");
        assert_eq!(record.parking_type, Some(ParkingType::Garage));
        assert!(!record.is_featured);
        assert_eq!(record.images.len(), 2);
        assert!(record.images[1].is_primary);
        assert_eq!(record.amenities.len(), 1);
        assert_eq!(record.amenities[0].id, "ev");
    }

    #[test]
    fn test_nearest_row_parsing() {
        let rows: Vec<NearestRow> =
            serde_json::from_str(r#"[{"id": "a", "distance_meters": 12.5}]"#).unwrap();
        assert_eq!(rows[0].id, "a");
        assert_eq!(rows[0].distance_meters, 12.5);
    }

    #[tokio::test]
    async fn test_fetch_by_ids_empty_skips_request() {
        let store = PostgrestStore::new("http://127.0.0.1:9", "").unwrap();
        assert!(store.fetch_by_ids(&[]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_unavailable() {
        let store = PostgrestStore::new("http://127.0.0.1:9", "").unwrap();
        let result = store.fetch_active(5).await;
        assert!(result.unwrap_err().is_retryable());
    }

    #[tokio::test]
    async fn test_invalid_coordinate_rejected_before_request() {
        let store = PostgrestStore::new("http://127.0.0.1:9", "").unwrap();
        let result = store
            .query_nearest(Coordinate::new(0.0, 200.0), 12, 5000.0)
            .await;
        assert!(matches!(result, Err(Error::InvalidArgument(_))));
    }
}
