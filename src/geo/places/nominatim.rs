//! Nominatim place backend (OpenStreetMap)
//!
//! Uses the free Nominatim search and lookup endpoints.
//! Rate limit: 1 request per second (enforced by User-Agent requirement).
//! Nominatim has no session concept, so tokens are accepted and ignored.

use crate::constants::api::{NOMINATIM_URL, USER_AGENT};
use crate::coord::Coordinate;
use crate::error::{Error, Result};
use crate::geo::places::{PlaceBackend, PlaceSuggestion, SessionToken};
use async_trait::async_trait;
use serde::Deserialize;

/// Maximum suggestions requested per keystroke
const SUGGESTION_LIMIT: usize = 5;

/// Nominatim place backend
#[derive(Debug, Clone)]
pub struct NominatimBackend {
    client: reqwest::Client,
    base_url: String,
}

/// Nominatim search/lookup response item
#[derive(Debug, Deserialize)]
struct NominatimResult {
    osm_type: Option<String>,
    osm_id: Option<u64>,
    lat: String,
    lon: String,
    display_name: String,
}

impl NominatimBackend {
    pub fn new() -> Result<Self> {
        Self::with_base_url(NOMINATIM_URL)
    }

    pub fn with_base_url(base_url: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| Error::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Parse lat/lng strings to a coordinate
    fn parse_coords(lat: &str, lng: &str) -> Result<Coordinate> {
        let lat: f64 = lat
            .parse()
            .map_err(|_| Error::Unavailable(format!("Invalid latitude: {}", lat)))?;
        let lng: f64 = lng
            .parse()
            .map_err(|_| Error::Unavailable(format!("Invalid longitude: {}", lng)))?;
        Ok(Coordinate::new(lat, lng))
    }

    /// Lookup id such as "W123" (way 123), built from an OSM type and id
    fn place_ref(result: &NominatimResult) -> Option<String> {
        let prefix = match result.osm_type.as_deref()? {
            "node" | "N" => 'N',
            "way" | "W" => 'W',
            "relation" | "R" => 'R',
            _ => return None,
        };
        Some(format!("{}{}", prefix, result.osm_id?))
    }

    fn is_valid_ref(place_ref: &str) -> bool {
        let mut chars = place_ref.chars();
        matches!(chars.next(), Some('N' | 'W' | 'R'))
            && !chars.as_str().is_empty()
            && chars.all(|c| c.is_ascii_digit())
    }

    async fn get_results(&self, url: &str) -> Result<Vec<NominatimResult>> {
        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                Error::Timeout("Nominatim request timed out".to_string())
            } else {
                Error::Unavailable(format!("Nominatim request failed: {}", e))
            }
        })?;

        if !response.status().is_success() {
            return Err(Error::Unavailable(format!(
                "Nominatim returned status: {}",
                response.status()
            )));
        }

        response
            .json()
            .await
            .map_err(|e| Error::Unavailable(format!("Failed to parse Nominatim response: {}", e)))
    }
}

#[async_trait]
impl PlaceBackend for NominatimBackend {
    fn name(&self) -> &'static str {
        "nominatim"
    }

    async fn autocomplete(
        &self,
        input: &str,
        _session: &SessionToken,
    ) -> Result<Vec<PlaceSuggestion>> {
        let url = format!(
            "{}/search?q={}&format=jsonv2&limit={}",
            self.base_url,
            urlencoding::encode(input),
            SUGGESTION_LIMIT
        );

        let results = self.get_results(&url).await?;
        Ok(results
            .iter()
            .filter_map(|r| {
                Self::place_ref(r).map(|place_ref| PlaceSuggestion {
                    label: r.display_name.clone(),
                    place_ref,
                })
            })
            .collect())
    }

    async fn place_location(
        &self,
        place_ref: &str,
        _session: &SessionToken,
    ) -> Result<Option<Coordinate>> {
        if !Self::is_valid_ref(place_ref) {
            return Ok(None);
        }

        let url = format!(
            "{}/lookup?osm_ids={}&format=json",
            self.base_url, place_ref
        );

        match self.get_results(&url).await?.into_iter().next() {
            Some(result) => Ok(Some(Self::parse_coords(&result.lat, &result.lon)?)),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_coords() {
        let coord = NominatimBackend::parse_coords("40.7128", "-74.0060").unwrap();
        assert!((coord.lat - 40.7128).abs() < 0.0001);
        assert!((coord.lng - (-74.0060)).abs() < 0.0001);
    }

    #[test]
    fn test_parse_coords_invalid() {
        assert!(NominatimBackend::parse_coords("invalid", "0").is_err());
        assert!(NominatimBackend::parse_coords("0", "invalid").is_err());
    }

    #[test]
    fn test_place_ref_from_result() {
        let results: Vec<NominatimResult> = serde_json::from_str(
            r#"[
                {"osm_type": "way", "osm_id": 123, "lat": "1.0", "lon": "2.0", "display_name": "Elm St"},
                {"osm_type": "relation", "osm_id": 9, "lat": "1.0", "lon": "2.0", "display_name": "Florence"},
                {"lat": "1.0", "lon": "2.0", "display_name": "No id"}
            ]"#,
        )
        .unwrap();

        assert_eq!(NominatimBackend::place_ref(&results[0]).as_deref(), Some("W123"));
        assert_eq!(NominatimBackend::place_ref(&results[1]).as_deref(), Some("R9"));
        assert_eq!(NominatimBackend::place_ref(&results[2]), None);
    }

    #[test]
    fn test_ref_validation() {
        assert!(NominatimBackend::is_valid_ref("N42"));
        assert!(!NominatimBackend::is_valid_ref("N"));
        assert!(!NominatimBackend::is_valid_ref("X42"));
        assert!(!NominatimBackend::is_valid_ref("W4&x=1"));
    }

    #[tokio::test]
    async fn test_malformed_ref_resolves_to_none_without_request() {
        let backend = NominatimBackend::with_base_url("http://127.0.0.1:9").unwrap();
        let location = backend
            .place_location("ChIJ-not-osm", &SessionToken::new())
            .await
            .unwrap();
        assert!(location.is_none());
    }
}
