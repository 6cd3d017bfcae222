//! Google Places (New) backend
//!
//! Autocomplete and place details share the caller's session token so the
//! provider bills the pair as one session.

use crate::constants::api::{GOOGLE_PLACES_URL, USER_AGENT};
use crate::coord::Coordinate;
use crate::error::{Error, Result};
use crate::geo::places::{PlaceBackend, PlaceSuggestion, SessionToken};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Google Places backend
#[derive(Debug, Clone)]
pub struct GoogleBackend {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AutocompleteRequest<'a> {
    input: &'a str,
    session_token: &'a str,
}

#[derive(Debug, Default, Deserialize)]
struct AutocompleteResponse {
    #[serde(default)]
    suggestions: Vec<Suggestion>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Suggestion {
    place_prediction: Option<PlacePrediction>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlacePrediction {
    place_id: String,
    text: FormattedText,
}

#[derive(Debug, Deserialize)]
struct FormattedText {
    text: String,
}

#[derive(Debug, Deserialize)]
struct PlaceDetails {
    location: Option<LatLng>,
}

#[derive(Debug, Deserialize)]
struct LatLng {
    latitude: f64,
    longitude: f64,
}

impl GoogleBackend {
    pub fn new(api_key: &str) -> Result<Self> {
        Self::with_base_url(GOOGLE_PLACES_URL, api_key)
    }

    pub fn with_base_url(base_url: &str, api_key: &str) -> Result<Self> {
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

    fn request_error(e: reqwest::Error) -> Error {
        if e.is_timeout() {
            Error::Timeout("Places request timed out".to_string())
        } else {
            Error::Unavailable(format!("Places request failed: {}", e))
        }
    }

    fn suggestions_from(response: AutocompleteResponse) -> Vec<PlaceSuggestion> {
        response
            .suggestions
            .into_iter()
            .filter_map(|s| s.place_prediction)
            .map(|p| PlaceSuggestion {
                label: p.text.text,
                place_ref: p.place_id,
            })
            .collect()
    }
}

#[async_trait]
impl PlaceBackend for GoogleBackend {
    fn name(&self) -> &'static str {
        "google"
    }

    async fn autocomplete(
        &self,
        input: &str,
        session: &SessionToken,
    ) -> Result<Vec<PlaceSuggestion>> {
        let body = AutocompleteRequest {
            input,
            session_token: session.as_str(),
        };

        let response = self
            .client
            .post(format!("{}/places:autocomplete", self.base_url))
            .header("X-Goog-Api-Key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(Self::request_error)?;

        if !response.status().is_success() {
            warn!("Places autocomplete returned {}", response.status());
            return Err(Error::Unavailable(format!(
                "Places autocomplete returned status: {}",
                response.status()
            )));
        }

        let data: AutocompleteResponse = response.json().await.map_err(|e| {
            Error::Unavailable(format!("Failed to parse autocomplete response: {}", e))
        })?;

        Ok(Self::suggestions_from(data))
    }

    async fn place_location(
        &self,
        place_ref: &str,
        session: &SessionToken,
    ) -> Result<Option<Coordinate>> {
        let url = format!(
            "{}/places/{}?sessionToken={}",
            self.base_url,
            urlencoding::encode(place_ref),
            urlencoding::encode(session.as_str())
        );

        let response = self
            .client
            .get(&url)
            .header("X-Goog-Api-Key", &self.api_key)
            .header("X-Goog-FieldMask", "location")
            .send()
            .await
            .map_err(Self::request_error)?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(Error::Unavailable(format!(
                "Place details returned status: {}",
                response.status()
            )));
        }

        let details: PlaceDetails = response.json().await.map_err(|e| {
            Error::Unavailable(format!("Failed to parse place details: {}", e))
        })?;

        Ok(details
            .location
            .map(|l| Coordinate::new(l.latitude, l.longitude)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_autocomplete_response() {
        let json = r#"{
            "suggestions": [
                {"placePrediction": {"placeId": "ChIJ1", "text": {"text": "Florence, AL, USA"}}},
                {"queryPrediction": {"text": {"text": "florence parking"}}},
                {"placePrediction": {"placeId": "ChIJ2", "text": {"text": "Florence, Italy"}}}
            ]
        }"#;

        let response: AutocompleteResponse = serde_json::from_str(json).unwrap();
        let suggestions = GoogleBackend::suggestions_from(response);

        assert_eq!(suggestions.len(), 2);
        assert_eq!(suggestions[0].place_ref, "ChIJ1");
        assert_eq!(suggestions[1].label, "Florence, Italy");
    }

    #[test]
    fn test_empty_autocomplete_response() {
        let response: AutocompleteResponse = serde_json::from_str("{}").unwrap();
        assert!(GoogleBackend::suggestions_from(response).is_empty());
    }

    #[test]
    fn test_request_body_uses_camel_case() {
        let body = AutocompleteRequest {
            input: "flo",
            session_token: "abc",
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["sessionToken"], "abc");
    }

    #[test]
    fn test_parse_place_details() {
        let details: PlaceDetails =
            serde_json::from_str(r#"{"location": {"latitude": 34.8, "longitude": -87.68}}"#)
                .unwrap();
        let location = details.location.unwrap();
        assert_eq!(location.latitude, 34.8);

        let empty: PlaceDetails = serde_json::from_str("{}").unwrap();
        assert!(empty.location.is_none());
    }

    #[tokio::test]
    async fn test_unreachable_service_is_unavailable() {
        let backend = GoogleBackend::with_base_url("http://127.0.0.1:9", "key").unwrap();
        let err = backend
            .autocomplete("flo", &SessionToken::new())
            .await
            .unwrap_err();
        assert!(err.is_retryable());
    }
}
