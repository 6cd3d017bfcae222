//! HTTP API routes
//!
//! Defines all REST API endpoints for the server.

use crate::coord::Coordinate;
use crate::error::{Error, ErrorKind};
use crate::geo::places::{PlaceSuggestion, SessionToken};
use crate::geo::LocationFix;
use crate::search::filter::{self, SearchFilters};
use crate::search::HydratedListing;
use crate::server::state::AppState;
use crate::storage::{Amenity, ParkingType};

use axum::{
    extract::{ConnectInfo, Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::debug;

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/nearest", post(nearest_handler))
        .route("/api/listings", get(listings_handler))
        .route("/api/amenities", get(amenities_handler))
        .route("/api/facets", get(facets_handler))
        .route("/api/location", get(location_handler))
        .route("/api/places/suggest", get(suggest_handler))
        .route("/api/places/resolve/:place_ref", get(resolve_handler))
        .route("/api/status", get(status_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// API error body
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub code: String,
}

/// Error returned by every handler
#[derive(Debug)]
pub struct ApiError {
    kind: ErrorKind,
    message: String,
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self.kind {
            ErrorKind::InvalidArgument => StatusCode::BAD_REQUEST,
            ErrorKind::PermissionDenied => StatusCode::FORBIDDEN,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
            ErrorKind::Timeout => StatusCode::GATEWAY_TIMEOUT,
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let body = ErrorBody {
            error: self.message.clone(),
            code: self.kind.code().to_string(),
        };
        (self.status(), Json(body)).into_response()
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        ApiError {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

/// Nearest request body
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NearestRequest {
    pub lat: f64,
    pub lng: f64,
    /// Search radius in meters; defaults to the configured radius
    pub max_distance_meters: Option<f64>,
    /// Candidate cap; defaults to the configured maximum
    pub max_results: Option<usize>,
    #[serde(default)]
    pub amenity_ids: BTreeSet<String>,
    #[serde(default)]
    pub parking_types: BTreeSet<ParkingType>,
}

/// Ordered search results
#[derive(Debug, Serialize, Deserialize)]
pub struct ListingsResponse {
    pub count: usize,
    pub results: Vec<HydratedListing>,
}

impl From<Vec<HydratedListing>> for ListingsResponse {
    fn from(results: Vec<HydratedListing>) -> Self {
        Self {
            count: results.len(),
            results,
        }
    }
}

/// Nearest listings endpoint
///
/// POST /api/nearest
async fn nearest_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<NearestRequest>,
) -> Result<Json<ListingsResponse>, ApiError> {
    let center = Coordinate::new(req.lat, req.lng);
    let radius = req
        .max_distance_meters
        .unwrap_or(state.config.search.radius_meters);
    let max_results = req.max_results.unwrap_or(state.config.search.max_results);

    let candidates = state
        .nearest()
        .find_nearest(center, max_results, radius)
        .await?;
    let listings = state.hydrator().hydrate(&candidates).await?;

    let filters = SearchFilters {
        amenity_ids: req.amenity_ids,
        parking_types: req.parking_types,
        free_text: String::new(),
    };

    Ok(Json(filter::apply(&listings, &filters).into()))
}

/// Text-path query parameters (comma-separated lists)
#[derive(Debug, Default, Deserialize)]
pub struct ListingsQuery {
    pub search: Option<String>,
    pub amenity: Option<String>,
    #[serde(rename = "type")]
    pub parking_type: Option<String>,
}

fn split_list(value: Option<&str>) -> impl Iterator<Item = &str> {
    value
        .unwrap_or("")
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

impl ListingsQuery {
    fn filters(&self) -> SearchFilters {
        SearchFilters {
            amenity_ids: split_list(self.amenity.as_deref())
                .map(str::to_string)
                .collect(),
            parking_types: split_list(self.parking_type.as_deref())
                .map(|t| ParkingType::from(t.to_string()))
                .collect(),
            free_text: self.search.clone().unwrap_or_default(),
        }
    }
}

/// Newest listings filtered by text and facets
///
/// GET /api/listings
async fn listings_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListingsQuery>,
) -> Result<Json<ListingsResponse>, ApiError> {
    let listings = state
        .hydrator()
        .browse(state.config.search.browse_limit)
        .await?;

    Ok(Json(filter::apply(&listings, &query.filters()).into()))
}

/// Amenity reference list
#[derive(Debug, Serialize, Deserialize)]
pub struct AmenitiesResponse {
    pub amenities: Vec<Amenity>,
}

/// GET /api/amenities
async fn amenities_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<AmenitiesResponse>, ApiError> {
    let amenities = state.amenities().get().await?;
    Ok(Json(AmenitiesResponse {
        amenities: amenities.as_ref().clone(),
    }))
}

/// Every facet a visitor can filter on
#[derive(Debug, Serialize, Deserialize)]
pub struct FacetsResponse {
    pub amenities: Vec<Amenity>,
    pub parking_types: Vec<ParkingType>,
}

/// GET /api/facets
async fn facets_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<FacetsResponse>, ApiError> {
    let amenities = state.amenities().get().await?;
    Ok(Json(FacetsResponse {
        amenities: amenities.as_ref().clone(),
        parking_types: ParkingType::known(),
    }))
}

/// The visitor's address: first `X-Forwarded-For` hop, else the peer
fn client_ip(headers: &HeaderMap, peer: Option<IpAddr>) -> Option<IpAddr> {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .and_then(|first| first.trim().parse().ok())
        .or(peer)
}

/// Get the caller's approximate location from their IP address
///
/// GET /api/location
async fn location_handler(
    State(state): State<Arc<AppState>>,
    connect: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
) -> Result<Json<LocationFix>, ApiError> {
    let peer = connect.map(|ConnectInfo(addr)| addr.ip());
    let ip = client_ip(&headers, peer).ok_or_else(|| {
        Error::InvalidArgument("Cannot determine the client address".to_string())
    })?;

    debug!("Locating client {}", ip);
    let fix = state.locator().locate_client(ip).await?;
    Ok(Json(fix))
}

#[derive(Debug, Deserialize)]
pub struct SuggestQuery {
    pub q: String,
    pub session: Option<String>,
}

/// Suggestions plus the session token to reuse for resolution
#[derive(Debug, Serialize, Deserialize)]
pub struct SuggestResponse {
    pub session: SessionToken,
    pub suggestions: Vec<PlaceSuggestion>,
}

fn session_from(value: Option<String>) -> SessionToken {
    match value {
        Some(token) if !token.trim().is_empty() => SessionToken::from(token),
        _ => SessionToken::new(),
    }
}

/// Place autocomplete; callers debounce keystrokes themselves
///
/// GET /api/places/suggest
async fn suggest_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SuggestQuery>,
) -> Result<Json<SuggestResponse>, ApiError> {
    let session = session_from(query.session);
    let suggestions = state
        .resolver()
        .lookup_suggestions(&query.q, &session)
        .await?;
    debug!("{} suggestions for {:?}", suggestions.len(), query.q);

    Ok(Json(SuggestResponse {
        session,
        suggestions,
    }))
}

#[derive(Debug, Deserialize)]
pub struct ResolveQuery {
    pub session: Option<String>,
}

/// GET /api/places/resolve/:place_ref
async fn resolve_handler(
    State(state): State<Arc<AppState>>,
    Path(place_ref): Path<String>,
    Query(query): Query<ResolveQuery>,
) -> Result<Json<LocationFix>, ApiError> {
    let session = session_from(query.session);
    let fix = state.resolver().lookup_place(&place_ref, &session).await?;
    Ok(Json(fix))
}

/// Status response
#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub running: bool,
    pub version: String,
    pub storage: String,
    pub places: String,
}

/// GET /api/status
async fn status_handler(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    Json(StatusResponse {
        running: true,
        version: env!("CARGO_PKG_VERSION").to_string(),
        storage: state.store().name().to_string(),
        places: state.resolver().backend_name().to_string(),
    })
}
