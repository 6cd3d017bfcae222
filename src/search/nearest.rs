//! Nearest-spot query service
//!
//! Validates the query, delegates the spatial search to the listing store,
//! and normalizes whatever the backend answers into the contract callers
//! depend on: within radius, nearest first, ties by id, capped.

use crate::coord::Coordinate;
use crate::error::{Error, Result};
use crate::storage::{DistanceCandidate, ListingStore};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};

/// Finds the active listings closest to a point
#[derive(Clone)]
pub struct NearestSpotService {
    store: Arc<dyn ListingStore>,
}

impl NearestSpotService {
    pub fn new(store: Arc<dyn ListingStore>) -> Self {
        Self { store }
    }

    /// Up to `max_results` candidates within `max_distance_meters` of `center`
    ///
    /// An empty list means no active listing is in range; storage failures
    /// are returned as errors, never as an empty list.
    pub async fn find_nearest(
        &self,
        center: Coordinate,
        max_results: usize,
        max_distance_meters: f64,
    ) -> Result<Vec<DistanceCandidate>> {
        center.validate()?;
        validate_radius(max_distance_meters)?;
        if max_results == 0 {
            return Err(Error::InvalidArgument(
                "max_results must be at least 1".to_string(),
            ));
        }

        let raw = self
            .store
            .query_nearest(center, max_results, max_distance_meters)
            .await?;
        let returned = raw.len();
        let candidates = normalize(raw, max_results, max_distance_meters);

        if candidates.len() != returned.min(max_results) {
            warn!(
                "{} store returned {} rows, kept {}",
                self.store.name(),
                returned,
                candidates.len()
            );
        }
        debug!(
            "find_nearest {} r={}m -> {} candidates",
            center,
            max_distance_meters,
            candidates.len()
        );

        Ok(candidates)
    }
}

/// Reject radii that are not positive and finite
pub fn validate_radius(radius_meters: f64) -> Result<()> {
    if radius_meters.is_finite() && radius_meters > 0.0 {
        Ok(())
    } else {
        Err(Error::InvalidArgument(format!(
            "Search radius must be a positive number of meters, got {}",
            radius_meters
        )))
    }
}

/// Drop out-of-range and duplicate rows, sort by (distance, id), cap
fn normalize(
    mut candidates: Vec<DistanceCandidate>,
    max_results: usize,
    max_distance_meters: f64,
) -> Vec<DistanceCandidate> {
    candidates.retain(|c| {
        c.distance_meters.is_finite()
            && c.distance_meters >= 0.0
            && c.distance_meters <= max_distance_meters
    });
    candidates.sort_by(|a, b| {
        a.distance_meters
            .total_cmp(&b.distance_meters)
            .then_with(|| a.listing_id.cmp(&b.listing_id))
    });

    let mut seen = HashSet::new();
    candidates.retain(|c| seen.insert(c.listing_id.clone()));
    candidates.truncate(max_results);
    candidates
}
