//! Output formatters
//!
//! Provides trait-based output formatting for search results.

pub mod json;
pub mod text;

use crate::error::Result;
use crate::search::SearchState;
use serde::{Deserialize, Serialize};

/// Information about an output format
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormatInfo {
    /// Format name
    pub name: String,
    /// Format description
    pub description: String,
}

/// Trait for output formatters
pub trait OutputFormatter: Send + Sync {
    /// Get the format name
    fn name(&self) -> &str;

    /// Get the format description
    fn description(&self) -> &str;

    /// Format a finished search
    fn format(&self, state: &SearchState) -> Result<String>;
}

/// Get a formatter by name
pub fn get_formatter(name: &str) -> Option<Box<dyn OutputFormatter>> {
    match name.to_lowercase().as_str() {
        "json" => Some(Box::new(json::JsonFormatter)),
        "text" => Some(Box::new(text::TextFormatter)),
        _ => None,
    }
}

/// List all available formatters
pub fn available_formats() -> Vec<FormatInfo> {
    [
        &json::JsonFormatter as &dyn OutputFormatter,
        &text::TextFormatter,
    ]
    .into_iter()
    .map(|f| FormatInfo {
        name: f.name().to_string(),
        description: f.description().to_string(),
    })
    .collect()
}

/// Human-readable distance ("850 m", "2.4 km")
pub fn format_distance(meters: f64) -> String {
    if meters < 1000.0 {
        format!("{:.0} m", meters)
    } else {
        format!("{:.1} km", meters / 1000.0)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use crate::coord::Coordinate;
    use crate::geo::LocationFix;
    use crate::search::filter::SearchFilters;
    use crate::search::{HydratedListing, SearchState, SearchStatus};
    use crate::storage::fixtures::{amenity, listing_at};

    pub fn sample_state() -> SearchState {
        let mut record = listing_at("spot-1", Coordinate::new(34.8009, -87.68));
        record.title = "Covered garage".to_string();
        record.amenities = vec![amenity("ev", "EV Charging")];
        record.spaces_available = 2;

        SearchState {
            coordinate: Some(LocationFix::precise(Coordinate::new(34.80, -87.68))),
            radius_meters: 5000.0,
            filters: SearchFilters::default(),
            status: SearchStatus::Ready,
            loading: false,
            error: None,
            results: vec![HydratedListing::from_record(record, Some(100.0))],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_formatter() {
        assert!(get_formatter("json").is_some());
        assert!(get_formatter("text").is_some());
        assert!(get_formatter("gpx").is_none());
    }

    #[test]
    fn test_get_formatter_case_insensitive() {
        assert!(get_formatter("JSON").is_some());
        assert!(get_formatter("Text").is_some());
    }

    #[test]
    fn test_available_formats() {
        let formats = available_formats();
        assert_eq!(formats.len(), 2);
        assert!(formats.iter().any(|f| f.name == "json"));
        assert!(formats.iter().any(|f| f.name == "text"));
    }

    #[test]
    fn test_format_distance() {
        assert_eq!(format_distance(99.6), "100 m");
        assert_eq!(format_distance(2430.0), "2.4 km");
    }
}
