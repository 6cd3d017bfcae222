//! Centralized constants for the spotfinder crate
//!
//! Values shared by more than one module live here.

/// Geographic constants
pub mod geo {
    /// Mean Earth radius in meters (WGS84 approximation)
    pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;
}

/// External API endpoints
pub mod api {
    /// OpenStreetMap Nominatim geocoding API
    pub const NOMINATIM_URL: &str = "https://nominatim.openstreetmap.org";

    /// IP geolocation API (free, no key required); `/json/` for the caller,
    /// `/{ip}/json/` for a specific address
    pub const IP_API_URL: &str = "https://ipapi.co";

    /// Google Places API (New)
    pub const GOOGLE_PLACES_URL: &str = "https://places.googleapis.com/v1";

    /// User agent sent to every external service
    pub const USER_AGENT: &str = concat!("spotfinder/", env!("CARGO_PKG_VERSION"));
}

/// Cache settings
pub mod cache {
    /// IP location cache duration in seconds (1 hour)
    pub const IP_LOCATION_TTL_SECS: u64 = 3600;

    /// IP location cache file name
    pub const IP_LOCATION_CACHE_FILE: &str = "ip_location_cache.json";

    /// Most per-client IP locations held in memory by the server
    pub const CLIENT_LOCATION_CACHE_SIZE: usize = 1024;
}

/// Search limits
pub mod search {
    /// Smallest autocomplete debounce interval accepted
    pub const MIN_DEBOUNCE_MS: u64 = 150;
}
