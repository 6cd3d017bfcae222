//! Default configuration values
//!
//! Named constants for all tunable parameters

/// Default search radius in meters
pub const DEFAULT_RADIUS_METERS: f64 = 5000.0;

/// Default number of nearest candidates returned
pub const DEFAULT_MAX_RESULTS: usize = 12;

/// Default number of newest listings shown without a location
pub const DEFAULT_BROWSE_LIMIT: usize = 12;

/// Whether a failed device fix falls back to IP geolocation
pub const DEFAULT_FALLBACK_TO_IP: bool = false;

/// Default device geolocation timeout in seconds
pub const DEFAULT_GEOLOCATION_TIMEOUT_SECS: u64 = 10;

/// Default autocomplete debounce in milliseconds
pub const DEFAULT_SUGGEST_DEBOUNCE_MS: u64 = 300;

/// Default amenity reference list lifetime in seconds (1 hour)
pub const DEFAULT_AMENITY_CACHE_TTL_SECS: u64 = 3600;

/// Default server host
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default server port
pub const DEFAULT_PORT: u16 = 7979;

/// Default storage backend
pub const DEFAULT_STORAGE_BACKEND: &str = "memory";

/// Default place autocomplete backend
pub const DEFAULT_PLACES_BACKEND: &str = "nominatim";

/// Config file name
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Application directory name (for XDG paths)
pub const APP_DIR_NAME: &str = "spotfinder";
