//! Configuration management
//!
//! Loads and saves configuration from XDG-compliant paths.
//! Config location: ~/.config/spotfinder/config.toml

pub mod defaults;

use crate::constants::search::MIN_DEBOUNCE_MS;
use crate::error::{Error, Result};
use defaults::*;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Search tuning
    #[serde(default)]
    pub search: SearchConfig,

    /// Server settings
    #[serde(default)]
    pub server: ServerConfig,

    /// Listing storage backend
    #[serde(default)]
    pub storage: StorageConfig,

    /// Place autocomplete backend
    #[serde(default)]
    pub places: PlacesConfig,
}

/// Search tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Default search radius in meters
    #[serde(default = "default_radius")]
    pub radius_meters: f64,

    /// Maximum number of nearest candidates
    #[serde(default = "default_max_results")]
    pub max_results: usize,

    /// Number of newest listings shown without a location
    #[serde(default = "default_browse_limit")]
    pub browse_limit: usize,

    /// Fall back to IP geolocation when the device fix fails
    #[serde(default = "default_fallback_to_ip")]
    pub fallback_to_ip: bool,

    /// Device geolocation timeout in seconds
    #[serde(default = "default_geolocation_timeout")]
    pub geolocation_timeout_secs: u64,

    /// Autocomplete debounce in milliseconds
    #[serde(default = "default_suggest_debounce")]
    pub suggest_debounce_ms: u64,

    /// Amenity reference list lifetime in seconds
    #[serde(default = "default_amenity_cache_ttl")]
    pub amenity_cache_ttl_secs: u64,
}

/// Server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Listing storage backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Backend name: "memory" or "postgrest"
    #[serde(default = "default_storage_backend")]
    pub backend: String,

    /// Base URL of the PostgREST project
    #[serde(default)]
    pub url: String,

    /// API key sent to PostgREST
    #[serde(default)]
    pub api_key: String,

    /// JSON fixture loaded by the memory backend
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub listings_file: Option<PathBuf>,
}

/// Place autocomplete backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlacesConfig {
    /// Backend name: "google" or "nominatim"
    #[serde(default = "default_places_backend")]
    pub backend: String,

    /// API key for the Google Places backend
    #[serde(default)]
    pub api_key: String,
}

// Default value functions for serde
fn default_radius() -> f64 {
    DEFAULT_RADIUS_METERS
}
fn default_max_results() -> usize {
    DEFAULT_MAX_RESULTS
}
fn default_browse_limit() -> usize {
    DEFAULT_BROWSE_LIMIT
}
fn default_fallback_to_ip() -> bool {
    DEFAULT_FALLBACK_TO_IP
}
fn default_geolocation_timeout() -> u64 {
    DEFAULT_GEOLOCATION_TIMEOUT_SECS
}
fn default_suggest_debounce() -> u64 {
    DEFAULT_SUGGEST_DEBOUNCE_MS
}
fn default_amenity_cache_ttl() -> u64 {
    DEFAULT_AMENITY_CACHE_TTL_SECS
}
fn default_host() -> String {
    DEFAULT_HOST.to_string()
}
fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_storage_backend() -> String {
    DEFAULT_STORAGE_BACKEND.to_string()
}
fn default_places_backend() -> String {
    DEFAULT_PLACES_BACKEND.to_string()
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            radius_meters: default_radius(),
            max_results: default_max_results(),
            browse_limit: default_browse_limit(),
            fallback_to_ip: default_fallback_to_ip(),
            geolocation_timeout_secs: default_geolocation_timeout(),
            suggest_debounce_ms: default_suggest_debounce(),
            amenity_cache_ttl_secs: default_amenity_cache_ttl(),
        }
    }
}

impl SearchConfig {
    pub fn geolocation_timeout(&self) -> Duration {
        Duration::from_secs(self.geolocation_timeout_secs)
    }

    pub fn suggest_debounce(&self) -> Duration {
        Duration::from_millis(self.suggest_debounce_ms)
    }

    pub fn amenity_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.amenity_cache_ttl_secs)
    }

    /// Check values a TOML file could have set out of range
    pub fn validate(&self) -> Result<()> {
        if !self.radius_meters.is_finite() || self.radius_meters <= 0.0 {
            return Err(Error::Config(format!(
                "search.radius_meters must be positive, got {}",
                self.radius_meters
            )));
        }
        if self.max_results == 0 {
            return Err(Error::Config(
                "search.max_results must be at least 1".to_string(),
            ));
        }
        if self.suggest_debounce_ms < MIN_DEBOUNCE_MS {
            return Err(Error::Config(format!(
                "search.suggest_debounce_ms must be at least {}, got {}",
                MIN_DEBOUNCE_MS, self.suggest_debounce_ms
            )));
        }
        Ok(())
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: default_storage_backend(),
            url: String::new(),
            api_key: String::new(),
            listings_file: None,
        }
    }
}

impl Default for PlacesConfig {
    fn default() -> Self {
        Self {
            backend: default_places_backend(),
            api_key: String::new(),
        }
    }
}

impl Config {
    /// Get the config directory path
    pub fn config_dir() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|p| p.join(APP_DIR_NAME))
            .ok_or_else(|| Error::Config("Could not determine config directory".to_string()))
    }

    /// Get the config file path
    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join(CONFIG_FILE_NAME))
    }

    /// Load configuration from the default path
    ///
    /// Creates default config if file doesn't exist
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;

        if path.exists() {
            Self::load_from(&path)
        } else {
            let config = Config::default();
            config.save()?;
            Ok(config)
        }
    }

    /// Load configuration from a specific file
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read config file: {}", e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Failed to parse config file: {}", e)))?;

        config.search.validate()?;
        Ok(config)
    }

    /// Save configuration to the default path
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    /// Save configuration to a specific file
    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                Error::Config(format!("Failed to create config directory: {}", e))
            })?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;

        fs::write(path, content)
            .map_err(|e| Error::Config(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    /// Get a configuration value by key path
    ///
    /// Key format: "section.key"
    /// Returns the value as a string, or None if not found
    pub fn get(&self, key: &str) -> Option<String> {
        let parts: Vec<&str> = key.split('.').collect();

        match parts.as_slice() {
            ["search", "radius_meters"] => Some(self.search.radius_meters.to_string()),
            ["search", "max_results"] => Some(self.search.max_results.to_string()),
            ["search", "browse_limit"] => Some(self.search.browse_limit.to_string()),
            ["search", "fallback_to_ip"] => Some(self.search.fallback_to_ip.to_string()),
            ["search", "geolocation_timeout_secs"] => {
                Some(self.search.geolocation_timeout_secs.to_string())
            }
            ["search", "suggest_debounce_ms"] => Some(self.search.suggest_debounce_ms.to_string()),
            ["search", "amenity_cache_ttl_secs"] => {
                Some(self.search.amenity_cache_ttl_secs.to_string())
            }

            ["server", "host"] => Some(self.server.host.clone()),
            ["server", "port"] => Some(self.server.port.to_string()),

            ["storage", "backend"] => Some(self.storage.backend.clone()),
            ["storage", "url"] => Some(self.storage.url.clone()),
            ["storage", "api_key"] => Some(self.storage.api_key.clone()),
            ["storage", "listings_file"] => Some(
                self.storage
                    .listings_file
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_default(),
            ),

            ["places", "backend"] => Some(self.places.backend.clone()),
            ["places", "api_key"] => Some(self.places.api_key.clone()),

            _ => None,
        }
    }

    /// Set a configuration value by key path
    ///
    /// Key format: "section.key"
    /// Returns error if key is invalid or value type is wrong
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let parts: Vec<&str> = key.split('.').collect();

        match parts.as_slice() {
            ["search", "radius_meters"] => {
                let radius: f64 = parse(key, value)?;
                if !radius.is_finite() || radius <= 0.0 {
                    return Err(Error::Config(format!("Radius must be positive: {}", value)));
                }
                self.search.radius_meters = radius;
            }
            ["search", "max_results"] => {
                let max: usize = parse(key, value)?;
                if max == 0 {
                    return Err(Error::Config("max_results must be at least 1".to_string()));
                }
                self.search.max_results = max;
            }
            ["search", "browse_limit"] => {
                self.search.browse_limit = parse(key, value)?;
            }
            ["search", "fallback_to_ip"] => {
                self.search.fallback_to_ip = parse(key, value)?;
            }
            ["search", "geolocation_timeout_secs"] => {
                self.search.geolocation_timeout_secs = parse(key, value)?;
            }
            ["search", "suggest_debounce_ms"] => {
                let debounce: u64 = parse(key, value)?;
                if debounce < MIN_DEBOUNCE_MS {
                    return Err(Error::Config(format!(
                        "Debounce must be at least {}ms: {}",
                        MIN_DEBOUNCE_MS, value
                    )));
                }
                self.search.suggest_debounce_ms = debounce;
            }
            ["search", "amenity_cache_ttl_secs"] => {
                self.search.amenity_cache_ttl_secs = parse(key, value)?;
            }

            ["server", "host"] => {
                self.server.host = value.to_string();
            }
            ["server", "port"] => {
                self.server.port = parse(key, value)?;
            }

            ["storage", "backend"] => {
                if !crate::storage::available_backends().contains(&value) {
                    return Err(Error::Config(format!("Unknown storage backend: {}", value)));
                }
                self.storage.backend = value.to_string();
            }
            ["storage", "url"] => {
                self.storage.url = value.to_string();
            }
            ["storage", "api_key"] => {
                self.storage.api_key = value.to_string();
            }
            ["storage", "listings_file"] => {
                self.storage.listings_file = if value.is_empty() {
                    None
                } else {
                    Some(PathBuf::from(value))
                };
            }

            ["places", "backend"] => {
                if !crate::geo::places::available_backends().contains(&value) {
                    return Err(Error::Config(format!("Unknown places backend: {}", value)));
                }
                self.places.backend = value.to_string();
            }
            ["places", "api_key"] => {
                self.places.api_key = value.to_string();
            }

            _ => {
                return Err(Error::Config(format!("Unknown config key: {}", key)));
            }
        }

        Ok(())
    }

    /// List all available config keys
    pub fn available_keys() -> Vec<&'static str> {
        vec![
            "search.radius_meters",
            "search.max_results",
            "search.browse_limit",
            "search.fallback_to_ip",
            "search.geolocation_timeout_secs",
            "search.suggest_debounce_ms",
            "search.amenity_cache_ttl_secs",
            "server.host",
            "server.port",
            "storage.backend",
            "storage.url",
            "storage.api_key",
            "storage.listings_file",
            "places.backend",
            "places.api_key",
        ]
    }

    /// Get server address as "host:port"
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

fn parse<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| Error::Config(format!("Invalid value for {}: {}", key, value)))
}
