//! IP-based geolocation
//!
//! Uses ipapi.co for a coarse, city-level fix. The machine's own location
//! is cached on disk; per-client lookups made by the server are cached in
//! memory, keyed by client address.

use crate::constants::api::{IP_API_URL, USER_AGENT};
use crate::constants::cache::{
    CLIENT_LOCATION_CACHE_SIZE, IP_LOCATION_CACHE_FILE, IP_LOCATION_TTL_SECS,
};
use crate::coord::Coordinate;
use crate::error::{Error, Result};
use crate::geo::{ClientLocator, LocationFix, LocationSource};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::net::IpAddr;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::{Duration, SystemTime};
use tracing::{debug, warn};

/// IP location service with caching
#[derive(Debug)]
pub struct IpLocator {
    client: reqwest::Client,
    base_url: String,
    cache_path: Option<PathBuf>,
    clients: Mutex<HashMap<IpAddr, CachedLocation>>,
}

/// ipapi.co response
#[derive(Debug, Deserialize)]
struct IpApiResponse {
    latitude: Option<f64>,
    longitude: Option<f64>,
    city: Option<String>,
    country_name: Option<String>,
    #[serde(default)]
    error: bool,
    reason: Option<String>,
}

/// Cached location data
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CachedLocation {
    fix: LocationFix,
    timestamp: u64,
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

impl IpLocator {
    /// Create a new IP locator with default cache path
    pub fn new() -> Self {
        let cache_path = dirs::cache_dir().map(|p| p.join("spotfinder").join(IP_LOCATION_CACHE_FILE));
        Self::build(IP_API_URL, cache_path)
    }

    /// Create an IP locator with a specific cache path
    pub fn with_cache_path(cache_path: PathBuf) -> Self {
        Self::build(IP_API_URL, Some(cache_path))
    }

    /// Create an IP locator without caching
    pub fn without_cache() -> Self {
        Self::build(IP_API_URL, None)
    }

    /// Point the locator at a different ipapi-compatible service
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    fn build(base_url: &str, cache_path: Option<PathBuf>) -> Self {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .unwrap_or_default();

        Self {
            client,
            base_url: base_url.to_string(),
            cache_path,
            clients: Mutex::new(HashMap::new()),
        }
    }

    /// Get an approximate location for the current IP address
    pub async fn locate(&self) -> Result<LocationFix> {
        if let Some(cached) = self.load_cache() {
            debug!("Using cached IP location");
            return Ok(cached);
        }

        let fix = self.fetch_location(&format!("{}/json/", self.base_url)).await?;
        self.save_cache(&fix);

        Ok(fix)
    }

    /// Get an approximate location for a remote client's address
    ///
    /// Loopback and private addresses share this machine's network, so they
    /// resolve like [`IpLocator::locate`].
    pub async fn locate_ip(&self, ip: IpAddr) -> Result<LocationFix> {
        if is_local(ip) {
            debug!("Client {} is local, using this machine's location", ip);
            return self.locate().await;
        }

        if let Some(cached) = self.cached_client(ip) {
            debug!("Using cached location for {}", ip);
            return Ok(cached);
        }

        let fix = self
            .fetch_location(&format!("{}/{}/json/", self.base_url, ip))
            .await?;
        self.remember_client(ip, &fix);

        Ok(fix)
    }

    async fn fetch_location(&self, url: &str) -> Result<LocationFix> {
        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                Error::Timeout("IP location request timed out".to_string())
            } else {
                Error::Unavailable(format!("IP location request failed: {}", e))
            }
        })?;

        if !response.status().is_success() {
            warn!("IP location API returned {}", response.status());
            return Err(Error::Unavailable(format!(
                "IP location API returned status: {}",
                response.status()
            )));
        }

        let data: IpApiResponse = response.json().await.map_err(|e| {
            Error::Unavailable(format!("Failed to parse IP location response: {}", e))
        })?;

        Self::fix_from_response(data)
    }

    fn fix_from_response(data: IpApiResponse) -> Result<LocationFix> {
        if data.error {
            return Err(Error::Unavailable(format!(
                "IP location lookup failed: {}",
                data.reason.unwrap_or_else(|| "unknown reason".to_string())
            )));
        }

        let (Some(lat), Some(lng)) = (data.latitude, data.longitude) else {
            return Err(Error::Unavailable(
                "IP location response had no coordinates".to_string(),
            ));
        };

        let coordinate = Coordinate::new(lat, lng);
        coordinate.validate().map_err(|e| {
            Error::Unavailable(format!("IP location returned an invalid position: {}", e))
        })?;

        let label = [data.city, data.country_name]
            .into_iter()
            .flatten()
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(", ");

        Ok(LocationFix::approximate(
            coordinate,
            (!label.is_empty()).then_some(label),
        ))
    }

    /// Load cached location if valid
    fn load_cache(&self) -> Option<LocationFix> {
        let cache_path = self.cache_path.as_ref()?;
        let content = fs::read_to_string(cache_path).ok()?;
        let cached: CachedLocation = serde_json::from_str(&content).ok()?;

        if unix_now().saturating_sub(cached.timestamp) < IP_LOCATION_TTL_SECS {
            Some(cached.fix)
        } else {
            None
        }
    }

    fn save_cache(&self, fix: &LocationFix) {
        let Some(cache_path) = &self.cache_path else {
            return;
        };

        if let Some(parent) = cache_path.parent() {
            let _ = fs::create_dir_all(parent);
        }

        let cached = CachedLocation {
            fix: fix.clone(),
            timestamp: unix_now(),
        };

        if let Ok(content) = serde_json::to_string_pretty(&cached) {
            if let Err(e) = fs::write(cache_path, content) {
                warn!("Failed to write IP location cache: {}", e);
            }
        }
    }

    fn clients(&self) -> std::sync::MutexGuard<'_, HashMap<IpAddr, CachedLocation>> {
        self.clients.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn cached_client(&self, ip: IpAddr) -> Option<LocationFix> {
        let clients = self.clients();
        let cached = clients.get(&ip)?;
        (unix_now().saturating_sub(cached.timestamp) < IP_LOCATION_TTL_SECS)
            .then(|| cached.fix.clone())
    }

    fn remember_client(&self, ip: IpAddr, fix: &LocationFix) {
        let now = unix_now();
        let mut clients = self.clients();
        if clients.len() >= CLIENT_LOCATION_CACHE_SIZE {
            clients.retain(|_, c| now.saturating_sub(c.timestamp) < IP_LOCATION_TTL_SECS);
        }
        if clients.len() >= CLIENT_LOCATION_CACHE_SIZE {
            clients.clear();
        }
        clients.insert(
            ip,
            CachedLocation {
                fix: fix.clone(),
                timestamp: now,
            },
        );
    }

    /// Clear the cache
    pub fn clear_cache(&self) {
        if let Some(cache_path) = &self.cache_path {
            let _ = fs::remove_file(cache_path);
        }
    }

    /// Get cache duration
    pub fn cache_duration() -> Duration {
        Duration::from_secs(IP_LOCATION_TTL_SECS)
    }
}

impl Default for IpLocator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LocationSource for IpLocator {
    fn name(&self) -> &'static str {
        "ip"
    }

    async fn acquire(&self) -> Result<LocationFix> {
        self.locate().await
    }
}

#[async_trait]
impl ClientLocator for IpLocator {
    async fn locate_client(&self, ip: IpAddr) -> Result<LocationFix> {
        self.locate_ip(ip).await
    }
}

/// Addresses a public lookup service cannot place
fn is_local(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            v4.is_loopback() || v4.is_private() || v4.is_link_local() || v4.is_unspecified()
        }
        IpAddr::V6(v6) => {
            // fc00::/7 unique local, fe80::/10 link local
            let first = v6.segments()[0];
            v6.is_loopback()
                || v6.is_unspecified()
                || (first & 0xfe00) == 0xfc00
                || (first & 0xffc0) == 0xfe80
                || v6.to_ipv4_mapped().is_some_and(|v4| is_local(IpAddr::V4(v4)))
        }
    }
}
