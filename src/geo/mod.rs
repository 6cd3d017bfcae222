//! Visitor location acquisition
//!
//! Provides the precise (device) and approximate (IP) location sources and
//! the address resolver used for typed-in locations.

pub mod device;
pub mod ip_location;
pub mod places;

use crate::coord::Coordinate;
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::sync::Arc;

/// A best-effort location for the current visitor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationFix {
    pub coordinate: Coordinate,

    /// True when derived from the IP address rather than device sensors
    #[serde(default)]
    pub is_approximate: bool,

    /// Human-readable description (city, address)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl LocationFix {
    /// A precise fix with no label
    pub fn precise(coordinate: Coordinate) -> Self {
        Self {
            coordinate,
            is_approximate: false,
            label: None,
        }
    }

    /// An approximate fix
    pub fn approximate(coordinate: Coordinate, label: Option<String>) -> Self {
        Self {
            coordinate,
            is_approximate: true,
            label,
        }
    }
}

/// Trait for one-shot location sources
///
/// Sources never retry on their own; callers decide whether to fall back.
#[async_trait]
pub trait LocationSource: Send + Sync {
    /// Source name (e.g., "device", "ip")
    fn name(&self) -> &'static str;

    /// Acquire a single location reading
    async fn acquire(&self) -> Result<LocationFix>;
}

/// Approximate location of a remote client, for servers answering on a
/// visitor's behalf
#[async_trait]
pub trait ClientLocator: Send + Sync {
    async fn locate_client(&self, ip: IpAddr) -> Result<LocationFix>;
}

/// The two location sources available to a search session
#[derive(Clone)]
pub struct GeoProvider {
    device: Arc<dyn LocationSource>,
    approximate: Arc<dyn LocationSource>,
}

impl GeoProvider {
    pub fn new(device: Arc<dyn LocationSource>, approximate: Arc<dyn LocationSource>) -> Self {
        Self {
            device,
            approximate,
        }
    }

    /// Ask the device for a precise, permission-gated fix
    pub async fn acquire_precise(&self) -> Result<LocationFix> {
        self.device.acquire().await
    }

    /// Look up a coarse location from the visitor's IP address
    pub async fn acquire_approximate(&self) -> Result<LocationFix> {
        self.approximate.acquire().await
    }
}

/// Get the IP location service
pub fn get_ip_locator() -> ip_location::IpLocator {
    ip_location::IpLocator::new()
}
