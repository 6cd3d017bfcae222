//! Device geolocation
//!
//! Wraps the platform's one-shot, permission-gated position request and
//! bounds it with a timeout. There is no continuous tracking.

use crate::coord::Coordinate;
use crate::error::{Error, Result};
use crate::geo::{LocationFix, LocationSource};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, warn};

/// Failure reported by the platform positioning API
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PositionError {
    /// The visitor refused the permission prompt
    PermissionDenied,
    /// No positioning capability on this platform
    Unsupported,
    /// The platform could not produce a reading
    PositionUnavailable(String),
}

/// Platform-provided one-shot position request
#[async_trait]
pub trait DevicePositioner: Send + Sync {
    async fn current_position(&self) -> std::result::Result<Coordinate, PositionError>;
}

/// Positioner for hosts with no location hardware (servers, CLIs)
#[derive(Debug, Default, Clone, Copy)]
pub struct UnsupportedPositioner;

#[async_trait]
impl DevicePositioner for UnsupportedPositioner {
    async fn current_position(&self) -> std::result::Result<Coordinate, PositionError> {
        Err(PositionError::Unsupported)
    }
}

/// Precise location source backed by a [`DevicePositioner`]
pub struct DeviceLocator<P> {
    positioner: P,
    timeout: Duration,
}

impl<P: DevicePositioner> DeviceLocator<P> {
    pub fn new(positioner: P, timeout: Duration) -> Self {
        Self {
            positioner,
            timeout,
        }
    }
}

#[async_trait]
impl<P: DevicePositioner + 'static> LocationSource for DeviceLocator<P> {
    fn name(&self) -> &'static str {
        "device"
    }

    async fn acquire(&self) -> Result<LocationFix> {
        let reading = tokio::time::timeout(self.timeout, self.positioner.current_position())
            .await
            .map_err(|_| {
                warn!("Device geolocation timed out after {:?}", self.timeout);
                Error::Timeout(format!(
                    "Device geolocation did not answer within {}s",
                    self.timeout.as_secs()
                ))
            })?;

        let coordinate = match reading {
            Ok(coordinate) => coordinate,
            Err(PositionError::PermissionDenied) => {
                return Err(Error::PermissionDenied(
                    "Location access was denied".to_string(),
                ))
            }
            Err(PositionError::Unsupported) => {
                return Err(Error::Unavailable(
                    "Geolocation is not supported on this platform".to_string(),
                ))
            }
            Err(PositionError::PositionUnavailable(reason)) => {
                return Err(Error::Unavailable(format!(
                    "Unable to retrieve your location: {}",
                    reason
                )))
            }
        };

        coordinate.validate().map_err(|e| {
            Error::Unavailable(format!("Device reported an invalid position: {}", e))
        })?;

        debug!("Device geolocation fix at {}", coordinate);
        Ok(LocationFix::precise(coordinate))
    }
}
