//! spotfinder: proximity search for parking listings
//!
//! A library, CLI, and HTTP API for finding parking spots near a venue,
//! an address, or the visitor's own location.
//!
//! ## Features
//!
//! - Device and IP geolocation behind one provider
//! - Debounced address autocomplete with billing sessions (Nominatim, Google Places)
//! - Radius-bounded nearest-spot queries over pluggable storage (in-memory R-tree, PostgREST)
//! - Amenity, parking type, and free-text filtering without re-querying
//! - A per-visitor search session that discards stale responses
//!
//! ## Quick Start
//!
//! ```rust
//! use spotfinder::coord::distance::{destination, haversine_distance};
//! use spotfinder::Coordinate;
//!
//! let arena = Coordinate::new(34.8, -87.68);
//! let spot = destination(arena, 0.0, 2000.0); // 2 km north
//!
//! let d = haversine_distance(arena, spot);
//! assert!((d - 2000.0).abs() < 1.0);
//! ```

pub mod cli;
pub mod clock;
pub mod config;
pub mod constants;
pub mod coord;
pub mod debounce;
pub mod error;
pub mod format;
pub mod geo;
pub mod search;
pub mod server;
pub mod storage;

// Re-export commonly used types
pub use config::Config;
pub use coord::Coordinate;
pub use error::{Error, ErrorKind, Result};
pub use geo::LocationFix;
pub use search::{HydratedListing, SearchOrchestrator, SearchState, SearchStatus};
