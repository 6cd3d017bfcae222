//! Proximity search pipeline
//!
//! - `nearest`: validated nearest-neighbor queries against the listing store
//! - `hydrate`: batched, order-preserving fetch of full listings
//! - `filter`: facet and free-text filtering
//! - `amenities`: the cached amenity reference list
//! - `orchestrator`: per-session state machine tying the pieces together

pub mod amenities;
pub mod filter;
pub mod hydrate;
pub mod nearest;
pub mod orchestrator;

pub use amenities::AmenityCache;
pub use filter::SearchFilters;
pub use hydrate::{HydratedListing, ListingHydrator};
pub use nearest::NearestSpotService;
pub use orchestrator::{SearchOrchestrator, SearchSettings, SearchState, SearchStatus};
