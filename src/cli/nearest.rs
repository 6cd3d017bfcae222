//! Nearest command handler
//!
//! Runs one search session from the command line and prints the results.

use crate::config::Config;
use crate::coord::Coordinate;
use crate::error::{Error, Result};
use crate::format::{available_formats, get_formatter};
use crate::geo::device::{DeviceLocator, UnsupportedPositioner};
use crate::geo::places::{get_place_backend, AddressResolver};
use crate::geo::{get_ip_locator, GeoProvider, LocationFix};
use crate::search::nearest::validate_radius;
use crate::search::{
    ListingHydrator, NearestSpotService, SearchOrchestrator, SearchSettings, SearchState,
};
use crate::storage::{open_store, ParkingType};
use clap::Args;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::debug;

/// Nearest command arguments
#[derive(Args)]
pub struct NearestArgs {
    /// Latitude
    #[arg(long, requires = "lng", allow_negative_numbers = true)]
    pub lat: Option<f64>,

    /// Longitude
    #[arg(long, requires = "lat", allow_negative_numbers = true)]
    pub lng: Option<f64>,

    /// Address or place name (first suggestion is used)
    #[arg(long, conflicts_with_all = ["lat", "lng", "here"])]
    pub address: Option<String>,

    /// Use current location (IP geolocation)
    #[arg(long, conflicts_with_all = ["lat", "lng", "address"])]
    pub here: bool,

    /// Free-text search when no location is given
    #[arg(long, short = 's', conflicts_with_all = ["lat", "lng", "address", "here"])]
    pub search: Option<String>,

    /// Search radius in meters
    #[arg(long, short = 'r')]
    pub radius: Option<f64>,

    /// Maximum number of spots
    #[arg(long, short = 'n')]
    pub limit: Option<usize>,

    /// Required amenity id (repeatable)
    #[arg(long, short = 'a')]
    pub amenity: Vec<String>,

    /// Accepted parking type (repeatable)
    #[arg(long, short = 't')]
    pub r#type: Vec<String>,

    /// Output format
    #[arg(long, short = 'f')]
    pub format: Option<String>,

    /// List available formats
    #[arg(short = 'F', long = "list-formats")]
    pub list_formats: bool,
}

/// Run the nearest command
pub async fn run(args: NearestArgs) -> Result<()> {
    if args.list_formats {
        println!("Available formats:");
        for f in available_formats() {
            println!("  {:8} {}", f.name, f.description);
        }
        return Ok(());
    }

    let format_name = args.format.as_deref().unwrap_or("text");
    let formatter = get_formatter(format_name).ok_or_else(|| {
        Error::InvalidArgument(format!("Unknown format: {}", format_name))
    })?;

    let coordinate = match (args.lat, args.lng) {
        (Some(lat), Some(lng)) => Some(Coordinate::try_new(lat, lng)?),
        _ => None,
    };

    let config = Config::load()?;
    let mut settings = SearchSettings::from(&config.search);
    if let Some(radius) = args.radius {
        validate_radius(radius)?;
        settings.radius_meters = radius;
    }
    if let Some(limit) = args.limit {
        if limit == 0 {
            return Err(Error::InvalidArgument("--limit must be at least 1".to_string()));
        }
        settings.max_results = limit;
        settings.browse_limit = limit;
    }
    // There is no device positioner on a terminal, so --here means IP
    settings.fallback_to_ip = true;

    let store = open_store(&config.storage)?;
    let places = get_place_backend(&config.places)?;
    let resolver = Arc::new(AddressResolver::new(places, config.search.suggest_debounce())?);
    let geo = GeoProvider::new(
        Arc::new(DeviceLocator::new(
            UnsupportedPositioner,
            config.search.geolocation_timeout(),
        )),
        Arc::new(get_ip_locator()),
    );

    let orchestrator = SearchOrchestrator::new(
        geo,
        resolver.clone(),
        NearestSpotService::new(store.clone()),
        ListingHydrator::new(store),
        settings,
    );

    orchestrator.set_amenity_filter(args.amenity.iter().cloned().collect());
    orchestrator.set_parking_types(parse_types(&args.r#type));

    let state = if let Some(coordinate) = coordinate {
        orchestrator.set_location(LocationFix::precise(coordinate)).await
    } else if args.here {
        orchestrator.set_location_from_device().await
    } else if let Some(address) = &args.address {
        let place_ref = first_suggestion(&resolver, address).await?;
        orchestrator.set_location_from_address(&place_ref).await
    } else if let Some(text) = &args.search {
        orchestrator.set_free_text(text).await
    } else {
        orchestrator.clear_location().await
    };

    debug!("Search finished with status {:?}", state.status);
    print!("{}", formatter.format(&state)?);

    search_outcome(&state)
}

/// A session that ended in error fails the command after printing
fn search_outcome(state: &SearchState) -> Result<()> {
    match &state.error {
        Some(err) => Err(Error::from(err.clone())),
        None => Ok(()),
    }
}

/// Parse repeatable `--type` values
fn parse_types(values: &[String]) -> BTreeSet<ParkingType> {
    values
        .iter()
        .filter(|v| !v.trim().is_empty())
        .map(|v| ParkingType::from(v.clone()))
        .collect()
}

/// Resolve free-form address text to the top suggestion's place reference
async fn first_suggestion(resolver: &AddressResolver, address: &str) -> Result<String> {
    let session = resolver.session_token();
    resolver
        .lookup_suggestions(address, &session)
        .await?
        .into_iter()
        .next()
        .map(|s| {
            debug!("Using suggestion '{}' for '{}'", s.label, address);
            s.place_ref
        })
        .ok_or_else(|| Error::NotFound(format!("No place matches '{}'", address)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SearchError;
    use crate::geo::places::testing::FakePlaces;
    use std::time::Duration;

    #[test]
    fn test_parse_types() {
        let types = parse_types(&["Garage".to_string(), "".to_string(), "lot".to_string()]);
        assert_eq!(
            types,
            BTreeSet::from([ParkingType::Garage, ParkingType::Lot])
        );
    }

    #[test]
    fn test_search_outcome() {
        let mut state = crate::format::testing::sample_state();
        assert!(search_outcome(&state).is_ok());

        state.status = crate::search::SearchStatus::Error;
        state.error = Some(SearchError::from(&Error::Unavailable("storage offline".into())));
        let err = search_outcome(&state).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Unavailable);
        assert_eq!(err.to_string(), "Service unavailable: storage offline");
    }

    #[tokio::test]
    async fn test_first_suggestion() {
        let places = FakePlaces::default().with_place(
            "p1",
            "Florence Arena",
            Coordinate::new(34.8, -87.68),
        );
        let resolver = AddressResolver::new(Arc::new(places), Duration::from_millis(300)).unwrap();

        assert_eq!(first_suggestion(&resolver, "arena").await.unwrap(), "p1");

        let err = first_suggestion(&resolver, "stadium").await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }
}
