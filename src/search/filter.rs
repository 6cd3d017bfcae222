//! Facet and free-text filtering
//!
//! Pure functions over hydrated listings. Filtering only removes entries;
//! the surviving listings keep their relative order.

use crate::search::hydrate::HydratedListing;
use crate::storage::ParkingType;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};

/// Visitor-selected filters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchFilters {
    /// Every one of these amenities must be present
    #[serde(default)]
    pub amenity_ids: BTreeSet<String>,

    /// Accepted parking types; empty accepts all
    #[serde(default)]
    pub parking_types: BTreeSet<ParkingType>,

    /// Words that must all appear in the listing text
    #[serde(default)]
    pub free_text: String,
}

impl SearchFilters {
    /// The same filters without the free-text part, as used on the geo path
    pub fn facets_only(&self) -> Self {
        Self {
            amenity_ids: self.amenity_ids.clone(),
            parking_types: self.parking_types.clone(),
            free_text: String::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.amenity_ids.is_empty()
            && self.parking_types.is_empty()
            && normalize_words(&self.free_text).is_empty()
    }
}

/// Listings passing every filter, in input order
pub fn apply(listings: &[HydratedListing], filters: &SearchFilters) -> Vec<HydratedListing> {
    let words = normalize_words(&filters.free_text);
    listings
        .iter()
        .filter(|l| matches_facets(l, filters) && matches_words(l, &words))
        .cloned()
        .collect()
}

/// Whether a single listing passes `filters`
pub fn matches(listing: &HydratedListing, filters: &SearchFilters) -> bool {
    matches_facets(listing, filters) && matches_words(listing, &normalize_words(&filters.free_text))
}

fn matches_facets(listing: &HydratedListing, filters: &SearchFilters) -> bool {
    let amenities = listing.amenity_ids();
    let has_amenities = filters
        .amenity_ids
        .iter()
        .all(|id| amenities.contains(id.as_str()));

    let type_ok = filters.parking_types.is_empty()
        || listing
            .parking_type
            .as_ref()
            .is_some_and(|t| filters.parking_types.contains(t));

    has_amenities && type_ok
}

fn matches_words(listing: &HydratedListing, words: &[String]) -> bool {
    if words.is_empty() {
        return true;
    }

    let haystack = [
        listing.address.as_str(),
        listing.city.as_str(),
        listing.state.as_str(),
        listing.zip_code.as_str(),
        listing.description.as_deref().unwrap_or(""),
        listing.title.as_str(),
    ]
    .join(" ");
    let listing_words: HashSet<String> = normalize_words(&haystack).into_iter().collect();

    words.iter().all(|w| listing_words.contains(w))
}

/// Lowercase, replace punctuation with spaces, and split into words
///
/// Word characters are ASCII letters, digits, and underscore.
pub fn normalize_words(text: &str) -> Vec<String> {
    let cleaned: String = text
        .to_lowercase()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c.is_whitespace() {
                c
            } else {
                ' '
            }
        })
        .collect();

    cleaned.split_whitespace().map(str::to_string).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coord::Coordinate;
    use crate::storage::fixtures::{amenity, listing_at};

    fn listing(id: &str, amenities: &[&str], parking_type: Option<ParkingType>) -> HydratedListing {
        let mut record = listing_at(id, Coordinate::new(0.0, 0.0));
        record.amenities = amenities.iter().map(|a| amenity(a, a)).collect();
        record.parking_type = parking_type;
        HydratedListing::from_record(record, Some(0.0))
    }

    fn amenity_filter(ids: &[&str]) -> SearchFilters {
        SearchFilters {
            amenity_ids: ids.iter().map(|s| s.to_string()).collect(),
            ..SearchFilters::default()
        }
    }

    fn text_filter(text: &str) -> SearchFilters {
        SearchFilters {
            free_text: text.to_string(),
            ..SearchFilters::default()
        }
    }

    #[test]
    fn test_amenity_filter_is_superset_check() {
        let l = listing("x", &["A", "B", "C"], None);

        assert!(matches(&l, &amenity_filter(&["A", "B"])));
        assert!(!matches(&l, &amenity_filter(&["A", "D"])));
        assert!(matches(&l, &amenity_filter(&[])));
    }

    #[test]
    fn test_parking_type_filter() {
        let garage = listing("g", &[], Some(ParkingType::Garage));
        let untyped = listing("u", &[], None);

        let mut filters = SearchFilters::default();
        assert!(matches(&garage, &filters));
        assert!(matches(&untyped, &filters));

        filters.parking_types.insert(ParkingType::Lot);
        assert!(!matches(&garage, &filters));

        filters.parking_types.insert(ParkingType::Garage);
        assert!(matches(&garage, &filters));
        assert!(!matches(&untyped, &filters));
    }

    #[test]
    fn test_unknown_type_matches_only_when_selected() {
        let carport = listing("c", &[], Some(ParkingType::from("carport".to_string())));

        let mut filters = SearchFilters::default();
        filters.parking_types.insert(ParkingType::Driveway);
        assert!(!matches(&carport, &filters));

        filters
            .parking_types
            .insert(ParkingType::Other("carport".to_string()));
        assert!(matches(&carport, &filters));
    }

    #[test]
    fn test_free_text_is_word_and() {
        let mut l = listing("s", &[], None);
        l.address = "123 Main St".to_string();
        l.city = "Springfield".to_string();

        assert!(matches(&l, &text_filter("springfield main")));
        assert!(!matches(&l, &text_filter("springfield ohio")));
        assert!(matches(&l, &text_filter("  MAIN, st.  ")));
        assert!(!matches(&l, &text_filter("mai")));
    }

    #[test]
    fn test_free_text_searches_title_and_description() {
        let mut l = listing("s", &[], None);
        l.title = "Covered garage near stadium".to_string();
        l.description = Some("Easy in/out, gated".to_string());

        assert!(matches(&l, &text_filter("stadium gated")));
        assert!(matches(&l, &text_filter("62701")));
    }

    #[test]
    fn test_normalize_words() {
        assert_eq!(
            normalize_words("  Hello,   World!  co-op\tlot_7 "),
            vec!["hello", "world", "co", "op", "lot_7"]
        );
        assert!(normalize_words("?!").is_empty());
        assert!(normalize_words("").is_empty());
    }

    #[test]
    fn test_apply_keeps_relative_order() {
        let input = vec![
            listing("1", &["ev"], None),
            listing("2", &[], None),
            listing("3", &["ev", "cov"], None),
            listing("4", &["ev"], None),
        ];

        let out = apply(&input, &amenity_filter(&["ev"]));
        let ids: Vec<&str> = out.iter().map(|l| l.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "3", "4"]);

        let mut cursor = input.iter();
        for kept in &out {
            assert!(cursor.any(|l| l.id == kept.id));
        }
    }

    #[test]
    fn test_facets_only_drops_text() {
        let mut filters = amenity_filter(&["ev"]);
        filters.free_text = "downtown".to_string();

        let facets = filters.facets_only();
        assert!(facets.free_text.is_empty());
        assert!(facets.amenity_ids.contains("ev"));
        assert!(!facets.is_empty());
        assert!(SearchFilters::default().is_empty());
    }
}
