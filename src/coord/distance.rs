//! Great-circle distance and search envelopes
//!
//! Distances use the haversine formula on a spherical Earth. Envelopes are
//! the minimal lat/lng rectangles containing every point within a radius,
//! split in two when they straddle the antimeridian.

use crate::constants::geo::EARTH_RADIUS_METERS;
use crate::coord::Coordinate;
use std::f64::consts::{FRAC_PI_2, PI};

/// Padding applied to envelopes so boundary points survive float rounding
const ENVELOPE_PADDING_DEG: f64 = 1e-9;

/// A lat/lng rectangle in degrees
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub min_lng: f64,
    pub max_lat: f64,
    pub max_lng: f64,
}

impl BoundingBox {
    fn from_radians(min_lat: f64, min_lng: f64, max_lat: f64, max_lng: f64) -> Self {
        Self {
            min_lat: min_lat.to_degrees() - ENVELOPE_PADDING_DEG,
            min_lng: min_lng.to_degrees() - ENVELOPE_PADDING_DEG,
            max_lat: max_lat.to_degrees() + ENVELOPE_PADDING_DEG,
            max_lng: max_lng.to_degrees() + ENVELOPE_PADDING_DEG,
        }
    }

    /// Whether the coordinate falls inside this rectangle
    pub fn contains(&self, point: Coordinate) -> bool {
        point.lat >= self.min_lat
            && point.lat <= self.max_lat
            && point.lng >= self.min_lng
            && point.lng <= self.max_lng
    }
}

/// Calculate the distance between two points in meters (Haversine formula)
pub fn haversine_distance(p1: Coordinate, p2: Coordinate) -> f64 {
    let lat1 = p1.lat.to_radians();
    let lat2 = p2.lat.to_radians();
    let delta_lat = (p2.lat - p1.lat).to_radians();
    let delta_lng = (p2.lng - p1.lng).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1.cos() * lat2.cos() * (delta_lng / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_METERS * c
}

/// Point reached by travelling `distance_meters` from `origin` along `bearing_deg`
///
/// Bearing is measured clockwise from true north.
pub fn destination(origin: Coordinate, bearing_deg: f64, distance_meters: f64) -> Coordinate {
    let angular = distance_meters / EARTH_RADIUS_METERS;
    let bearing = bearing_deg.to_radians();
    let lat1 = origin.lat.to_radians();
    let lng1 = origin.lng.to_radians();

    let lat2 = (lat1.sin() * angular.cos() + lat1.cos() * angular.sin() * bearing.cos()).asin();
    let lng2 = lng1
        + (bearing.sin() * angular.sin() * lat1.cos())
            .atan2(angular.cos() - lat1.sin() * lat2.sin());

    // Normalize longitude into [-180, 180]
    let lng2 = (lng2 + 3.0 * PI).rem_euclid(2.0 * PI) - PI;

    Coordinate::new(lat2.to_degrees(), lng2.to_degrees())
}

/// Rectangles that together contain every point within `radius_meters` of `center`
///
/// Returns one rectangle normally, two when the area crosses the
/// antimeridian, and a full-longitude band when it reaches a pole.
pub fn bounding_boxes(center: Coordinate, radius_meters: f64) -> Vec<BoundingBox> {
    let angular = radius_meters / EARTH_RADIUS_METERS;
    let lat = center.lat.to_radians();
    let lng = center.lng.to_radians();

    if angular >= PI {
        return vec![BoundingBox::from_radians(-FRAC_PI_2, -PI, FRAC_PI_2, PI)];
    }

    let min_lat = lat - angular;
    let max_lat = lat + angular;

    if min_lat <= -FRAC_PI_2 || max_lat >= FRAC_PI_2 {
        return vec![BoundingBox::from_radians(
            min_lat.max(-FRAC_PI_2),
            -PI,
            max_lat.min(FRAC_PI_2),
            PI,
        )];
    }

    let ratio = angular.sin() / lat.cos();
    if ratio >= 1.0 {
        return vec![BoundingBox::from_radians(min_lat, -PI, max_lat, PI)];
    }

    let delta_lng = ratio.asin();
    let min_lng = lng - delta_lng;
    let max_lng = lng + delta_lng;

    if min_lng < -PI {
        vec![
            BoundingBox::from_radians(min_lat, min_lng + 2.0 * PI, max_lat, PI),
            BoundingBox::from_radians(min_lat, -PI, max_lat, max_lng),
        ]
    } else if max_lng > PI {
        vec![
            BoundingBox::from_radians(min_lat, min_lng, max_lat, PI),
            BoundingBox::from_radians(min_lat, -PI, max_lat, max_lng - 2.0 * PI),
        ]
    } else {
        vec![BoundingBox::from_radians(min_lat, min_lng, max_lat, max_lng)]
    }
}
