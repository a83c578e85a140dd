//! Geodesic primitives on the WGS84 ellipsoid
//!
//! Thin adapter between [`Waypoint`] and the `geo` crate's Karney geodesics.

use crate::core::Waypoint;
use geo::{GeodesicBearing, GeodesicDestination, GeodesicDistance, Point};

fn to_point(waypoint: Waypoint) -> Point<f64> {
    Point::new(waypoint.longitude, waypoint.latitude)
}

fn from_point(point: Point<f64>) -> Waypoint {
    Waypoint::new(point.y(), point.x())
}

/// Point reached by travelling `distance_km` from `origin` along `bearing_deg`
pub fn destination(origin: Waypoint, distance_km: f64, bearing_deg: f64) -> Waypoint {
    from_point(to_point(origin).geodesic_destination(bearing_deg, distance_km * 1000.0))
}

/// Geodesic distance between two points in kilometres
pub fn distance_km(a: Waypoint, b: Waypoint) -> f64 {
    to_point(a).geodesic_distance(&to_point(b)) / 1000.0
}

/// Initial bearing from `a` towards `b`, normalised to [0, 360)
pub fn bearing_deg(a: Waypoint, b: Waypoint) -> f64 {
    to_point(a).geodesic_bearing(to_point(b)).rem_euclid(360.0)
}

/// Arithmetic mean of latitude and longitude.
///
/// Not the geodesic midpoint. The error is negligible over the short
/// segments produced while smoothing, but the average is wrong across the
/// antimeridian.
pub fn planar_midpoint(a: Waypoint, b: Waypoint) -> Waypoint {
    Waypoint::new(
        (a.latitude + b.latitude) / 2.0,
        (a.longitude + b.longitude) / 2.0,
    )
}

/// True when the straight longitude span from `a` to `b` exceeds 180°,
/// so the short way between them crosses the antimeridian
pub fn crosses_antimeridian(a: Waypoint, b: Waypoint) -> bool {
    (a.longitude - b.longitude).abs() > 180.0
}

/// Smallest absolute difference between two bearings in degrees
pub fn bearing_difference(a: f64, b: f64) -> f64 {
    let diff = (a - b).rem_euclid(360.0);
    diff.min(360.0 - diff)
}
