//! Parallel route translation for group playback

use crate::algorithms::geodesy::destination;
use crate::core::{Route, Waypoint};
use rand::Rng;

/// Move every waypoint `distance_km` along one bearing drawn per call.
///
/// All points share the bearing, so the result keeps the shape of `route`
/// while repeated calls land in different places.
pub fn offset_route<R: Rng + ?Sized>(route: &[Waypoint], distance_km: f64, rng: &mut R) -> Route {
    let bearing = rng.gen_range(0.0..360.0);
    offset_route_along(route, distance_km, bearing)
}

/// Move every waypoint `distance_km` along `bearing_deg`
pub fn offset_route_along(route: &[Waypoint], distance_km: f64, bearing_deg: f64) -> Route {
    route
        .iter()
        .map(|&point| destination(point, distance_km, bearing_deg))
        .collect()
}
