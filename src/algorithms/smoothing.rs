//! Route smoothing
//!
//! Densifies a sparse route so that every segment can be covered within the
//! maximum reporting interval at the configured speed.

use crate::algorithms::geodesy::{crosses_antimeridian, distance_km, planar_midpoint};
use crate::core::types::{validate_speed, validate_time_step};
use crate::core::{Route, WaitPlan, Waypoint, SECONDS_PER_HOUR};
use crate::validation::error::{SimError, SimResult};
use log::warn;

/// Seconds needed to travel from `a` to `b` at `speed_kph`
pub fn traversal_secs(a: Waypoint, b: Waypoint, speed_kph: f64) -> f64 {
    distance_km(a, b) / speed_kph * SECONDS_PER_HOUR
}

/// Smooth `points` so that no segment takes longer than `max_step_secs`.
///
/// Returns the densified route and the traversal time of each segment.
/// Over-long segments are split at their planar midpoint (see
/// [`planar_midpoint`]) until they fit; segments already within budget are
/// kept as they are, so an already-smooth route comes back unchanged.
/// Midpoints of a segment crossing ±180° land on the far side of the globe;
/// such segments are logged with `warn!` and smoothed anyway.
pub fn smooth_route(points: &[Waypoint], speed_kph: f64, max_step_secs: f64) -> SimResult<(Route, WaitPlan)> {
    validate_speed(speed_kph)?;
    validate_time_step(max_step_secs)?;
    if points.len() < 2 {
        return Err(SimError::configuration(
            "route",
            format!("{} waypoint(s)", points.len()),
            "a route needs at least two waypoints",
        ));
    }
    for point in points {
        point.validate()?;
    }
    for (index, pair) in points.windows(2).enumerate() {
        if crosses_antimeridian(pair[0], pair[1]) && traversal_secs(pair[0], pair[1], speed_kph) > max_step_secs {
            warn!(
                "Segment {} from {:?} to {:?} crosses the antimeridian and will be densified the long way round",
                index, pair[0], pair[1]
            );
        }
    }

    let mut route = Vec::with_capacity(points.len());
    let mut waits = Vec::with_capacity(points.len() - 1);
    // Targets still to reach from the cursor, nearest last
    let mut pending: Vec<Waypoint> = Vec::new();

    route.push(points[0]);
    for &next in &points[1..] {
        pending.push(next);
        while let Some(&target) = pending.last() {
            let cursor = route[route.len() - 1];
            let secs = traversal_secs(cursor, target, speed_kph);
            if secs > max_step_secs {
                pending.push(planar_midpoint(cursor, target));
            } else {
                route.push(target);
                waits.push(secs);
                pending.pop();
            }
        }
    }

    Ok((route, waits))
}
