//! Procedural motion generators
//!
//! Each generator produces a raw waypoint skeleton. Wander, circle and track
//! routes still need [`smooth_route`](crate::algorithms::smoothing::smooth_route)
//! for timing; loiter produces its own wait plan.

use crate::algorithms::geodesy::destination;
use crate::core::{Route, WaitPlan, Waypoint, CIRCLE_STEP_DEG};
use crate::core::types::validate_time_step;
use crate::validation::error::{SimError, SimResult};
use rand::Rng;

fn random_bearing<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    rng.gen_range(0.0..360.0)
}

fn require_positive(parameter: &str, value: f64) -> SimResult<()> {
    if !value.is_finite() || value <= 0.0 {
        return Err(SimError::configuration(
            parameter,
            value,
            "value must be a finite number greater than zero",
        ));
    }
    Ok(())
}

/// Random walk from `start`.
///
/// Steps `step_distance_km` in a fresh uniformly random bearing until the
/// accumulated distance reaches `total_distance_km`.
pub fn wander<R: Rng + ?Sized>(
    start: Waypoint,
    total_distance_km: f64,
    step_distance_km: f64,
    rng: &mut R,
) -> SimResult<Route> {
    start.validate()?;
    require_positive("total_distance_km", total_distance_km)?;
    require_positive("step_distance_km", step_distance_km)?;

    let mut route = vec![start];
    let mut travelled_km = 0.0;
    let mut current = start;
    while travelled_km < total_distance_km {
        current = destination(current, step_distance_km, random_bearing(rng));
        route.push(current);
        travelled_km += step_distance_km;
    }

    Ok(route)
}

/// Bearings sampled for one revolution, in travel order
pub fn circle_bearings(clockwise: bool) -> Vec<f64> {
    let samples = (360.0 / CIRCLE_STEP_DEG).ceil() as usize;
    (0..samples)
        .map(|i| {
            let offset = i as f64 * CIRCLE_STEP_DEG;
            if clockwise {
                offset
            } else {
                359.0 - offset
            }
        })
        .collect()
}

/// One orbit of radius `radius_m` around `center`.
///
/// The loop is not closed: the last sample sits one step short of the first.
pub fn circle(center: Waypoint, radius_m: f64, clockwise: bool) -> SimResult<Route> {
    center.validate()?;
    require_positive("radius_m", radius_m)?;

    let radius_km = radius_m / 1000.0;
    Ok(circle_bearings(clockwise)
        .into_iter()
        .map(|bearing| destination(center, radius_km, bearing))
        .collect())
}

/// Hold around `center` for roughly `total_time_secs`.
///
/// Alternates between the centre and a point `jitter_km` away in a random
/// bearing, `ceil(total_time_secs / max_step_secs)` times. Every hold lasts
/// `max_step_secs`; the plan has one entry fewer than the route like any
/// smoothed route.
pub fn loiter<R: Rng + ?Sized>(
    center: Waypoint,
    total_time_secs: f64,
    max_step_secs: f64,
    jitter_km: f64,
    rng: &mut R,
) -> SimResult<(Route, WaitPlan)> {
    center.validate()?;
    require_positive("total_time_secs", total_time_secs)?;
    validate_time_step(max_step_secs)?;
    if !jitter_km.is_finite() || jitter_km < 0.0 {
        return Err(SimError::configuration(
            "jitter_km",
            jitter_km,
            "jitter must be a finite, non-negative distance",
        ));
    }

    let pairs = (total_time_secs / max_step_secs).ceil() as usize;
    let mut route = Vec::with_capacity(pairs * 2);
    for _ in 0..pairs {
        route.push(center);
        route.push(destination(center, jitter_km, random_bearing(rng)));
    }
    let waits = vec![max_step_secs; route.len() - 1];

    Ok((route, waits))
}

/// Forward an externally parsed track, checking every coordinate
pub fn track_adapter(points: impl IntoIterator<Item = Waypoint>) -> SimResult<Route> {
    let route: Route = points.into_iter().collect();
    for point in &route {
        point.validate()?;
    }
    Ok(route)
}
