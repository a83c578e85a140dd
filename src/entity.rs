//! Simulated entities
//!
//! A [`Player`] binds a motion source to an identity, pacing parameters and a
//! server endpoint. It plans a timed route and hands it to the playback
//! scheduler, either on the calling thread, on a worker thread, or fanned out
//! as a group.

use crate::algorithms::motion::{circle, loiter, track_adapter, wander};
use crate::algorithms::smoothing::smooth_route;
use crate::core::{
    EntityIdentity, PlaybackConfig, Route, ServerEndpoint, WaitPlan, Waypoint, DEFAULT_LOITER_JITTER_KM,
};
use crate::playback::{
    play, play_group, spawn_worker, CancelToken, GroupHandle, GroupLayout, PlaybackJob, PlaybackSummary,
    WorkerHandle,
};
use crate::processing::track::load_gpx_track;
use crate::sink::{ReportSink, SinkFactory};
use crate::validation::error::{SimError, SimResult};
use log::debug;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

fn default_loiter_jitter_km() -> f64 {
    DEFAULT_LOITER_JITTER_KM
}

/// Where an entity's raw waypoints come from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MotionSource {
    /// Explicit waypoint list
    Track { points: Vec<Waypoint> },
    /// GPX file read when the route is planned
    TrackFile { path: PathBuf },
    Wander {
        start: Waypoint,
        total_distance_km: f64,
        step_distance_km: f64,
    },
    Circle {
        center: Waypoint,
        radius_m: f64,
        #[serde(default)]
        clockwise: bool,
    },
    /// Holds in place; the only source that is not smoothed
    Loiter {
        center: Waypoint,
        total_time_secs: f64,
        #[serde(default = "default_loiter_jitter_km")]
        jitter_km: f64,
    },
}

impl MotionSource {
    /// Short name used in logs
    pub fn kind(&self) -> &'static str {
        match self {
            MotionSource::Track { .. } => "track",
            MotionSource::TrackFile { .. } => "track_file",
            MotionSource::Wander { .. } => "wander",
            MotionSource::Circle { .. } => "circle",
            MotionSource::Loiter { .. } => "loiter",
        }
    }

    /// Check the source's parameters without generating a route.
    ///
    /// Track files are read here, so a missing or empty file is reported
    /// before any playback starts.
    pub fn validate(&self) -> SimResult<()> {
        match self {
            MotionSource::Track { points } => validate_track(points),
            MotionSource::TrackFile { path } => validate_track(&load_gpx_track(path)?),
            MotionSource::Wander {
                start,
                total_distance_km,
                step_distance_km,
            } => {
                start.validate()?;
                require_positive("total_distance_km", *total_distance_km)?;
                require_positive("step_distance_km", *step_distance_km)
            }
            MotionSource::Circle { center, radius_m, .. } => {
                center.validate()?;
                require_positive("radius_m", *radius_m)
            }
            MotionSource::Loiter {
                center,
                total_time_secs,
                jitter_km,
            } => {
                center.validate()?;
                require_positive("total_time_secs", *total_time_secs)?;
                if !jitter_km.is_finite() || *jitter_km < 0.0 {
                    return Err(SimError::configuration(
                        "jitter_km",
                        jitter_km,
                        "jitter must be a finite, non-negative distance",
                    ));
                }
                Ok(())
            }
        }
    }
}

fn validate_track(points: &[Waypoint]) -> SimResult<()> {
    if points.len() < 2 {
        return Err(SimError::configuration(
            "route",
            format!("{} waypoint(s)", points.len()),
            "a route needs at least two waypoints",
        ));
    }
    points.iter().try_for_each(Waypoint::validate)
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

/// A simulated entity ready to be played
#[derive(Debug, Clone)]
pub struct Player {
    pub endpoint: ServerEndpoint,
    pub identity: EntityIdentity,
    pub config: PlaybackConfig,
    pub source: MotionSource,
    /// Seed for every random choice of this player; entropy when unset
    pub seed: Option<u64>,
}

impl Player {
    /// Player with a fresh uid and default pacing
    pub fn new(endpoint: ServerEndpoint, callsign: impl Into<String>, source: MotionSource) -> Self {
        Self {
            endpoint,
            identity: EntityIdentity::new(callsign),
            config: PlaybackConfig::default(),
            source,
            seed: None,
        }
    }

    pub fn with_config(mut self, config: PlaybackConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_identity(mut self, identity: EntityIdentity) -> Self {
        self.identity = identity;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn callsign(&self) -> &str {
        &self.identity.callsign
    }

    pub fn uid(&self) -> &str {
        &self.identity.uid
    }

    /// Check the endpoint, identity and pacing
    pub fn validate_settings(&self) -> SimResult<()> {
        self.endpoint.validate()?;
        self.identity.validate()?;
        self.config.validate()
    }

    /// Check every setting and the motion source
    pub fn validate(&self) -> SimResult<()> {
        self.validate_settings()?;
        self.source.validate()
    }

    /// Random source for one planning pass
    pub fn rng(&self) -> ChaCha8Rng {
        match self.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        }
    }

    /// Raw waypoints of the motion source, before any timing
    pub fn raw_route<R: Rng + ?Sized>(&self, rng: &mut R) -> SimResult<Route> {
        match &self.source {
            MotionSource::Track { points } => track_adapter(points.iter().copied()),
            MotionSource::TrackFile { path } => track_adapter(load_gpx_track(path)?),
            MotionSource::Wander {
                start,
                total_distance_km,
                step_distance_km,
            } => wander(*start, *total_distance_km, *step_distance_km, rng),
            MotionSource::Circle {
                center,
                radius_m,
                clockwise,
            } => circle(*center, *radius_m, *clockwise),
            MotionSource::Loiter {
                center,
                total_time_secs,
                jitter_km,
            } => Ok(loiter(*center, *total_time_secs, self.config.max_time_step_secs, *jitter_km, rng)?.0),
        }
    }

    /// Timed route for this player
    pub fn plan<R: Rng + ?Sized>(&self, rng: &mut R) -> SimResult<(Route, WaitPlan)> {
        self.validate_settings()?;
        let (route, waits) = match &self.source {
            MotionSource::Loiter {
                center,
                total_time_secs,
                jitter_km,
            } => loiter(*center, *total_time_secs, self.config.max_time_step_secs, *jitter_km, rng)?,
            _ => {
                let raw = self.raw_route(rng)?;
                smooth_route(&raw, self.config.speed_kph, self.config.max_time_step_secs)?
            }
        };

        debug!(
            "{} planned {} route: {} waypoint(s), {:.1} s",
            self.identity.callsign,
            self.source.kind(),
            route.len(),
            waits.iter().sum::<f64>()
        );
        Ok((route, waits))
    }

    /// Plan a route with `rng` and wrap it into a playback job
    pub fn job_with<R: Rng + ?Sized>(&self, rng: &mut R) -> SimResult<PlaybackJob> {
        let (route, waits) = self.plan(rng)?;
        Ok(PlaybackJob::new(
            route,
            waits,
            self.identity.clone(),
            self.config.clone(),
            self.endpoint.clone(),
        ))
    }

    /// Plan a route with this player's own RNG
    pub fn job(&self) -> SimResult<PlaybackJob> {
        self.job_with(&mut self.rng())
    }

    /// Play on the calling thread until done, cancelled or failed
    pub fn play(&self, sink: &mut dyn ReportSink, cancel: &CancelToken) -> SimResult<PlaybackSummary> {
        let job = self.job()?;
        play(&job, sink, cancel)
    }

    /// Play on a dedicated worker thread
    pub fn spawn(&self, sink: Box<dyn ReportSink + Send>, cancel: CancelToken) -> SimResult<WorkerHandle> {
        spawn_worker(self.job()?, sink, cancel)
    }

    /// Play `group.count` offset copies of this player's route concurrently
    pub fn play_group(
        &self,
        sink_factory: &SinkFactory,
        group: GroupLayout,
        cancel: &CancelToken,
    ) -> SimResult<GroupHandle> {
        group.validate()?;
        let mut rng = self.rng();
        let base = self.job_with(&mut rng)?;
        play_group(&base, group, sink_factory, &mut rng, cancel)
    }
}
