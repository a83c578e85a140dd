//! Core data types for the track simulator

use crate::core::constants::{
    DEFAULT_COT_DIMENSION, DEFAULT_COT_IDENTITY, DEFAULT_MAX_TIME_STEP_SECS, DEFAULT_REPORT_TYPE,
    DEFAULT_SERVER_PORT, DEFAULT_SPEED_KPH, DEFAULT_STALE_MINUTES,
};
use crate::validation::error::{SimError, SimResult};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Single geographic coordinate in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl Waypoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    /// Check the latitude/longitude ranges
    pub fn validate(&self) -> SimResult<()> {
        if !self.latitude.is_finite() || !(-90.0..=90.0).contains(&self.latitude) {
            return Err(SimError::configuration(
                "latitude",
                self.latitude,
                "latitude must be within [-90, 90]",
            ));
        }
        if !self.longitude.is_finite() || !(-180.0..=180.0).contains(&self.longitude) {
            return Err(SimError::configuration(
                "longitude",
                self.longitude,
                "longitude must be within [-180, 180]",
            ));
        }
        Ok(())
    }
}

impl From<(f64, f64)> for Waypoint {
    fn from((latitude, longitude): (f64, f64)) -> Self {
        Self { latitude, longitude }
    }
}

/// Ordered path of waypoints; index order is traversal order
pub type Route = Vec<Waypoint>;

/// Seconds to wait after each report, one entry per route segment
pub type WaitPlan = Vec<f64>;

/// Identity fields carried on every report of one entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityIdentity {
    pub callsign: String,
    /// Generated once per entity, never changed afterwards
    pub uid: String,
    pub cot_identity: String,
    pub cot_dimension: String,
    pub stale_minutes: u32,
}

impl EntityIdentity {
    /// Identity with a freshly generated uid and default CoT fields
    pub fn new(callsign: impl Into<String>) -> Self {
        Self {
            callsign: callsign.into(),
            uid: Uuid::new_v4().to_string(),
            cot_identity: DEFAULT_COT_IDENTITY.to_string(),
            cot_dimension: DEFAULT_COT_DIMENSION.to_string(),
            stale_minutes: DEFAULT_STALE_MINUTES,
        }
    }

    pub fn with_cot_identity(mut self, identity: impl Into<String>) -> Self {
        self.cot_identity = identity.into();
        self
    }

    pub fn with_cot_dimension(mut self, dimension: impl Into<String>) -> Self {
        self.cot_dimension = dimension.into();
        self
    }

    pub fn with_stale_minutes(mut self, minutes: u32) -> Self {
        self.stale_minutes = minutes;
        self
    }

    /// Identity for the `index`-th member of a group led by this entity.
    ///
    /// The member keeps the CoT fields but gets its own uid and the callsign
    /// `"{callsign}_{index}"`.
    pub fn group_member(&self, index: usize) -> Self {
        Self {
            callsign: format!("{}_{}", self.callsign, index),
            uid: Uuid::new_v4().to_string(),
            ..self.clone()
        }
    }

    pub fn validate(&self) -> SimResult<()> {
        if self.callsign.trim().is_empty() {
            return Err(SimError::configuration(
                "callsign",
                &self.callsign,
                "callsign must not be empty",
            ));
        }
        if self.uid.is_empty() {
            return Err(SimError::configuration("uid", &self.uid, "uid must not be empty"));
        }
        Ok(())
    }
}

/// Retry behaviour for failed sends. Disabled unless `max_retries > 0`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff_ms: u64,
}

impl RetryPolicy {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn new(max_retries: u32, backoff_ms: u64) -> Self {
        Self { max_retries, backoff_ms }
    }

    pub fn is_enabled(&self) -> bool {
        self.max_retries > 0
    }
}

/// Timing and report-type parameters of one playback
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackConfig {
    pub speed_kph: f64,
    /// Upper bound on the gap between two consecutive reports
    pub max_time_step_secs: f64,
    pub report_type: String,
    #[serde(default)]
    pub retry: RetryPolicy,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            speed_kph: DEFAULT_SPEED_KPH,
            max_time_step_secs: DEFAULT_MAX_TIME_STEP_SECS,
            report_type: DEFAULT_REPORT_TYPE.to_string(),
            retry: RetryPolicy::none(),
        }
    }
}

impl PlaybackConfig {
    pub fn new(speed_kph: f64, max_time_step_secs: f64) -> Self {
        Self {
            speed_kph,
            max_time_step_secs,
            ..Default::default()
        }
    }

    pub fn with_report_type(mut self, report_type: impl Into<String>) -> Self {
        self.report_type = report_type.into();
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Reject bounds that would make smoothing divide by zero or never finish
    pub fn validate(&self) -> SimResult<()> {
        validate_speed(self.speed_kph)?;
        validate_time_step(self.max_time_step_secs)?;
        if self.report_type.trim().is_empty() {
            return Err(SimError::configuration(
                "report_type",
                &self.report_type,
                "report type must not be empty",
            ));
        }
        Ok(())
    }
}

pub(crate) fn validate_speed(speed_kph: f64) -> SimResult<()> {
    if !speed_kph.is_finite() || speed_kph <= 0.0 {
        return Err(SimError::configuration(
            "speed_kph",
            speed_kph,
            "speed must be a finite value greater than zero",
        ));
    }
    Ok(())
}

pub(crate) fn validate_time_step(max_time_step_secs: f64) -> SimResult<()> {
    if !max_time_step_secs.is_finite() || max_time_step_secs <= 0.0 {
        return Err(SimError::configuration(
            "max_time_step_secs",
            max_time_step_secs,
            "maximum time step must be a finite value greater than zero",
        ));
    }
    Ok(())
}

/// Address of the tracking server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerEndpoint {
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_port() -> u16 {
    DEFAULT_SERVER_PORT
}

impl ServerEndpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    pub fn validate(&self) -> SimResult<()> {
        if self.host.trim().is_empty() {
            return Err(SimError::configuration("host", &self.host, "host must not be empty"));
        }
        if self.port == 0 {
            return Err(SimError::configuration("port", self.port, "port must not be zero"));
        }
        Ok(())
    }
}

impl std::fmt::Display for ServerEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_waypoint_validation() {
        assert!(Waypoint::new(38.897125, -77.036255).validate().is_ok());
        assert!(Waypoint::new(90.0, 180.0).validate().is_ok());
        assert!(Waypoint::new(95.0, 0.0).validate().is_err());
        assert!(Waypoint::new(0.0, -200.0).validate().is_err());
        assert!(Waypoint::new(f64::NAN, 0.0).validate().is_err());
    }

    #[test]
    fn test_identity_defaults() {
        let identity = EntityIdentity::new("A1_Walk");
        assert_eq!(identity.cot_identity, "friend");
        assert_eq!(identity.cot_dimension, "land-unit");
        assert_eq!(identity.stale_minutes, 1);
        assert!(Uuid::parse_str(&identity.uid).is_ok());
    }

    #[test]
    fn test_group_member_identity() {
        let leader = EntityIdentity::new("A2_Walk").with_cot_identity("hostile");
        let first = leader.group_member(0);
        let second = leader.group_member(1);

        assert_eq!(first.callsign, "A2_Walk_0");
        assert_eq!(second.callsign, "A2_Walk_1");
        assert_eq!(first.cot_identity, "hostile");
        assert_ne!(first.uid, leader.uid);
        assert_ne!(first.uid, second.uid);
    }

    #[test]
    fn test_playback_config_rejects_zero_bounds() {
        assert!(PlaybackConfig::default().validate().is_ok());

        let err = PlaybackConfig::new(0.0, 4.0).validate().unwrap_err();
        assert!(err.to_string().contains("speed_kph"));

        let err = PlaybackConfig::new(5.0, 0.0).validate().unwrap_err();
        assert!(err.to_string().contains("max_time_step_secs"));

        assert!(PlaybackConfig::new(-1.0, 4.0).validate().is_err());
        assert!(PlaybackConfig::new(5.0, f64::INFINITY).validate().is_err());
    }

    #[test]
    fn test_endpoint_display_and_validation() {
        let endpoint = ServerEndpoint::new("192.168.3.2", 8087);
        assert_eq!(endpoint.to_string(), "192.168.3.2:8087");
        assert!(endpoint.validate().is_ok());
        assert!(ServerEndpoint::new("", 8087).validate().is_err());
        assert!(ServerEndpoint::new("localhost", 0).validate().is_err());
    }
}
