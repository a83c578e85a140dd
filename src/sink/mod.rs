//! Report sink abstraction for tracking-server communication
//!
//! Playback workers talk to the tracking server through the [`ReportSink`]
//! trait. The TCP implementation writes Cursor-on-Target events; the mock
//! implementation records every call for tests.

pub mod report_sink;
pub mod cot;
pub mod tcp;
pub mod mock;
pub mod error;

pub use report_sink::{ReportSink, SinkFactory};
pub use tcp::TcpCotSink;
pub use mock::{MockSink, SinkEvent, SinkEventKind, SinkLog};
pub use error::{SinkError, SinkResult};

use crate::core::{EntityIdentity, Waypoint, REPORT_COORDINATE_DECIMALS};
use serde::{Deserialize, Serialize};

/// Position report sent to the tracking server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionReport {
    pub cot_identity: String,
    pub cot_dimension: String,
    pub stale_minutes: u32,
    pub report_type: String,
    pub callsign: String,
    pub uid: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl PositionReport {
    /// Build a report for `identity` at `waypoint`, rounding coordinates
    pub fn new(identity: &EntityIdentity, report_type: &str, waypoint: Waypoint) -> Self {
        Self {
            cot_identity: identity.cot_identity.clone(),
            cot_dimension: identity.cot_dimension.clone(),
            stale_minutes: identity.stale_minutes,
            report_type: report_type.to_string(),
            callsign: identity.callsign.clone(),
            uid: identity.uid.clone(),
            latitude: round_coordinate(waypoint.latitude),
            longitude: round_coordinate(waypoint.longitude),
        }
    }

    pub fn waypoint(&self) -> Waypoint {
        Waypoint::new(self.latitude, self.longitude)
    }
}

/// Round a coordinate to the reported number of decimal places
pub fn round_coordinate(value: f64) -> f64 {
    let scale = 10f64.powi(REPORT_COORDINATE_DECIMALS);
    (value * scale).round() / scale
}
