//! Track Simulator
//!
//! Generates plausible movement for simulated entities and plays it back in
//! real time as position reports to a TAK-style tracking server.

pub mod core;
pub mod algorithms;
pub mod playback;
pub mod sink;
pub mod processing;
pub mod validation;
pub mod utils;
pub mod entity;

// Re-export commonly used types
pub use crate::core::{EntityIdentity, PlaybackConfig, RetryPolicy, Route, ServerEndpoint, WaitPlan, Waypoint};
pub use algorithms::{circle, loiter, offset_route, smooth_route, track_adapter, wander};
pub use entity::{MotionSource, Player};
pub use playback::{
    play, play_group, spawn_worker, CancelToken, GroupHandle, GroupLayout, PlaybackJob, PlaybackSummary, StopReason,
    Supervisor, WorkerHandle, WorkerState,
};
pub use sink::{MockSink, PositionReport, ReportSink, SinkError, SinkFactory, SinkResult, TcpCotSink};
pub use validation::{SimError, SimResult};
pub use utils::ConfigurationManager;
