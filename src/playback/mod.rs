//! Concurrent real-time playback of routes to report sinks

pub mod cancel;
pub mod group;
pub mod scheduler;
pub mod supervisor;

pub use cancel::CancelToken;
pub use group::{play_group, GroupHandle, GroupLayout};
pub use scheduler::{play, spawn_worker, PlaybackJob, PlaybackSummary, StopReason, WorkerHandle, WorkerState};
pub use supervisor::{Supervisor, WorkerOutcome};
