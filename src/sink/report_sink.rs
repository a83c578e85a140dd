//! Report sink trait

use crate::core::ServerEndpoint;
use crate::sink::{PositionReport, SinkResult};
use std::sync::Arc;

/// Connection to a tracking server that accepts position reports.
///
/// Lifecycle is `open -> {send, flush}* -> close`. Every worker owns its own
/// sink; implementations do not need to be shareable.
pub trait ReportSink {
    /// Connect to the server at `endpoint`
    fn open(&mut self, endpoint: &ServerEndpoint) -> SinkResult<()>;

    /// Send one position report
    fn send(&mut self, report: &PositionReport) -> SinkResult<()>;

    /// Push any buffered data to the server
    fn flush(&mut self) -> SinkResult<()>;

    /// Close the connection. Closing an unopened sink is a no-op.
    fn close(&mut self) -> SinkResult<()>;

    /// Check if the sink currently holds an open connection
    fn is_open(&self) -> bool;
}

/// Produces a fresh, unopened sink for every playback worker
pub type SinkFactory = Arc<dyn Fn() -> Box<dyn ReportSink + Send> + Send + Sync>;
