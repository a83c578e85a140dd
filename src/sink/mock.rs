//! Mock report sink for testing and development

use crate::core::ServerEndpoint;
use crate::sink::{PositionReport, ReportSink, SinkError, SinkResult};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

/// Operation recorded by a mock sink
#[derive(Debug, Clone, PartialEq)]
pub enum SinkEventKind {
    Open(ServerEndpoint),
    Send(PositionReport),
    Flush,
    Close,
}

/// One recorded sink call
#[derive(Debug, Clone)]
pub struct SinkEvent {
    pub sink_id: u32,
    pub at: Instant,
    pub kind: SinkEventKind,
}

/// Shared, ordered record of calls made on one or more mock sinks
#[derive(Debug, Clone, Default)]
pub struct SinkLog {
    events: Arc<Mutex<Vec<SinkEvent>>>,
}

impl SinkLog {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, sink_id: u32, kind: SinkEventKind) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(SinkEvent {
                sink_id,
                at: Instant::now(),
                kind,
            });
    }

    /// Snapshot of every recorded event in call order
    pub fn events(&self) -> Vec<SinkEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn events_for(&self, sink_id: u32) -> Vec<SinkEvent> {
        self.events()
            .into_iter()
            .filter(|event| event.sink_id == sink_id)
            .collect()
    }

    /// Reports sent through all sinks sharing this log
    pub fn sent_reports(&self) -> Vec<PositionReport> {
        self.events()
            .into_iter()
            .filter_map(|event| match event.kind {
                SinkEventKind::Send(report) => Some(report),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, predicate: impl Fn(&SinkEventKind) -> bool) -> usize {
        self.events().iter().filter(|event| predicate(&event.kind)).count()
    }

    pub fn clear(&self) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

/// Mock sink recording every call into a [`SinkLog`]
pub struct MockSink {
    id: u32,
    log: SinkLog,
    open: bool,
    refuse_connection: bool,
    fail_after_sends: Option<usize>,
    transient_send_failures: usize,
    error_probability: f32,
    sends: usize,
}

impl MockSink {
    /// Create a mock sink with its own log
    pub fn new(id: u32) -> Self {
        Self::with_log(id, SinkLog::new())
    }

    /// Create a mock sink writing into a shared log
    pub fn with_log(id: u32, log: SinkLog) -> Self {
        Self {
            id,
            log,
            open: false,
            refuse_connection: false,
            fail_after_sends: None,
            transient_send_failures: 0,
            error_probability: 0.0,
            sends: 0,
        }
    }

    /// Make `open` fail with a connection error
    pub fn refuse_connection(mut self) -> Self {
        self.refuse_connection = true;
        self
    }

    /// Every send after the first `sends` successful ones fails
    pub fn fail_after_sends(mut self, sends: usize) -> Self {
        self.fail_after_sends = Some(sends);
        self
    }

    /// The next `count` sends fail, later ones succeed
    pub fn transient_send_failures(mut self, count: usize) -> Self {
        self.transient_send_failures = count;
        self
    }

    /// Fail sends at random with the given probability (0.0 to 1.0)
    pub fn simulate_errors(mut self, probability: f32) -> Self {
        self.error_probability = probability.clamp(0.0, 1.0);
        self
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn log(&self) -> &SinkLog {
        &self.log
    }

    fn should_simulate_error(&self) -> bool {
        if self.error_probability <= 0.0 {
            return false;
        }

        use rand::Rng;
        let mut rng = rand::thread_rng();
        rng.gen::<f32>() < self.error_probability
    }
}

impl ReportSink for MockSink {
    fn open(&mut self, endpoint: &ServerEndpoint) -> SinkResult<()> {
        if self.refuse_connection {
            return Err(SinkError::ConnectionFailed {
                endpoint: endpoint.to_string(),
                reason: "Simulated connection refusal".to_string(),
            });
        }

        self.open = true;
        self.log.push(self.id, SinkEventKind::Open(endpoint.clone()));
        Ok(())
    }

    fn send(&mut self, report: &PositionReport) -> SinkResult<()> {
        if !self.open {
            return Err(SinkError::NotConnected);
        }

        if self.transient_send_failures > 0 {
            self.transient_send_failures -= 1;
            return Err(SinkError::SendFailed {
                reason: "Simulated transient send failure".to_string(),
            });
        }

        if self.fail_after_sends.is_some_and(|limit| self.sends >= limit) || self.should_simulate_error() {
            return Err(SinkError::SendFailed {
                reason: "Simulated send failure".to_string(),
            });
        }

        self.sends += 1;
        self.log.push(self.id, SinkEventKind::Send(report.clone()));
        Ok(())
    }

    fn flush(&mut self) -> SinkResult<()> {
        if !self.open {
            return Err(SinkError::NotConnected);
        }

        self.log.push(self.id, SinkEventKind::Flush);
        Ok(())
    }

    fn close(&mut self) -> SinkResult<()> {
        if self.open {
            self.open = false;
            self.log.push(self.id, SinkEventKind::Close);
        }
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.open
    }
}
