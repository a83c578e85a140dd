//! Real-time playback of a smoothed route
//!
//! A worker opens its sink once, then for every waypoint sends a report,
//! flushes, and waits the planned duration before moving on. Running out of
//! planned waits ends playback early without an error.

use crate::core::{EntityIdentity, PlaybackConfig, Route, ServerEndpoint, WaitPlan};
use crate::playback::cancel::CancelToken;
use crate::sink::{PositionReport, ReportSink, SinkResult};
use crate::validation::error::{SimError, SimResult};
use log::{debug, error, info, warn};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Lifecycle of one playback worker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WorkerState {
    #[default]
    Idle,
    Opened,
    Sending,
    Waiting,
    Closed,
    Failed,
}

impl WorkerState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, WorkerState::Closed | WorkerState::Failed)
    }
}

/// Why a worker stopped emitting reports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Every waypoint was reported
    RouteCompleted,
    /// The wait plan ran out before the route did
    WaitPlanExhausted,
    /// The worker's cancel token fired
    Cancelled,
}

/// Result of a playback that ended without a sink failure
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackSummary {
    pub callsign: String,
    pub uid: String,
    pub reports_sent: usize,
    pub stop_reason: StopReason,
    pub final_state: WorkerState,
}

/// Everything one worker needs, owned exclusively by that worker
#[derive(Debug, Clone)]
pub struct PlaybackJob {
    pub route: Route,
    pub waits: WaitPlan,
    pub identity: EntityIdentity,
    pub config: PlaybackConfig,
    pub endpoint: ServerEndpoint,
}

impl PlaybackJob {
    pub fn new(
        route: Route,
        waits: WaitPlan,
        identity: EntityIdentity,
        config: PlaybackConfig,
        endpoint: ServerEndpoint,
    ) -> Self {
        Self {
            route,
            waits,
            identity,
            config,
            endpoint,
        }
    }

    /// Check the job before any connection is made
    pub fn validate(&self) -> SimResult<()> {
        self.config.validate()?;
        self.identity.validate()?;
        self.endpoint.validate()?;
        if self.route.len() < 2 {
            return Err(SimError::configuration(
                "route",
                format!("{} waypoint(s)", self.route.len()),
                "a route needs at least two waypoints",
            ));
        }
        for point in &self.route {
            point.validate()?;
        }
        if let Some(bad) = self.waits.iter().find(|w| !w.is_finite() || **w < 0.0) {
            return Err(SimError::configuration(
                "waits",
                bad,
                "wait durations must be finite and non-negative",
            ));
        }
        Ok(())
    }
}

enum Delivery {
    Delivered,
    Cancelled,
}

/// Worker state readable from outside the worker thread
#[derive(Debug, Clone, Default)]
struct StateCell(Arc<Mutex<WorkerState>>);

impl StateCell {
    fn get(&self) -> WorkerState {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set(&self, state: WorkerState) {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner) = state;
    }
}

struct Worker<'a> {
    job: &'a PlaybackJob,
    state: StateCell,
    reports_sent: usize,
}

impl<'a> Worker<'a> {
    fn new(job: &'a PlaybackJob, state: StateCell) -> Self {
        Self {
            job,
            state,
            reports_sent: 0,
        }
    }

    fn run(&mut self, sink: &mut dyn ReportSink, cancel: &CancelToken) -> SinkResult<StopReason> {
        if cancel.is_cancelled() {
            return Ok(StopReason::Cancelled);
        }

        let job = self.job;
        sink.open(&job.endpoint)?;
        self.state.set(WorkerState::Opened);
        sink.flush()?;

        let route = &job.route;
        for (index, waypoint) in route.iter().enumerate() {
            self.state.set(WorkerState::Sending);
            let report = PositionReport::new(&job.identity, &job.config.report_type, *waypoint);

            if let Delivery::Cancelled = self.deliver(sink, cancel, |s| s.send(&report))? {
                return Ok(StopReason::Cancelled);
            }
            if let Delivery::Cancelled = self.deliver(sink, cancel, |s| s.flush())? {
                return Ok(StopReason::Cancelled);
            }
            self.reports_sent += 1;
            debug!(
                "{} reported {:.5}, {:.5} ({}/{})",
                job.identity.callsign,
                report.latitude,
                report.longitude,
                index + 1,
                route.len()
            );

            let Some(&wait_secs) = job.waits.get(index) else {
                if index + 1 < route.len() {
                    debug!(
                        "{} wait plan exhausted after {} of {} waypoints",
                        job.identity.callsign,
                        index + 1,
                        route.len()
                    );
                    return Ok(StopReason::WaitPlanExhausted);
                }
                return Ok(StopReason::RouteCompleted);
            };

            self.state.set(WorkerState::Waiting);
            let wait = Duration::try_from_secs_f64(wait_secs).unwrap_or(Duration::ZERO);
            if cancel.wait_timeout(wait) {
                return Ok(StopReason::Cancelled);
            }
        }

        Ok(StopReason::RouteCompleted)
    }

    /// Run one sink operation, retrying recoverable failures if configured
    fn deliver<F>(&self, sink: &mut dyn ReportSink, cancel: &CancelToken, mut operation: F) -> SinkResult<Delivery>
    where
        F: FnMut(&mut dyn ReportSink) -> SinkResult<()>,
    {
        let retry = self.job.config.retry;
        let mut attempts = 0;
        loop {
            match operation(&mut *sink) {
                Ok(()) => return Ok(Delivery::Delivered),
                Err(e) if attempts < retry.max_retries && e.is_recoverable() => {
                    attempts += 1;
                    warn!(
                        "{} ({}) sink error, retry {}/{}: {}",
                        self.job.identity.callsign, self.job.identity.uid, attempts, retry.max_retries, e
                    );
                    if cancel.wait_timeout(Duration::from_millis(retry.backoff_ms)) {
                        return Ok(Delivery::Cancelled);
                    }
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn summary(&self, stop_reason: StopReason) -> PlaybackSummary {
        PlaybackSummary {
            callsign: self.job.identity.callsign.clone(),
            uid: self.job.identity.uid.clone(),
            reports_sent: self.reports_sent,
            stop_reason,
            final_state: self.state.get(),
        }
    }
}

fn close_quietly(sink: &mut dyn ReportSink, identity: &EntityIdentity) {
    if let Err(e) = sink.close() {
        warn!("{} ({}) failed to close sink: {}", identity.callsign, identity.uid, e);
    }
}

/// Play `job` to `sink` on the calling thread.
///
/// Blocks until the route is exhausted, the wait plan runs out, `cancel`
/// fires, or the sink fails. A sink failure is returned as
/// [`SimError::Sink`] naming the entity's callsign and uid.
pub fn play(job: &PlaybackJob, sink: &mut dyn ReportSink, cancel: &CancelToken) -> SimResult<PlaybackSummary> {
    play_tracked(job, sink, cancel, StateCell::default())
}

fn play_tracked(
    job: &PlaybackJob,
    sink: &mut dyn ReportSink,
    cancel: &CancelToken,
    state: StateCell,
) -> SimResult<PlaybackSummary> {
    job.validate()?;

    let identity = &job.identity;
    let mut worker = Worker::new(job, state);
    match worker.run(sink, cancel) {
        Ok(stop_reason) => {
            close_quietly(sink, identity);
            worker.state.set(WorkerState::Closed);
            info!(
                "{} ({}) finished after {} report(s): {:?}",
                identity.callsign, identity.uid, worker.reports_sent, stop_reason
            );
            Ok(worker.summary(stop_reason))
        }
        Err(e) => {
            error!(
                "{} ({}) failed while {:?} after {} report(s): {}",
                identity.callsign,
                identity.uid,
                worker.state.get(),
                worker.reports_sent,
                e
            );
            close_quietly(sink, identity);
            worker.state.set(WorkerState::Failed);
            Err(SimError::sink(&identity.callsign, &identity.uid, e))
        }
    }
}

/// Handle to a playback running on its own thread
pub struct WorkerHandle {
    callsign: String,
    uid: String,
    cancel: CancelToken,
    state: StateCell,
    handle: JoinHandle<SimResult<PlaybackSummary>>,
}

impl WorkerHandle {
    pub fn callsign(&self) -> &str {
        &self.callsign
    }

    pub fn uid(&self) -> &str {
        &self.uid
    }

    /// Stop the worker at its next wait boundary
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Last state the worker reported
    pub fn state(&self) -> WorkerState {
        self.state.get()
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the worker to finish
    pub fn join(self) -> SimResult<PlaybackSummary> {
        let callsign = self.callsign;
        self.handle.join().unwrap_or_else(|_| {
            Err(SimError::Worker {
                callsign,
                reason: "worker thread panicked".to_string(),
            })
        })
    }
}

impl std::fmt::Debug for WorkerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerHandle")
            .field("callsign", &self.callsign)
            .field("uid", &self.uid)
            .field("state", &self.state())
            .field("finished", &self.is_finished())
            .finish()
    }
}

/// Launch `job` on a dedicated thread owning `sink`.
///
/// The job is validated before the thread starts, so configuration errors
/// surface here rather than from [`WorkerHandle::join`].
pub fn spawn_worker(
    job: PlaybackJob,
    mut sink: Box<dyn ReportSink + Send>,
    cancel: CancelToken,
) -> SimResult<WorkerHandle> {
    job.validate()?;

    let callsign = job.identity.callsign.clone();
    let uid = job.identity.uid.clone();
    let token = cancel.clone();
    let state = StateCell::default();
    let worker_state = state.clone();
    let handle = thread::Builder::new()
        .name(format!("playback-{}", callsign))
        .spawn(move || play_tracked(&job, sink.as_mut(), &token, worker_state))
        .map_err(|e| SimError::Worker {
            callsign: callsign.clone(),
            reason: e.to_string(),
        })?;

    info!("Launched playback worker for {} ({})", callsign, uid);
    Ok(WorkerHandle {
        callsign,
        uid,
        cancel,
        state,
        handle,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{RetryPolicy, Waypoint};
    use crate::sink::{MockSink, SinkError, SinkEventKind};
    use std::time::Instant;

    fn line(points: usize) -> Route {
        (0..points).map(|i| Waypoint::new(10.0 + i as f64 * 0.0001, 20.0)).collect()
    }

    fn job(points: usize, waits: WaitPlan) -> PlaybackJob {
        PlaybackJob::new(
            line(points),
            waits,
            EntityIdentity::new("A1_Walk"),
            PlaybackConfig::default(),
            ServerEndpoint::new("localhost", 8087),
        )
    }

    #[test]
    fn test_full_route_is_played_in_order() {
        let job = job(4, vec![0.001; 3]);
        let mut sink = MockSink::new(1);
        let summary = play(&job, &mut sink, &CancelToken::new()).unwrap();

        assert_eq!(summary.reports_sent, 4);
        assert_eq!(summary.stop_reason, StopReason::RouteCompleted);
        assert_eq!(summary.final_state, WorkerState::Closed);

        let reports = sink.log().sent_reports();
        let expected: Vec<Waypoint> = job.route.clone();
        let received: Vec<Waypoint> = reports.iter().map(|r| r.waypoint()).collect();
        assert_eq!(received, expected);
        assert!(reports.iter().all(|r| r.uid == job.identity.uid && r.callsign == "A1_Walk"));
    }

    #[test]
    fn test_protocol_flushes_after_open_and_every_send() {
        let job = job(2, vec![0.0]);
        let mut sink = MockSink::new(1);
        play(&job, &mut sink, &CancelToken::new()).unwrap();

        let kinds: Vec<SinkEventKind> = sink.log().events().into_iter().map(|e| e.kind).collect();
        assert!(matches!(kinds[0], SinkEventKind::Open(_)));
        assert_eq!(kinds[1], SinkEventKind::Flush);
        assert!(matches!(kinds[2], SinkEventKind::Send(_)));
        assert_eq!(kinds[3], SinkEventKind::Flush);
        assert!(matches!(kinds[4], SinkEventKind::Send(_)));
        assert_eq!(kinds[5], SinkEventKind::Flush);
        assert_eq!(kinds[6], SinkEventKind::Close);
        assert_eq!(kinds.len(), 7);
    }

    #[test]
    fn test_short_wait_plan_stops_silently() {
        let job = job(5, vec![0.001, 0.001]);
        let mut sink = MockSink::new(1);
        let summary = play(&job, &mut sink, &CancelToken::new()).unwrap();

        assert_eq!(summary.reports_sent, 3);
        assert_eq!(summary.stop_reason, StopReason::WaitPlanExhausted);
        assert_eq!(sink.log().sent_reports().len(), 3);
        assert_eq!(sink.log().count(|k| *k == SinkEventKind::Close), 1);
    }

    #[test]
    fn test_waits_are_wall_clock_delays() {
        let job = job(3, vec![0.04, 0.04]);
        let mut sink = MockSink::new(1);
        let start = Instant::now();
        play(&job, &mut sink, &CancelToken::new()).unwrap();
        assert!(start.elapsed() >= Duration::from_millis(80));

        let sends: Vec<Instant> = sink
            .log()
            .events()
            .into_iter()
            .filter(|e| matches!(e.kind, SinkEventKind::Send(_)))
            .map(|e| e.at)
            .collect();
        assert!(sends[1].duration_since(sends[0]) >= Duration::from_millis(40));
    }

    #[test]
    fn test_send_failure_marks_worker_failed() {
        let job = job(5, vec![0.0; 4]);
        let mut sink = MockSink::new(1).fail_after_sends(2);
        let err = play(&job, &mut sink, &CancelToken::new()).unwrap_err();

        match err {
            SimError::Sink { callsign, uid, source } => {
                assert_eq!(callsign, "A1_Walk");
                assert_eq!(uid, job.identity.uid);
                assert!(matches!(source, SinkError::SendFailed { .. }));
            }
            other => panic!("unexpected error: {}", other),
        }
        assert_eq!(sink.log().sent_reports().len(), 2);
        assert!(!sink.is_open());
    }

    #[test]
    fn test_connection_failure_sends_nothing() {
        let job = job(3, vec![0.0; 2]);
        let mut sink = MockSink::new(1).refuse_connection();
        let err = play(&job, &mut sink, &CancelToken::new()).unwrap_err();

        assert!(err.is_sink());
        assert!(sink.log().events().is_empty());
    }

    #[test]
    fn test_retry_policy_recovers_transient_failures() {
        let mut job = job(3, vec![0.0; 2]);
        job.config = job.config.clone().with_retry(RetryPolicy::new(2, 1));
        let mut sink = MockSink::new(1).transient_send_failures(2);
        let summary = play(&job, &mut sink, &CancelToken::new()).unwrap();

        assert_eq!(summary.reports_sent, 3);
        assert_eq!(sink.log().sent_reports().len(), 3);
    }

    #[test]
    fn test_no_retry_by_default() {
        let job = job(3, vec![0.0; 2]);
        let mut sink = MockSink::new(1).transient_send_failures(1);
        assert!(play(&job, &mut sink, &CancelToken::new()).is_err());
    }

    #[test]
    fn test_cancel_before_start_never_opens() {
        let job = job(3, vec![0.0; 2]);
        let cancel = CancelToken::new();
        cancel.cancel();

        let mut sink = MockSink::new(1);
        let summary = play(&job, &mut sink, &cancel).unwrap();
        assert_eq!(summary.stop_reason, StopReason::Cancelled);
        assert_eq!(summary.reports_sent, 0);
        assert!(sink.log().events().is_empty());
    }

    #[test]
    fn test_cancel_interrupts_wait_and_closes() {
        let job = job(3, vec![30.0, 30.0]);
        let sink = MockSink::new(1);
        let log = sink.log().clone();
        let cancel = CancelToken::new();

        let start = Instant::now();
        let handle = spawn_worker(job, Box::new(sink), cancel.clone()).unwrap();
        while log.sent_reports().is_empty() {
            thread::sleep(Duration::from_millis(5));
        }
        handle.cancel();
        let summary = handle.join().unwrap();

        assert!(start.elapsed() < Duration::from_secs(10));
        assert_eq!(summary.stop_reason, StopReason::Cancelled);
        assert_eq!(summary.reports_sent, 1);
        assert_eq!(log.count(|k| *k == SinkEventKind::Close), 1);
        assert!(cancel.is_cancelled());
    }

    #[test]
    fn test_invalid_job_is_rejected_before_spawn() {
        let mut bad = job(3, vec![0.0; 2]);
        bad.config.speed_kph = 0.0;
        let err = spawn_worker(bad, Box::new(MockSink::new(1)), CancelToken::new()).unwrap_err();
        assert_eq!(err.parameter(), Some("speed_kph"));

        let err = play(&job(1, vec![]), &mut MockSink::new(1), &CancelToken::new()).unwrap_err();
        assert_eq!(err.parameter(), Some("route"));

        let err = play(&job(2, vec![-1.0]), &mut MockSink::new(1), &CancelToken::new()).unwrap_err();
        assert_eq!(err.parameter(), Some("waits"));
    }

    #[test]
    fn test_handle_exposes_terminal_state() {
        let failing = spawn_worker(job(3, vec![0.0; 2]), Box::new(MockSink::new(1).fail_after_sends(1)), CancelToken::new()).unwrap();
        let finished = spawn_worker(job(2, vec![0.0]), Box::new(MockSink::new(2)), CancelToken::new()).unwrap();
        while !failing.is_finished() || !finished.is_finished() {
            thread::sleep(Duration::from_millis(5));
        }

        assert_eq!(failing.state(), WorkerState::Failed);
        assert_eq!(finished.state(), WorkerState::Closed);
        assert!(failing.state().is_terminal() && finished.state().is_terminal());
        assert!(failing.join().is_err());
        assert!(finished.join().is_ok());
    }

    #[test]
    fn test_spawned_worker_reports_summary() {
        let job = job(2, vec![0.0]);
        let handle = spawn_worker(job, Box::new(MockSink::new(9)), CancelToken::new()).unwrap();
        assert_eq!(handle.callsign(), "A1_Walk");
        let summary = handle.join().unwrap();
        assert_eq!(summary.reports_sent, 2);
    }
}
