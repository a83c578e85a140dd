//! Supervision of every worker launched in one simulation run

use crate::playback::cancel::CancelToken;
use crate::playback::group::GroupHandle;
use crate::playback::scheduler::{spawn_worker, PlaybackJob, PlaybackSummary, WorkerHandle};
use crate::sink::ReportSink;
use crate::validation::error::SimResult;
use log::{info, warn};

/// Outcome of one supervised worker
#[derive(Debug)]
pub struct WorkerOutcome {
    pub callsign: String,
    pub uid: String,
    pub result: SimResult<PlaybackSummary>,
}

impl WorkerOutcome {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Owns a root cancel token and the handles of every worker started under it
#[derive(Debug, Default)]
pub struct Supervisor {
    token: CancelToken,
    workers: Vec<WorkerHandle>,
}

impl Supervisor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Root token; pass children of it to workers launched elsewhere
    pub fn token(&self) -> &CancelToken {
        &self.token
    }

    /// Launch `job` under this supervisor
    pub fn spawn(&mut self, job: PlaybackJob, sink: Box<dyn ReportSink + Send>) -> SimResult<&WorkerHandle> {
        let handle = spawn_worker(job, sink, self.token.child())?;
        self.workers.push(handle);
        Ok(&self.workers[self.workers.len() - 1])
    }

    pub fn adopt(&mut self, handle: WorkerHandle) {
        self.workers.push(handle);
    }

    pub fn adopt_group(&mut self, group: GroupHandle) {
        self.workers.extend(group.into_members());
    }

    pub fn len(&self) -> usize {
        self.workers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }

    /// Number of workers still running
    pub fn active(&self) -> usize {
        self.workers
            .iter()
            .filter(|w| !w.is_finished() && !w.state().is_terminal())
            .count()
    }

    /// Cancel every worker and wait for all of them to close their sinks
    pub fn shutdown(mut self) -> Vec<WorkerOutcome> {
        info!("Shutting down {} worker(s)", self.workers.len());
        self.token.cancel();
        Self::join_all(std::mem::take(&mut self.workers))
    }

    /// Wait for every worker to finish on its own
    pub fn wait(mut self) -> Vec<WorkerOutcome> {
        Self::join_all(std::mem::take(&mut self.workers))
    }

    fn join_all(workers: Vec<WorkerHandle>) -> Vec<WorkerOutcome> {
        workers
            .into_iter()
            .map(|handle| {
                let callsign = handle.callsign().to_string();
                let uid = handle.uid().to_string();
                let result = handle.join();
                if let Err(e) = &result {
                    warn!("Worker {} ({}) ended with error: {}", callsign, uid, e);
                }
                WorkerOutcome { callsign, uid, result }
            })
            .collect()
    }
}

/// Dropping a supervisor that still owns workers shuts them down
impl Drop for Supervisor {
    fn drop(&mut self) {
        if self.workers.is_empty() {
            return;
        }
        warn!("Supervisor dropped with {} worker(s); cancelling", self.workers.len());
        self.token.cancel();
        Self::join_all(std::mem::take(&mut self.workers));
    }
}
