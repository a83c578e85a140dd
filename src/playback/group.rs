//! Group playback: one base route fanned out to several offset members

use crate::algorithms::offset::offset_route;
use crate::playback::cancel::CancelToken;
use crate::playback::scheduler::{spawn_worker, PlaybackJob, PlaybackSummary, WorkerHandle};
use crate::sink::SinkFactory;
use crate::validation::error::{SimError, SimResult};
use log::info;
use rand::Rng;

/// Size and spread of a simulated group
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct GroupLayout {
    pub count: usize,
    /// Distance each member is moved from the base route
    pub offset_km: f64,
}

impl GroupLayout {
    pub fn new(count: usize, offset_km: f64) -> Self {
        Self { count, offset_km }
    }

    pub fn validate(&self) -> SimResult<()> {
        if self.count < 1 {
            return Err(SimError::configuration(
                "count",
                self.count,
                "a group needs at least one member",
            ));
        }
        if !self.offset_km.is_finite() || self.offset_km < 0.0 {
            return Err(SimError::configuration(
                "offset_km",
                self.offset_km,
                "offset must be a finite, non-negative distance",
            ));
        }
        Ok(())
    }
}

/// Handles to every launched member of a group
#[derive(Debug)]
pub struct GroupHandle {
    cancel: CancelToken,
    members: Vec<WorkerHandle>,
}

impl GroupHandle {
    pub fn members(&self) -> &[WorkerHandle] {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Stop every member at its next wait boundary
    pub fn cancel_all(&self) {
        self.cancel.cancel();
    }

    /// Wait for every member; one member's failure does not affect the others
    pub fn join_all(self) -> Vec<SimResult<PlaybackSummary>> {
        self.members.into_iter().map(WorkerHandle::join).collect()
    }

    pub fn into_members(self) -> Vec<WorkerHandle> {
        self.members
    }
}

/// Launch `layout.count` offset copies of `base` and return without waiting.
///
/// Member `i` plays the base route moved `layout.offset_km` along its own random
/// bearing, reports as `"{callsign}_{i}"` with a fresh uid, and owns a sink
/// from `sink_factory`. The waits of `base` are reused unchanged. Everything
/// is validated before the first member starts.
pub fn play_group<R: Rng + ?Sized>(
    base: &PlaybackJob,
    layout: GroupLayout,
    sink_factory: &SinkFactory,
    rng: &mut R,
    cancel: &CancelToken,
) -> SimResult<GroupHandle> {
    base.validate()?;
    layout.validate()?;

    let jobs: Vec<PlaybackJob> = (0..layout.count)
        .map(|index| PlaybackJob {
            route: offset_route(&base.route, layout.offset_km, rng),
            waits: base.waits.clone(),
            identity: base.identity.group_member(index),
            config: base.config.clone(),
            endpoint: base.endpoint.clone(),
        })
        .collect();
    for job in &jobs {
        job.validate()?;
    }

    let group_cancel = cancel.child();
    let mut members = Vec::with_capacity(jobs.len());
    for job in jobs {
        match spawn_worker(job, sink_factory(), group_cancel.child()) {
            Ok(handle) => members.push(handle),
            Err(e) => {
                group_cancel.cancel();
                return Err(e);
            }
        }
    }

    info!(
        "Launched group {} with {} member(s) offset {} km",
        base.identity.callsign, layout.count, layout.offset_km
    );
    Ok(GroupHandle {
        cancel: group_cancel,
        members,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{EntityIdentity, PlaybackConfig, ServerEndpoint, Waypoint};
    use crate::playback::scheduler::StopReason;
    use crate::sink::{MockSink, ReportSink, SinkEventKind, SinkLog};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    fn base_job(waits: Vec<f64>) -> PlaybackJob {
        let route = (0..waits.len() + 1)
            .map(|i| Waypoint::new(-27.4635 + i as f64 * 0.0001, 153.0355))
            .collect();
        PlaybackJob::new(
            route,
            waits,
            EntityIdentity::new("A2_Walk"),
            PlaybackConfig::default(),
            ServerEndpoint::new("localhost", 8087),
        )
    }

    fn factory(log: &SinkLog, failing_id: Option<u32>) -> SinkFactory {
        let log = log.clone();
        let next_id = Arc::new(AtomicU32::new(0));
        Arc::new(move || {
            let id = next_id.fetch_add(1, Ordering::SeqCst);
            let sink = MockSink::with_log(id, log.clone());
            let sink = if Some(id) == failing_id { sink.fail_after_sends(1) } else { sink };
            Box::new(sink) as Box<dyn ReportSink + Send>
        })
    }

    #[test]
    fn test_group_of_three_members() {
        let log = SinkLog::new();
        let base = base_job(vec![0.001; 3]);
        let mut rng = ChaCha8Rng::seed_from_u64(1);

        let group = play_group(&base, GroupLayout::new(3, 0.05), &factory(&log, None), &mut rng, &CancelToken::new()).unwrap();
        assert_eq!(group.len(), 3);

        let callsigns: Vec<String> = group.members().iter().map(|m| m.callsign().to_string()).collect();
        assert_eq!(callsigns, vec!["A2_Walk_0", "A2_Walk_1", "A2_Walk_2"]);

        let uids: HashSet<String> = group.members().iter().map(|m| m.uid().to_string()).collect();
        assert_eq!(uids.len(), 3);
        assert!(!uids.contains(&base.identity.uid));

        let results = group.join_all();
        assert!(results.iter().all(|r| r.as_ref().map(|s| s.reports_sent == 4).unwrap_or(false)));
        assert_eq!(log.count(|k| matches!(k, SinkEventKind::Open(_))), 3);
        assert_eq!(log.count(|k| *k == SinkEventKind::Close), 3);

        // Each member reported its own route, never the base route
        let reports = log.sent_reports();
        assert_eq!(reports.len(), 12);
        assert!(reports.iter().all(|r| r.waypoint() != base.route[0]));
    }

    #[test]
    fn test_member_failure_is_isolated() {
        let log = SinkLog::new();
        let base = base_job(vec![0.01; 3]);
        let mut rng = ChaCha8Rng::seed_from_u64(2);

        let group = play_group(&base, GroupLayout::new(3, 0.05), &factory(&log, Some(1)), &mut rng, &CancelToken::new()).unwrap();
        let results = group.join_all();

        assert!(results[0].is_ok());
        assert!(results[2].is_ok());
        match &results[1] {
            Err(SimError::Sink { callsign, .. }) => assert_eq!(callsign, "A2_Walk_1"),
            other => panic!("expected sink failure, got {:?}", other),
        }

        // Every member opened its own connection
        assert_eq!(log.count(|k| matches!(k, SinkEventKind::Open(_))), 3);
        assert_eq!(log.events_for(0).iter().filter(|e| matches!(e.kind, SinkEventKind::Send(_))).count(), 4);
        assert_eq!(log.events_for(2).iter().filter(|e| matches!(e.kind, SinkEventKind::Send(_))).count(), 4);
    }

    #[test]
    fn test_invalid_group_launches_nothing() {
        let log = SinkLog::new();
        let base = base_job(vec![0.0; 2]);
        let mut rng = ChaCha8Rng::seed_from_u64(3);

        let err = play_group(&base, GroupLayout::new(0, 0.05), &factory(&log, None), &mut rng, &CancelToken::new()).unwrap_err();
        assert_eq!(err.parameter(), Some("count"));

        let mut slow = base.clone();
        slow.config.max_time_step_secs = 0.0;
        let err = play_group(&slow, GroupLayout::new(3, 0.05), &factory(&log, None), &mut rng, &CancelToken::new()).unwrap_err();
        assert_eq!(err.parameter(), Some("max_time_step_secs"));

        assert!(log.events().is_empty());
    }

    #[test]
    fn test_cancel_all_stops_members() {
        let log = SinkLog::new();
        let base = base_job(vec![30.0; 3]);
        let mut rng = ChaCha8Rng::seed_from_u64(4);

        let group = play_group(&base, GroupLayout::new(2, 0.01), &factory(&log, None), &mut rng, &CancelToken::new()).unwrap();
        while log.sent_reports().len() < 2 {
            std::thread::sleep(Duration::from_millis(5));
        }
        group.cancel_all();

        for result in group.join_all() {
            assert_eq!(result.unwrap().stop_reason, StopReason::Cancelled);
        }
    }

    #[test]
    fn test_group_layout_validation() {
        assert!(GroupLayout::new(1, 0.0).validate().is_ok());
        assert!(GroupLayout::new(2, -0.1).validate().is_err());
        assert!(GroupLayout::new(2, f64::NAN).validate().is_err());
    }
}
