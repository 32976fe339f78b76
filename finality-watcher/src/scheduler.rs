//! Scheduler: drives one [`Run`] with timers and spawned node requests.
//!
//! Each run is a single tokio task that exclusively owns its [`Run`]. Node
//! requests and submissions are spawned into a [`JoinSet`] owned by that
//! task; each returns a [`LoopEvent`] which the loop applies to the run.
//!
//! Aborting the task (via [`RunHandle::abort`]) drops the `JoinSet`, which
//! aborts every in-flight request, and drops the report sender without a
//! value.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use finality_core::{Deadlines, NodeIndex, NodeRegistry, Run, RunReport};
use finality_types::{ChainInfo, CorrelationId};
use tokio::sync::oneshot;
use tokio::task::{AbortHandle, JoinHandle, JoinSet};
use tokio::time::{interval, interval_at, Interval, MissedTickBehavior};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::ScheduleConfig;
use crate::node_api::{NodeApi, NodeApiError, Resolution};
use crate::submit::{SubmitError, SubmitRequest, Submitter};

/// Timer periods and deadlines of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schedule {
    /// Chain info refresh period.
    pub refresh: Duration,
    /// Per-watch poll period.
    pub poll: Duration,
    /// Consistency check period.
    pub check: Duration,
    /// Soft and hard deadlines.
    pub deadlines: Deadlines,
}

impl Default for Schedule {
    fn default() -> Self {
        Self::from(&ScheduleConfig::default())
    }
}

impl From<&ScheduleConfig> for Schedule {
    fn from(config: &ScheduleConfig) -> Self {
        Self {
            refresh: Duration::from_millis(config.refresh_interval_ms),
            poll: Duration::from_millis(config.poll_interval_ms),
            check: Duration::from_millis(config.check_interval_ms),
            deadlines: config.deadlines(),
        }
    }
}

/// Parameters of one run.
#[derive(Debug, Clone)]
pub struct RunParams {
    /// Nodes to monitor.
    pub nodes: NodeRegistry,
    /// Transactions to submit.
    pub amount: u32,
    /// Gap between submissions.
    pub freq: Duration,
    /// Submission endpoint.
    pub submit_url: String,
    /// Opaque account source.
    pub users: Option<String>,
    /// Opaque debug switch.
    pub debug: Option<serde_json::Value>,
}

/// Handle to a running scheduler task.
#[derive(Debug)]
pub struct RunHandle {
    id: Uuid,
    task: JoinHandle<()>,
}

impl RunHandle {
    /// Unique id of this run (for logs and bookkeeping).
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// True once the task has exited.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Cancel the run. No report will be delivered.
    pub fn abort(&self) {
        self.task.abort();
    }

    /// Handle that cancels the run without owning it.
    pub fn abort_handle(&self) -> AbortHandle {
        self.task.abort_handle()
    }
}

/// Results of spawned work, consumed by the run loop.
#[derive(Debug)]
enum LoopEvent {
    ChainInfo {
        node: NodeIndex,
        result: Result<ChainInfo, NodeApiError>,
    },
    Poll {
        correlation_id: CorrelationId,
        node: NodeIndex,
        result: Result<Resolution, NodeApiError>,
    },
    Submitted {
        correlation_id: CorrelationId,
        result: Result<(), SubmitError>,
    },
}

/// Start a run on the current runtime.
///
/// The returned receiver yields the run's report once it settles. If the
/// run is aborted first, the receiver errors instead.
pub fn spawn_run(
    api: Arc<dyn NodeApi>,
    submitter: Arc<dyn Submitter>,
    schedule: Schedule,
    params: RunParams,
) -> (RunHandle, oneshot::Receiver<RunReport>) {
    let (tx, rx) = oneshot::channel();
    let id = Uuid::new_v4();
    let task = tokio::spawn(async move {
        let loop_state = RunLoop::new(id, api, submitter, schedule, params);
        let report = loop_state.drive().await;
        let _ = tx.send(report);
    });
    (RunHandle { id, task }, rx)
}

/// Current time on the tokio clock (honours paused time in tests).
fn now() -> std::time::Instant {
    tokio::time::Instant::now().into_std()
}

fn ticker(period: Duration, first_immediately: bool) -> Interval {
    let mut timer = if first_immediately {
        interval(period)
    } else {
        interval_at(tokio::time::Instant::now() + period, period)
    };
    timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
    timer
}

struct RunLoop {
    id: Uuid,
    run: Run,
    api: Arc<dyn NodeApi>,
    submitter: Arc<dyn Submitter>,
    schedule: Schedule,
    params: RunParams,
    tasks: JoinSet<LoopEvent>,
    refreshing: BTreeSet<NodeIndex>,
    polling: BTreeSet<(CorrelationId, NodeIndex)>,
}

impl RunLoop {
    fn new(
        id: Uuid,
        api: Arc<dyn NodeApi>,
        submitter: Arc<dyn Submitter>,
        schedule: Schedule,
        params: RunParams,
    ) -> Self {
        let run = Run::new(params.nodes.clone(), params.amount, schedule.deadlines);
        Self {
            id,
            run,
            api,
            submitter,
            schedule,
            params,
            tasks: JoinSet::new(),
            refreshing: BTreeSet::new(),
            polling: BTreeSet::new(),
        }
    }

    async fn drive(mut self) -> RunReport {
        info!(
            run = %self.id,
            nodes = self.run.nodes().len(),
            amount = self.params.amount,
            freq_ms = self.params.freq.as_millis() as u64,
            "Run started"
        );

        let mut refresh = ticker(self.schedule.refresh, true);
        let mut submit = ticker(self.params.freq, true);
        let mut poll = ticker(self.schedule.poll, true);
        let mut check = ticker(self.schedule.check, false);

        loop {
            tokio::select! {
                _ = refresh.tick() => self.refresh_nodes(),
                _ = submit.tick(), if self.run.wants_submission() => self.submit_next(),
                _ = poll.tick() => self.poll_watches(),
                _ = check.tick() => {
                    self.run.evaluate(now());
                }
                Some(joined) = self.tasks.join_next() => match joined {
                    Ok(event) => self.apply(event),
                    Err(e) => debug!(run = %self.id, error = %e, "Request task failed"),
                },
            }

            if let Some(report) = self.run.report() {
                let report = report.clone();
                self.log_verdict(&report);
                return report;
            }
        }
    }

    fn refresh_nodes(&mut self) {
        for (index, node) in self.run.nodes().iter() {
            if !self.refreshing.insert(index) {
                continue;
            }
            let api = Arc::clone(&self.api);
            let url = node.url().to_string();
            self.tasks.spawn(async move {
                let result = api.chain_info(&url).await;
                LoopEvent::ChainInfo {
                    node: index,
                    result,
                }
            });
        }
    }

    fn submit_next(&mut self) {
        let correlation_id = CorrelationId::random();
        // Watch first, so an answer can never arrive for an unknown id.
        if !self.run.add_watch(correlation_id, now()) {
            return;
        }

        let request = SubmitRequest {
            correlation_id,
            url: self.params.submit_url.clone(),
            users: self.params.users.clone(),
            debug: self.params.debug.clone(),
        };
        debug!(run = %self.id, id = %correlation_id, progress = %self.run.progress(), "Submitting");

        let submitter = Arc::clone(&self.submitter);
        self.tasks.spawn(async move {
            let result = submitter.submit(&request).await;
            LoopEvent::Submitted {
                correlation_id,
                result,
            }
        });
    }

    fn poll_watches(&mut self) {
        for correlation_id in self.run.watches().ids() {
            for (index, node) in self.run.nodes().iter() {
                if !self.polling.insert((correlation_id, index)) {
                    continue;
                }
                let api = Arc::clone(&self.api);
                let url = node.url().to_string();
                self.tasks.spawn(async move {
                    let result = api.resolve(&url, &correlation_id).await;
                    LoopEvent::Poll {
                        correlation_id,
                        node: index,
                        result,
                    }
                });
            }
        }
    }

    fn apply(&mut self, event: LoopEvent) {
        match event {
            LoopEvent::ChainInfo { node, result } => {
                self.refreshing.remove(&node);
                match result {
                    Ok(info) => {
                        let first = self
                            .run
                            .nodes()
                            .get(node)
                            .is_some_and(|n| !n.is_refreshed());
                        if first {
                            info!(
                                run = %self.id,
                                node = node.get(),
                                lib = info.last_irreversible_block_num,
                                head = info.head_block_num,
                                "Node reachable"
                            );
                        } else {
                            debug!(
                                run = %self.id,
                                node = node.get(),
                                lib = info.last_irreversible_block_num,
                                "Chain info refreshed"
                            );
                        }
                        self.run.record_chain_info(node, &info);
                    }
                    Err(e) => debug!(run = %self.id, node = node.get(), error = %e, "Chain info failed"),
                }
            }
            LoopEvent::Poll {
                correlation_id,
                node,
                result,
            } => {
                self.polling.remove(&(correlation_id, node));
                match result {
                    Ok(resolution) => {
                        self.run.record_observation(
                            &correlation_id,
                            node,
                            resolution.into_observation(),
                            now(),
                        );
                        if let Some(watch) = self.run.watches().get(&correlation_id) {
                            debug!(
                                run = %self.id,
                                id = %correlation_id,
                                accepted = watch.accepted_count(),
                                nodes = watch.node_count(),
                                "Watch polled"
                            );
                        }
                    }
                    Err(e) => debug!(
                        run = %self.id,
                        id = %correlation_id,
                        node = node.get(),
                        error = %e,
                        "Poll failed"
                    ),
                }
            }
            LoopEvent::Submitted {
                correlation_id,
                result,
            } => {
                if let Err(e) = result {
                    warn!(run = %self.id, id = %correlation_id, error = %e, "Submission failed");
                }
            }
        }
    }

    fn log_verdict(&self, report: &RunReport) {
        if report.verdict.is_success() {
            info!(run = %self.id, progress = %report.progress, "Run succeeded");
            return;
        }
        let diagnosis = report
            .diagnosis
            .as_ref()
            .and_then(|d| serde_json::to_string(d).ok())
            .unwrap_or_default();
        warn!(
            run = %self.id,
            verdict = %report.verdict,
            progress = %report.progress,
            diagnosis = %diagnosis,
            "Run failed"
        );
    }
}
