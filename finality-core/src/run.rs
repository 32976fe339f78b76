//! Run aggregate: one node snapshot, the live watches, and a single verdict.
//!
//! A [`Run`] is the only mutable state of a finality check. It accepts
//! chain-info refreshes, poll answers and engine ticks, and it settles on
//! exactly one [`RunReport`]. Once settled, every further input is ignored.

use std::fmt;
use std::time::Instant;

use finality_types::{ChainInfo, CorrelationId, Diagnosis, NodeReport, Verdict};

use crate::engine::{detect_fork, Assessment, ConsistencyEngine, Deadlines};
use crate::{NodeIndex, NodeRegistry, Observation, Watch, WatchRegistry};

/// Submission and finalization counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunProgress {
    /// Transactions the run will submit in total.
    pub target: u32,
    /// Transactions submitted so far.
    pub submitted: u32,
    /// Transactions finalized on every node.
    pub finalized: u32,
    /// Watches still in flight.
    pub in_flight: usize,
}

impl fmt::Display for RunProgress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "submitted {}/{}, finalized {}, in flight {}",
            self.submitted, self.target, self.finalized, self.in_flight
        )
    }
}

/// Terminal result of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    /// The verdict.
    pub verdict: Verdict,
    /// State of the offending watch, for failures.
    pub diagnosis: Option<Diagnosis>,
    /// Counters at the moment the run settled.
    pub progress: RunProgress,
}

/// State of one finality run.
#[derive(Debug, Clone)]
pub struct Run {
    nodes: NodeRegistry,
    watches: WatchRegistry,
    engine: ConsistencyEngine,
    target: u32,
    submitted: u32,
    finalized: u32,
    report: Option<RunReport>,
}

impl Run {
    /// Start a run that will submit `target` transactions to `nodes`.
    pub fn new(nodes: NodeRegistry, target: u32, deadlines: Deadlines) -> Self {
        let watches = WatchRegistry::new(nodes.len());
        Self {
            nodes,
            watches,
            engine: ConsistencyEngine::new(deadlines),
            target,
            submitted: 0,
            finalized: 0,
            report: None,
        }
    }

    /// The monitored nodes.
    pub fn nodes(&self) -> &NodeRegistry {
        &self.nodes
    }

    /// The in-flight watches.
    pub fn watches(&self) -> &WatchRegistry {
        &self.watches
    }

    /// The terminal report, once the run has settled.
    pub fn report(&self) -> Option<&RunReport> {
        self.report.as_ref()
    }

    /// True once a verdict was reached.
    pub fn is_terminal(&self) -> bool {
        self.report.is_some()
    }

    /// True while more transactions remain to be submitted.
    pub fn wants_submission(&self) -> bool {
        !self.is_terminal() && self.submitted < self.target
    }

    /// Current counters.
    pub fn progress(&self) -> RunProgress {
        RunProgress {
            target: self.target,
            submitted: self.submitted,
            finalized: self.finalized,
            in_flight: self.watches.len(),
        }
    }

    /// Register a newly submitted transaction.
    ///
    /// Returns false if the run is terminal, the target was already reached,
    /// or the id is already watched.
    pub fn add_watch(&mut self, correlation_id: CorrelationId, now: Instant) -> bool {
        if !self.wants_submission() {
            return false;
        }
        if !self.watches.add_watch(correlation_id, now) {
            return false;
        }
        self.submitted += 1;
        true
    }

    /// Apply a node's chain info.
    pub fn record_chain_info(&mut self, node: NodeIndex, info: &ChainInfo) {
        if self.is_terminal() {
            return;
        }
        self.nodes.apply_chain_info(node, info);
    }

    /// Apply one node's answer about one watch.
    ///
    /// A fork is fatal immediately, even when every node is past its
    /// frontier; otherwise a watch that becomes finalized is retired. Returns the verdict if this call settled the run.
    pub fn record_observation(
        &mut self,
        correlation_id: &CorrelationId,
        node: NodeIndex,
        observation: Observation,
        now: Instant,
    ) -> Option<Verdict> {
        if self.is_terminal() {
            return None;
        }

        let frontier = self.nodes.frontier(node);
        let changed = self
            .watches
            .get_mut(correlation_id)?
            .observe(node, observation, frontier);
        if !changed {
            return None;
        }

        let watch = self.watches.get(correlation_id)?;
        if detect_fork(watch).is_some() {
            let diagnosis = self.diagnose(watch, now);
            return self.fail(Verdict::Forked, diagnosis);
        }

        if watch.is_finalized() {
            self.retire(correlation_id);
            return self.settle_if_complete();
        }

        None
    }

    /// Run the consistency engine over every in-flight watch.
    ///
    /// Finalized watches are retired; the first failing watch (in
    /// correlation-id order) settles the run. Returns the verdict if this
    /// call settled the run.
    pub fn evaluate(&mut self, now: Instant) -> Option<Verdict> {
        if self.is_terminal() {
            return None;
        }

        for id in self.watches.ids() {
            let Some(watch) = self.watches.get(&id) else {
                continue;
            };
            match self.engine.assess(watch, now) {
                Assessment::Finalized => self.retire(&id),
                Assessment::Waiting => {}
                Assessment::Failed(verdict) => {
                    let diagnosis = self.diagnose(watch, now);
                    return self.fail(verdict, diagnosis);
                }
            }
        }

        self.settle_if_complete()
    }

    /// Describe a watch for a failure report.
    pub fn diagnose(&self, watch: &Watch, now: Instant) -> Diagnosis {
        let nodes = self
            .nodes
            .iter()
            .map(|(index, node)| NodeReport {
                url: node.url().to_string(),
                status: watch.status(index).cloned().unwrap_or_default(),
                ever_located: watch.ever_located(index),
                accepted: watch.is_accepted(index),
                irreversible_block_num: node.irreversible_block_num(),
            })
            .collect();

        Diagnosis {
            correlation_id: watch.correlation_id(),
            age_secs: watch.age(now).as_secs(),
            nodes,
        }
    }

    fn retire(&mut self, correlation_id: &CorrelationId) {
        if self.watches.remove(correlation_id).is_some() {
            self.finalized += 1;
        }
    }

    fn settle_if_complete(&mut self) -> Option<Verdict> {
        if self.submitted < self.target || !self.watches.is_empty() {
            return None;
        }
        self.settle(Verdict::Success, None)
    }

    fn fail(&mut self, verdict: Verdict, diagnosis: Diagnosis) -> Option<Verdict> {
        self.settle(verdict, Some(diagnosis))
    }

    fn settle(&mut self, verdict: Verdict, diagnosis: Option<Diagnosis>) -> Option<Verdict> {
        if self.report.is_some() {
            return None;
        }
        let progress = self.progress();
        self.report = Some(RunReport {
            verdict,
            diagnosis,
            progress,
        });
        self.watches.clear();
        Some(verdict)
    }
}
