//! Consistency engine: classification rules for in-flight watches.
//!
//! Under injected latency, loss or partition, `Unknown` and `Rejected`
//! answers are expected noise, so ambiguous states are only classified once
//! a watch is older than the soft deadline. A fork is classified as soon as
//! it is observable, and the hard deadline aborts unconditionally.

use std::time::{Duration, Instant};

use finality_types::{StatusValue, Verdict};

use crate::{NodeIndex, Watch};

/// Default soft deadline.
pub const DEFAULT_SOFT_DEADLINE: Duration = Duration::from_secs(20);

/// Default hard deadline.
pub const DEFAULT_HARD_DEADLINE: Duration = Duration::from_secs(200);

/// Per-watch timeout tiers, measured from the watch's own submit time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadlines {
    /// After this age, ambiguous states are classified.
    pub soft: Duration,
    /// After this age, the run is aborted.
    pub hard: Duration,
}

impl Default for Deadlines {
    fn default() -> Self {
        Self {
            soft: DEFAULT_SOFT_DEADLINE,
            hard: DEFAULT_HARD_DEADLINE,
        }
    }
}

/// Result of assessing one watch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Assessment {
    /// Every node finalized the watch.
    Finalized,
    /// Consistent so far; keep polling.
    Waiting,
    /// The run must fail with this verdict.
    Failed(Verdict),
}

/// Find two nodes that located the watch in different blocks.
///
/// Only nodes currently reporting `Located` take part; nodes are visited in
/// configuration order and the first disagreeing pair is returned.
pub fn detect_fork(watch: &Watch) -> Option<(NodeIndex, NodeIndex)> {
    let mut located = watch
        .statuses()
        .filter_map(|(node, status)| status.location().map(|(_, id)| (node, id)));

    let (first_node, first_id) = located.next()?;
    located
        .find(|(_, id)| *id != first_id)
        .map(|(node, _)| (first_node, node))
}

/// Seen somewhere once, and now rejected by every node.
pub fn is_rolled_back(watch: &Watch) -> bool {
    watch.any_ever_located() && watch.statuses().all(|(_, s)| s.is_rejected())
}

/// Never located anywhere, and nobody currently claims otherwise.
pub fn is_not_packed(watch: &Watch) -> bool {
    !watch.any_ever_located()
        && watch
            .statuses()
            .all(|(_, s)| matches!(s, StatusValue::Unknown | StatusValue::Rejected))
}

/// Applies the classification rules with a fixed set of deadlines.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsistencyEngine {
    deadlines: Deadlines,
}

impl ConsistencyEngine {
    /// Create an engine with the given deadlines.
    pub fn new(deadlines: Deadlines) -> Self {
        Self { deadlines }
    }

    /// The configured deadlines.
    pub fn deadlines(&self) -> Deadlines {
        self.deadlines
    }

    /// Classify a watch at time `now`.
    pub fn assess(&self, watch: &Watch, now: Instant) -> Assessment {
        if detect_fork(watch).is_some() {
            return Assessment::Failed(Verdict::Forked);
        }

        if watch.is_finalized() {
            return Assessment::Finalized;
        }

        let age = watch.age(now);
        if age > self.deadlines.hard {
            return Assessment::Failed(Verdict::TimedOut);
        }

        if age > self.deadlines.soft {
            if is_rolled_back(watch) {
                return Assessment::Failed(Verdict::RolledBack);
            }
            if is_not_packed(watch) {
                return Assessment::Failed(Verdict::NeverPacked);
            }
        }

        Assessment::Waiting
    }
}
