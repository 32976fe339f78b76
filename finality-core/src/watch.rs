//! Watched transactions and their per-node status.
//!
//! Status transitions follow one rule: a node's status never returns to
//! `Unknown`. `Rejected` may replace a `Located` (that is how a rollback
//! becomes visible), and `Located` may replace anything. Whether a node ever
//! reported a location is remembered separately, so a later `Rejected` does
//! not erase it.

use std::collections::BTreeSet;
use std::time::{Duration, Instant};

use finality_types::{BlockId, CorrelationId, StatusValue};

use crate::NodeIndex;

/// A decoded answer from one node about one watch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Observation {
    /// The node packed the transaction at this location.
    Located {
        /// Block number
        block_num: u64,
        /// Block id
        block_id: BlockId,
    },
    /// The node has no such transaction.
    Rejected,
}

impl Observation {
    fn into_status(self) -> StatusValue {
        match self {
            Observation::Located {
                block_num,
                block_id,
            } => StatusValue::Located {
                block_num,
                block_id,
            },
            Observation::Rejected => StatusValue::Rejected,
        }
    }
}

/// One submitted transaction being tracked across all nodes.
#[derive(Debug, Clone)]
pub struct Watch {
    correlation_id: CorrelationId,
    submit_time: Instant,
    statuses: Vec<StatusValue>,
    ever_located: Vec<bool>,
    accepted: BTreeSet<NodeIndex>,
}

impl Watch {
    /// Create a watch with `Unknown` status on each of `node_count` nodes.
    pub fn new(correlation_id: CorrelationId, submit_time: Instant, node_count: usize) -> Self {
        Self {
            correlation_id,
            submit_time,
            statuses: vec![StatusValue::Unknown; node_count],
            ever_located: vec![false; node_count],
            accepted: BTreeSet::new(),
        }
    }

    /// The transaction's correlation id.
    pub fn correlation_id(&self) -> CorrelationId {
        self.correlation_id
    }

    /// When the transaction was submitted.
    pub fn submit_time(&self) -> Instant {
        self.submit_time
    }

    /// Time elapsed since submission.
    pub fn age(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.submit_time)
    }

    /// Number of nodes this watch tracks.
    pub fn node_count(&self) -> usize {
        self.statuses.len()
    }

    /// Current status reported by a node.
    pub fn status(&self, node: NodeIndex) -> Option<&StatusValue> {
        self.statuses.get(node.get())
    }

    /// Statuses in node order.
    pub fn statuses(&self) -> impl Iterator<Item = (NodeIndex, &StatusValue)> {
        self.statuses
            .iter()
            .enumerate()
            .map(|(i, s)| (NodeIndex::new(i), s))
    }

    /// Whether a node ever reported a location for this watch.
    pub fn ever_located(&self, node: NodeIndex) -> bool {
        self.ever_located.get(node.get()).copied().unwrap_or(false)
    }

    /// Whether any node ever reported a location for this watch.
    pub fn any_ever_located(&self) -> bool {
        self.ever_located.iter().any(|&seen| seen)
    }

    /// Whether a node counts as having finalized this watch.
    pub fn is_accepted(&self, node: NodeIndex) -> bool {
        self.accepted.contains(&node)
    }

    /// Number of nodes that finalized this watch.
    pub fn accepted_count(&self) -> usize {
        self.accepted.len()
    }

    /// True once every node finalized the watch.
    pub fn is_finalized(&self) -> bool {
        !self.statuses.is_empty() && self.accepted.len() == self.statuses.len()
    }

    /// Record a node's answer.
    ///
    /// `frontier` is the node's irreversible block number at the time the
    /// answer is applied; a location at or below it marks the node as
    /// accepted. Returns true if anything about the watch changed, so
    /// redelivering the same answer reports false.
    pub fn observe(&mut self, node: NodeIndex, observation: Observation, frontier: u64) -> bool {
        let i = node.get();
        if i >= self.statuses.len() {
            return false;
        }

        let final_block = match &observation {
            Observation::Located { block_num, .. } => Some(*block_num),
            Observation::Rejected => None,
        };

        let status = observation.into_status();
        let mut changed = false;

        if self.statuses[i] != status {
            self.statuses[i] = status;
            // Acceptance is tied to a specific location.
            self.accepted.remove(&node);
            changed = true;
        }

        if let Some(block_num) = final_block {
            if !self.ever_located[i] {
                self.ever_located[i] = true;
                changed = true;
            }
            if block_num <= frontier {
                changed |= self.accepted.insert(node);
            }
        }

        changed
    }
}
