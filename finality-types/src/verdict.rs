//! Terminal run verdicts and the diagnosis attached to failures.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{BlockId, CorrelationId};

/// What a single node last reported for a watched transaction.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum StatusValue {
    /// No response recorded yet
    #[default]
    Unknown,
    /// Node reports no such transaction
    Rejected,
    /// Node reports a packing location
    Located {
        /// Block number
        block_num: u64,
        /// Block id
        block_id: BlockId,
    },
}

impl StatusValue {
    /// Returns the location if this status is `Located`.
    pub fn location(&self) -> Option<(u64, &BlockId)> {
        match self {
            StatusValue::Located {
                block_num,
                block_id,
            } => Some((*block_num, block_id)),
            _ => None,
        }
    }

    /// Returns true for `Rejected`.
    pub fn is_rejected(&self) -> bool {
        matches!(self, StatusValue::Rejected)
    }
}

/// Terminal outcome of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    /// Every watched transaction reached irreversible finality on every node
    Success,
    /// No node ever packed the transaction
    NeverPacked,
    /// The transaction was seen, then disappeared from every node
    RolledBack,
    /// Two nodes packed the transaction into different blocks
    Forked,
    /// The hard deadline passed without a decision
    TimedOut,
}

impl Verdict {
    /// Reply string sent on the control channel.
    pub fn as_message(&self) -> &'static str {
        match self {
            Verdict::Success => "Success",
            Verdict::NeverPacked => "not packed",
            Verdict::RolledBack => "rolled",
            Verdict::Forked => "forked",
            Verdict::TimedOut => "wait too long, maybe block can not be checked",
        }
    }

    /// Returns true for `Success`.
    pub fn is_success(&self) -> bool {
        matches!(self, Verdict::Success)
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_message())
    }
}

/// Per-node line of a [`Diagnosis`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeReport {
    /// Node base URL
    pub url: String,
    /// Current status for the watch
    pub status: StatusValue,
    /// Whether the node ever reported a location
    pub ever_located: bool,
    /// Whether the node counts as having finalized the watch
    pub accepted: bool,
    /// Node's irreversible frontier when the diagnosis was taken
    pub irreversible_block_num: u64,
}

/// State of the offending watch when a run failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnosis {
    /// The watch that failed
    pub correlation_id: CorrelationId,
    /// Seconds since the watch was submitted
    pub age_secs: u64,
    /// Per-node state in configuration order
    pub nodes: Vec<NodeReport>,
}
