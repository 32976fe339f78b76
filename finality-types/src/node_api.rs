//! Payloads of the per-node query API.
//!
//! Only the fields the watcher consumes are modelled; anything else a node
//! returns is ignored during deserialization.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Response of the node's "get chain info" endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ChainInfo {
    /// Highest block the node considers final
    pub last_irreversible_block_num: u64,
    /// Current head block (diagnostics only)
    #[serde(default)]
    pub head_block_num: u64,
}

/// Identifier of a block as reported by a node.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockId(String);

impl BlockId {
    /// Wrap a block id string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The raw id string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Response of the node's "resolve transaction by correlation id" endpoint.
///
/// Some node versions omit the block id; callers then look it up by number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkTrxResponse {
    /// Block the transaction was packed into
    pub block_num: u64,
    /// Transaction id
    pub trx_id: String,
    /// Block id, when the node includes it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_id: Option<BlockId>,
}

/// Where a node says a watched transaction was packed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrxLocation {
    /// Block number
    pub block_num: u64,
    /// Block id
    pub block_id: BlockId,
    /// Transaction id
    pub trx_id: String,
}
