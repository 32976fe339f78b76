//! Mock node API for testing.
//!
//! Lets tests script each node's chain info and resolution answers, take
//! nodes offline, and count the requests made.

use super::{NodeApi, NodeApiError, Resolution};
use async_trait::async_trait;
use finality_types::{BlockId, ChainInfo, CorrelationId, TrxLocation};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

/// Mock node API for testing.
///
/// Clones share state, so a test can keep a handle while the scheduler
/// owns another.
#[derive(Debug, Default)]
pub struct MockNodeApi {
    inner: Arc<Mutex<MockNodeApiInner>>,
}

#[derive(Debug, Default)]
struct MockNodeApiInner {
    chain_info: HashMap<String, ChainInfo>,
    resolutions: HashMap<String, Resolution>,
    overrides: HashMap<(String, CorrelationId), Resolution>,
    unreachable: HashSet<String>,
    fail_next_resolve: Option<String>,
    chain_info_requests: usize,
    resolve_requests: usize,
}

impl MockNodeApi {
    /// Create a mock where every node is reachable but knows nothing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the chain info a node reports.
    pub fn set_chain_info(&self, node_url: &str, last_irreversible_block_num: u64) {
        let mut inner = self.inner.lock().unwrap();
        inner.chain_info.insert(
            node_url.to_string(),
            ChainInfo {
                last_irreversible_block_num,
                head_block_num: last_irreversible_block_num,
            },
        );
    }

    /// Set the chain info a node reports, including its head.
    pub fn set_heads(&self, node_url: &str, head_block_num: u64, last_irreversible_block_num: u64) {
        let mut inner = self.inner.lock().unwrap();
        inner.chain_info.insert(
            node_url.to_string(),
            ChainInfo {
                last_irreversible_block_num,
                head_block_num,
            },
        );
    }

    /// Make a node locate every transaction at the given block.
    pub fn locate_all(&self, node_url: &str, block_num: u64, block_id: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner
            .resolutions
            .insert(node_url.to_string(), located(block_num, block_id));
    }

    /// Make a node answer "not found" for every transaction.
    pub fn reject_all(&self, node_url: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner
            .resolutions
            .insert(node_url.to_string(), not_found());
    }

    /// Script one node's answer about one transaction.
    pub fn set_resolution(&self, node_url: &str, correlation_id: CorrelationId, resolution: Resolution) {
        let mut inner = self.inner.lock().unwrap();
        inner
            .overrides
            .insert((node_url.to_string(), correlation_id), resolution);
    }

    /// Take a node offline (or bring it back).
    pub fn set_unreachable(&self, node_url: &str, unreachable: bool) {
        let mut inner = self.inner.lock().unwrap();
        if unreachable {
            inner.unreachable.insert(node_url.to_string());
        } else {
            inner.unreachable.remove(node_url);
        }
    }

    /// Cause the next resolve() to fail with the given error.
    pub fn fail_next_resolve(&self, error: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner.fail_next_resolve = Some(error.to_string());
    }

    /// Number of chain_info() calls made so far.
    pub fn chain_info_requests(&self) -> usize {
        self.inner.lock().unwrap().chain_info_requests
    }

    /// Number of resolve() calls made so far.
    pub fn resolve_requests(&self) -> usize {
        self.inner.lock().unwrap().resolve_requests
    }
}

impl Clone for MockNodeApi {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

fn located(block_num: u64, block_id: &str) -> Resolution {
    Resolution::Located(TrxLocation {
        block_num,
        block_id: BlockId::new(block_id),
        trx_id: format!("trx-{block_num}"),
    })
}

fn not_found() -> Resolution {
    Resolution::NotFound("unknown link id".to_string())
}

#[async_trait]
impl NodeApi for MockNodeApi {
    async fn chain_info(&self, node_url: &str) -> Result<ChainInfo, NodeApiError> {
        let mut inner = self.inner.lock().unwrap();
        inner.chain_info_requests += 1;

        if inner.unreachable.contains(node_url) {
            return Err(NodeApiError::ConnectionFailed(node_url.to_string()));
        }

        Ok(inner.chain_info.get(node_url).copied().unwrap_or_default())
    }

    async fn resolve(
        &self,
        node_url: &str,
        correlation_id: &CorrelationId,
    ) -> Result<Resolution, NodeApiError> {
        let mut inner = self.inner.lock().unwrap();
        inner.resolve_requests += 1;

        if inner.unreachable.contains(node_url) {
            return Err(NodeApiError::ConnectionFailed(node_url.to_string()));
        }

        // Check for forced failure
        if let Some(error) = inner.fail_next_resolve.take() {
            return Err(NodeApiError::Http(error));
        }

        let key = (node_url.to_string(), *correlation_id);
        if let Some(resolution) = inner.overrides.get(&key) {
            return Ok(resolution.clone());
        }

        Ok(inner
            .resolutions
            .get(node_url)
            .cloned()
            .unwrap_or_else(not_found))
    }
}
