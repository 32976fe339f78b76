//! Node query API abstraction.
//!
//! The watcher asks each node two questions: how far its irreversible
//! frontier has advanced, and where (if anywhere) it packed a transaction
//! carrying a given correlation id.
//!
//! # Design
//!
//! A node that *answers* "no such transaction" is a semantic negative and
//! comes back as [`Resolution::NotFound`]. A node that cannot be reached, or
//! whose answer cannot be decoded, comes back as [`NodeApiError`]; the
//! scheduler treats those as transient and leaves the previous status alone.

mod http;
mod mock;

pub use http::HttpNodeApi;
pub use mock::MockNodeApi;

use async_trait::async_trait;
use finality_core::Observation;
use finality_types::{ChainInfo, CorrelationId, TrxLocation};
use thiserror::Error;

/// Node API errors (all transient from the watcher's point of view).
#[derive(Debug, Error)]
pub enum NodeApiError {
    /// Connection to the node failed.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// The request timed out.
    #[error("request timed out")]
    Timeout,

    /// The node answered with an unexpected HTTP status.
    #[error("unexpected status {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body.
        body: String,
    },

    /// The response body could not be decoded.
    #[error("decode failed: {0}")]
    Decode(String),

    /// Any other HTTP failure.
    #[error("http error: {0}")]
    Http(String),
}

impl From<reqwest::Error> for NodeApiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_connect() {
            NodeApiError::ConnectionFailed(e.to_string())
        } else if e.is_timeout() {
            NodeApiError::Timeout
        } else if e.is_decode() {
            NodeApiError::Decode(e.to_string())
        } else {
            NodeApiError::Http(e.to_string())
        }
    }
}

/// A node's answer to "resolve transaction by correlation id".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The node packed the transaction here.
    Located(TrxLocation),
    /// The node has no such transaction.
    NotFound(String),
}

impl Resolution {
    /// Convert into the core's observation type.
    pub fn into_observation(self) -> Observation {
        match self {
            Resolution::Located(location) => Observation::Located {
                block_num: location.block_num,
                block_id: location.block_id,
            },
            Resolution::NotFound(_) => Observation::Rejected,
        }
    }
}

/// Query interface of a cluster node.
///
/// Implementations handle the underlying mechanism (HTTP, mock, etc).
#[async_trait]
pub trait NodeApi: Send + Sync {
    /// Fetch the node's chain info.
    async fn chain_info(&self, node_url: &str) -> Result<ChainInfo, NodeApiError>;

    /// Resolve a transaction by its correlation id.
    async fn resolve(
        &self,
        node_url: &str,
        correlation_id: &CorrelationId,
    ) -> Result<Resolution, NodeApiError>;
}
