//! Head-spread check: are the nodes close enough to each other to start a run?

use finality_core::NodeRegistry;
use thiserror::Error;
use tracing::debug;

use crate::node_api::{NodeApi, NodeApiError};

/// Head-spread check errors.
#[derive(Debug, Error)]
pub enum HeadsError {
    /// A node could not report its head.
    #[error("node {url} did not report its head: {source}")]
    Unavailable {
        /// Node base URL.
        url: String,
        /// Underlying error.
        source: NodeApiError,
    },
}

/// Head block of every node, and how far apart they are.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadSpread {
    /// `(url, head_block_num)` in configuration order.
    pub heads: Vec<(String, u64)>,
    /// Highest head minus lowest head.
    pub spread: u64,
}

impl HeadSpread {
    /// True if the spread is strictly below `max_spread`.
    pub fn is_within(&self, max_spread: u64) -> bool {
        self.spread < max_spread
    }
}

/// Query every node's head block.
pub async fn measure(api: &dyn NodeApi, nodes: &NodeRegistry) -> Result<HeadSpread, HeadsError> {
    let mut nodes = nodes.clone();
    let targets: Vec<_> = nodes.indices().zip(nodes.urls()).collect();
    for (index, url) in targets {
        let info = api
            .chain_info(&url)
            .await
            .map_err(|source| HeadsError::Unavailable { url: url.clone(), source })?;
        debug!(node = %url, head = info.head_block_num, "Head fetched");
        nodes.apply_chain_info(index, &info);
    }

    Ok(HeadSpread {
        heads: nodes
            .iter()
            .map(|(_, n)| (n.url().to_string(), n.head_block_num()))
            .collect(),
        spread: nodes.head_spread(),
    })
}
