//! HTTP implementation of the node query API.

use super::{NodeApi, NodeApiError, Resolution};
use async_trait::async_trait;
use finality_types::{BlockId, ChainInfo, CorrelationId, LinkTrxResponse, TrxLocation};
use serde::Deserialize;
use std::time::Duration;

/// Subset of the node's block payload used to recover a block id.
#[derive(Debug, Deserialize)]
struct BlockResponse {
    id: BlockId,
}

/// Node API client speaking the cluster's JSON-over-HTTP interface.
#[derive(Debug, Clone)]
pub struct HttpNodeApi {
    http: reqwest::Client,
}

impl HttpNodeApi {
    /// Create a client whose requests time out after `timeout`.
    pub fn new(timeout: Duration) -> Result<Self, NodeApiError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { http })
    }

    /// URL of the chain info endpoint.
    pub fn chain_info_url(node_url: &str) -> String {
        format!("{}/v1/chain/get_info", node_url)
    }

    /// URL of the correlation-id lookup endpoint.
    pub fn link_url(node_url: &str) -> String {
        format!("{}/v1/evt_link/get_trx_id_for_link_id", node_url)
    }

    /// URL of the block lookup endpoint.
    pub fn block_url(node_url: &str) -> String {
        format!("{}/v1/chain/get_block", node_url)
    }

    async fn block_id(&self, node_url: &str, block_num: u64) -> Result<BlockId, NodeApiError> {
        let response = self
            .http
            .post(Self::block_url(node_url))
            .json(&serde_json::json!({ "block_num_or_id": block_num }))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(NodeApiError::Status { status, body });
        }

        let block: BlockResponse = response.json().await?;
        Ok(block.id)
    }
}

#[async_trait]
impl NodeApi for HttpNodeApi {
    async fn chain_info(&self, node_url: &str) -> Result<ChainInfo, NodeApiError> {
        let response = self.http.get(Self::chain_info_url(node_url)).send().await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(NodeApiError::Status { status, body });
        }

        Ok(response.json().await?)
    }

    async fn resolve(
        &self,
        node_url: &str,
        correlation_id: &CorrelationId,
    ) -> Result<Resolution, NodeApiError> {
        let response = self
            .http
            .post(Self::link_url(node_url))
            .json(&serde_json::json!({ "link_id": correlation_id.to_hex() }))
            .send()
            .await?;

        // The node answered, but not with a location: it does not know the
        // transaction (yet, or any more).
        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            return Ok(Resolution::NotFound(body));
        }

        let link: LinkTrxResponse = response.json().await?;
        let block_id = match link.block_id {
            Some(id) => id,
            None => self.block_id(node_url, link.block_num).await?,
        };

        Ok(Resolution::Located(TrxLocation {
            block_num: link.block_num,
            block_id,
            trx_id: link.trx_id,
        }))
    }
}
