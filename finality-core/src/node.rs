//! Node registry.
//!
//! Holds the monitored nodes in configuration order together with each
//! node's most recently refreshed irreversibility frontier.

use finality_types::ChainInfo;

use crate::CoreError;

/// Position of a node in the configured node list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeIndex(usize);

impl NodeIndex {
    /// Index of the node at `position` in configuration order.
    pub fn new(position: usize) -> Self {
        Self(position)
    }

    /// The zero-based position.
    pub fn get(&self) -> usize {
        self.0
    }
}

/// A monitored node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    url: String,
    irreversible_block_num: u64,
    head_block_num: u64,
    refreshed: bool,
}

impl Node {
    fn new(url: String) -> Self {
        Self {
            url,
            irreversible_block_num: 0,
            head_block_num: 0,
            refreshed: false,
        }
    }

    /// Base URL of the node's HTTP API.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Cached irreversible block number (0 until the first refresh).
    pub fn irreversible_block_num(&self) -> u64 {
        self.irreversible_block_num
    }

    /// Cached head block number (0 until the first refresh).
    pub fn head_block_num(&self) -> u64 {
        self.head_block_num
    }

    /// Whether chain info was ever received for this node.
    pub fn is_refreshed(&self) -> bool {
        self.refreshed
    }
}

/// The set of monitored nodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeRegistry {
    nodes: Vec<Node>,
}

impl NodeRegistry {
    /// Build a registry from node base URLs.
    ///
    /// Trailing slashes are stripped so that paths can be appended directly.
    ///
    /// # Errors
    ///
    /// Fails on an empty list, a blank URL, or a URL listed twice.
    pub fn new<I, S>(urls: I) -> Result<Self, CoreError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut nodes: Vec<Node> = Vec::new();
        for url in urls {
            let url = url.as_ref().trim().trim_end_matches('/');
            if url.is_empty() {
                return Err(CoreError::EmptyNodeUrl);
            }
            if nodes.iter().any(|n| n.url == url) {
                return Err(CoreError::DuplicateNode(url.to_string()));
            }
            nodes.push(Node::new(url.to_string()));
        }

        if nodes.is_empty() {
            return Err(CoreError::EmptyNodeList);
        }

        Ok(Self { nodes })
    }

    /// Number of nodes (never zero).
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always false; kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Iterate nodes in configuration order.
    pub fn iter(&self) -> impl Iterator<Item = (NodeIndex, &Node)> {
        self.nodes.iter().enumerate().map(|(i, n)| (NodeIndex(i), n))
    }

    /// All node indices in configuration order.
    pub fn indices(&self) -> impl Iterator<Item = NodeIndex> {
        (0..self.nodes.len()).map(NodeIndex)
    }

    /// Look up a node.
    pub fn get(&self, index: NodeIndex) -> Option<&Node> {
        self.nodes.get(index.0)
    }

    /// Node base URLs in configuration order.
    pub fn urls(&self) -> Vec<String> {
        self.nodes.iter().map(|n| n.url.clone()).collect()
    }

    /// Cached irreversible frontier of a node, 0 if unknown.
    pub fn frontier(&self, index: NodeIndex) -> u64 {
        self.get(index).map_or(0, |n| n.irreversible_block_num)
    }

    /// Overwrite a node's cached chain info.
    ///
    /// Returns false if the index is not part of this registry.
    pub fn apply_chain_info(&mut self, index: NodeIndex, info: &ChainInfo) -> bool {
        match self.nodes.get_mut(index.0) {
            Some(node) => {
                node.irreversible_block_num = info.last_irreversible_block_num;
                node.head_block_num = info.head_block_num;
                node.refreshed = true;
                true
            }
            None => false,
        }
    }

    /// Difference between the highest and lowest head block across nodes.
    pub fn head_spread(&self) -> u64 {
        let heads = self.nodes.iter().map(|n| n.head_block_num);
        let max = heads.clone().max().unwrap_or(0);
        let min = heads.min().unwrap_or(0);
        max - min
    }
}
