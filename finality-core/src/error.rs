//! Error types for finality-core.

use thiserror::Error;

/// Errors raised while configuring a run.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoreError {
    /// No nodes were given.
    #[error("node list is empty")]
    EmptyNodeList,

    /// A node URL was blank.
    #[error("node url is empty")]
    EmptyNodeUrl,

    /// The same node was listed twice.
    #[error("duplicate node: {0}")]
    DuplicateNode(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = CoreError::DuplicateNode("http://127.0.0.1:8888".into());
        assert_eq!(err.to_string(), "duplicate node: http://127.0.0.1:8888");
    }
}
