//! Error types for finality-watcher.

/// Main error type for finality-watcher operations.
#[derive(Debug, thiserror::Error)]
pub enum WatcherError {
    /// Node query error.
    #[error("node api error: {0}")]
    NodeApi(#[from] crate::node_api::NodeApiError),

    /// Submission error.
    #[error("submission error: {0}")]
    Submit(#[from] crate::submit::SubmitError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
