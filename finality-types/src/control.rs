//! Control channel wire format.
//!
//! One JSON object per request and one per reply. Requests are tagged by
//! their `func` field.

use serde::{Deserialize, Serialize};

use crate::{Diagnosis, TypesError, Verdict};

/// Error message for requests whose `func` is missing or unrecognized.
pub const NO_SUCH_FUNCTION: &str = "No Such Function";

/// All control channel requests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "func", rename_all = "lowercase")]
pub enum Command {
    /// Configure the monitored nodes
    Watches(WatchesRequest),
    /// Start a run and wait for its verdict
    Run(RunRequest),
    /// Cancel the active run
    Stop,
}

impl Command {
    /// Parse a command from its JSON text.
    pub fn from_json(text: &str) -> Result<Self, TypesError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Encode the command as JSON text.
    pub fn to_json(&self) -> Result<String, TypesError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Short name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Command::Watches(_) => "watches",
            Command::Run(_) => "run",
            Command::Stop => "stop",
        }
    }
}

/// Payload of a `watches` request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchesRequest {
    /// Base URLs of every node to monitor
    pub nodes: Vec<String>,
}

/// Payload of a `run` request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRequest {
    /// Seconds between transaction submissions
    pub freq: f64,
    /// Number of transactions to submit
    pub amount: u32,
    /// Submission endpoint (falls back to the configured default)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Opaque account source, forwarded to the submitter
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub users: Option<String>,
    /// Opaque debug switch, forwarded to the submitter
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debug: Option<serde_json::Value>,
}

/// Kind of a control channel reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplyKind {
    /// Command accepted
    Ack,
    /// Terminal verdict of a run
    Verdict,
    /// Command rejected
    Error,
}

/// A control channel reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reply {
    /// What kind of reply this is
    pub kind: ReplyKind,
    /// Human-readable message; for verdicts, the verdict string
    pub message: String,
    /// State of the failing watch, for failure verdicts
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diagnosis: Option<Diagnosis>,
}

impl Reply {
    /// Acknowledge a command.
    pub fn ack(message: impl Into<String>) -> Self {
        Self {
            kind: ReplyKind::Ack,
            message: message.into(),
            diagnosis: None,
        }
    }

    /// Report a run verdict.
    pub fn verdict(verdict: Verdict, diagnosis: Option<Diagnosis>) -> Self {
        Self {
            kind: ReplyKind::Verdict,
            message: verdict.as_message().to_string(),
            diagnosis,
        }
    }

    /// Reject a command.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: ReplyKind::Error,
            message: message.into(),
            diagnosis: None,
        }
    }

    /// Returns true for error replies.
    pub fn is_error(&self) -> bool {
        self.kind == ReplyKind::Error
    }
}
