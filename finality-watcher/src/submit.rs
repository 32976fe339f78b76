//! Transaction submission.
//!
//! The watcher never builds or signs transactions. It hands a correlation
//! id to an external submission service, which embeds the id in a real
//! transaction and pushes it to the cluster.

use async_trait::async_trait;
use finality_types::CorrelationId;
use serde::Serialize;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;

/// Submission errors.
#[derive(Debug, Error)]
pub enum SubmitError {
    /// The submission service could not be reached.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// The submission service refused the request.
    #[error("submission rejected with status {status}: {body}")]
    Rejected {
        /// HTTP status code.
        status: u16,
        /// Response body.
        body: String,
    },

    /// Any other HTTP failure.
    #[error("http error: {0}")]
    Http(String),
}

impl From<reqwest::Error> for SubmitError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_connect() {
            SubmitError::ConnectionFailed(e.to_string())
        } else {
            SubmitError::Http(e.to_string())
        }
    }
}

/// One transaction to submit.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmitRequest {
    /// Id the transaction must carry.
    pub correlation_id: CorrelationId,
    /// Submission endpoint.
    pub url: String,
    /// Opaque account source.
    pub users: Option<String>,
    /// Opaque debug switch.
    pub debug: Option<serde_json::Value>,
}

#[derive(Serialize)]
struct SubmitBody<'a> {
    link_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    users: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    debug: Option<&'a serde_json::Value>,
}

impl SubmitRequest {
    fn body(&self) -> SubmitBody<'_> {
        SubmitBody {
            link_id: self.correlation_id.to_hex(),
            users: self.users.as_deref(),
            debug: self.debug.as_ref(),
        }
    }
}

/// Something that can get a transaction carrying a correlation id onto the
/// cluster.
#[async_trait]
pub trait Submitter: Send + Sync {
    /// Submit one transaction.
    async fn submit(&self, request: &SubmitRequest) -> Result<(), SubmitError>;
}

/// Submitter that POSTs to an HTTP submission service.
#[derive(Debug, Clone)]
pub struct HttpSubmitter {
    http: reqwest::Client,
}

impl HttpSubmitter {
    /// Create a submitter whose requests time out after `timeout`.
    pub fn new(timeout: Duration) -> Result<Self, SubmitError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { http })
    }
}

#[async_trait]
impl Submitter for HttpSubmitter {
    async fn submit(&self, request: &SubmitRequest) -> Result<(), SubmitError> {
        let response = self
            .http
            .post(&request.url)
            .json(&request.body())
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(SubmitError::Rejected { status, body });
        }

        Ok(())
    }
}

/// Submitter that records requests instead of sending them.
#[derive(Debug, Default)]
pub struct MockSubmitter {
    inner: Arc<Mutex<MockSubmitterInner>>,
}

#[derive(Debug, Default)]
struct MockSubmitterInner {
    submitted: Vec<SubmitRequest>,
    fail_all: Option<String>,
}

impl MockSubmitter {
    /// Create a new mock submitter.
    pub fn new() -> Self {
        Self::default()
    }

    /// All requests received so far.
    pub fn submitted(&self) -> Vec<SubmitRequest> {
        self.inner.lock().unwrap().submitted.clone()
    }

    /// Correlation ids received so far, in order.
    pub fn correlation_ids(&self) -> Vec<CorrelationId> {
        let inner = self.inner.lock().unwrap();
        inner.submitted.iter().map(|r| r.correlation_id).collect()
    }

    /// Make every submission fail (None restores success).
    pub fn fail_all(&self, error: Option<&str>) {
        let mut inner = self.inner.lock().unwrap();
        inner.fail_all = error.map(str::to_string);
    }
}

impl Clone for MockSubmitter {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

#[async_trait]
impl Submitter for MockSubmitter {
    async fn submit(&self, request: &SubmitRequest) -> Result<(), SubmitError> {
        let mut inner = self.inner.lock().unwrap();
        inner.submitted.push(request.clone());
        match &inner.fail_all {
            Some(error) => Err(SubmitError::Http(error.clone())),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::routing::post;
    use axum::{Extension, Json, Router};
    use serde_json::{json, Value};

    fn request(url: &str) -> SubmitRequest {
        SubmitRequest {
            correlation_id: CorrelationId::from([0xab; 16]),
            url: url.to_string(),
            users: Some("users.json".into()),
            debug: None,
        }
    }

    #[test]
    fn body_carries_hex_link_id() {
        let body = serde_json::to_value(request("http://x").body()).unwrap();
        assert_eq!(
            body,
            json!({"link_id": "ab".repeat(16), "users": "users.json"})
        );
    }

    #[tokio::test]
    async fn mock_records_requests() {
        let submitter = MockSubmitter::new();
        submitter.submit(&request("http://x")).await.unwrap();

        submitter.fail_all(Some("down"));
        assert!(submitter.submit(&request("http://x")).await.is_err());

        assert_eq!(submitter.submitted().len(), 2);
        assert_eq!(submitter.correlation_ids()[0].to_hex(), "ab".repeat(16));
    }

    #[tokio::test]
    async fn http_submitter_posts_json() {
        let received: Arc<Mutex<Vec<Value>>> = Arc::default();
        let router = Router::new()
            .route(
                "/",
                post(
                    |Extension(seen): Extension<Arc<Mutex<Vec<Value>>>>,
                     Json(body): Json<Value>| async move {
                        seen.lock().unwrap().push(body);
                        "ok"
                    },
                ),
            )
            .layer(Extension(Arc::clone(&received)));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        let submitter = HttpSubmitter::new(Duration::from_secs(2)).unwrap();
        submitter
            .submit(&request(&format!("http://{}/", addr)))
            .await
            .unwrap();

        let seen = received.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0]["link_id"], "ab".repeat(16));
    }
}
