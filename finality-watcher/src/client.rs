//! Client for a running watcher's control channel.

use finality_types::{Command, Reply, RunRequest, WatchesRequest};
use reqwest::StatusCode;
use thiserror::Error;

/// Control client errors.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The watcher could not be reached.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// The run was stopped before it produced a verdict.
    #[error("run was cancelled")]
    RunCancelled,

    /// The watcher answered with something that is not a reply.
    #[error("unexpected response ({status}): {body}")]
    UnexpectedResponse {
        /// HTTP status code.
        status: u16,
        /// Response body.
        body: String,
    },

    /// Any other HTTP failure.
    #[error("http error: {0}")]
    Http(String),
}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_connect() {
            ClientError::ConnectionFailed(e.to_string())
        } else {
            ClientError::Http(e.to_string())
        }
    }
}

/// Sends control commands to a watcher.
///
/// No request timeout is set: `run` blocks until the verdict.
#[derive(Debug, Clone)]
pub struct ControlClient {
    base_url: String,
    http: reqwest::Client,
}

impl ControlClient {
    /// Create a client for the watcher at `base_url`.
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
        }
    }

    /// Configure the monitored nodes.
    pub async fn watches(&self, nodes: Vec<String>) -> Result<Reply, ClientError> {
        self.send(&Command::Watches(WatchesRequest { nodes })).await
    }

    /// Start a run and wait for its verdict.
    pub async fn run(&self, request: RunRequest) -> Result<Reply, ClientError> {
        self.send(&Command::Run(request)).await
    }

    /// Cancel the active run.
    pub async fn stop(&self) -> Result<Reply, ClientError> {
        self.send(&Command::Stop).await
    }

    /// Send one command and parse the reply.
    ///
    /// Error replies (status 400) come back as `Ok`; check
    /// [`Reply::is_error`].
    pub async fn send(&self, command: &Command) -> Result<Reply, ClientError> {
        let response = self
            .http
            .post(format!("{}/", self.base_url))
            .json(command)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::GONE {
            return Err(ClientError::RunCancelled);
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|_| ClientError::UnexpectedResponse {
            status: status.as_u16(),
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::Controller;
    use crate::http::build_router;
    use crate::node_api::MockNodeApi;
    use crate::scheduler::Schedule;
    use crate::submit::MockSubmitter;
    use finality_types::ReplyKind;
    use std::sync::Arc;
    use tokio::sync::Mutex;

    async fn start_watcher(api: MockNodeApi) -> String {
        let controller = Controller::new(
            Arc::new(api),
            Arc::new(MockSubmitter::new()),
            Schedule::default(),
            "http://submit",
        );
        let router = build_router(Arc::new(Mutex::new(controller)));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[test]
    fn base_url_is_normalized() {
        let client = ControlClient::new("http://127.0.0.1:6666/");
        assert_eq!(client.base_url, "http://127.0.0.1:6666");
    }

    #[tokio::test]
    async fn watches_then_stop() {
        let client = ControlClient::new(&start_watcher(MockNodeApi::new()).await);

        let reply = client.watches(vec!["http://a".into()]).await.unwrap();
        assert_eq!(reply.kind, ReplyKind::Ack);

        let reply = client.stop().await.unwrap();
        assert_eq!(reply.message, "stopped");
    }

    #[tokio::test]
    async fn error_reply_is_returned() {
        let client = ControlClient::new(&start_watcher(MockNodeApi::new()).await);
        let reply = client
            .run(RunRequest {
                freq: 1.0,
                amount: 1,
                url: None,
                users: None,
                debug: None,
            })
            .await
            .unwrap();
        assert!(reply.is_error());
    }

    #[tokio::test]
    async fn unreachable_watcher() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = ControlClient::new(&format!("http://{}", addr));
        assert!(matches!(
            client.stop().await,
            Err(ClientError::ConnectionFailed(_))
        ));
    }
}
