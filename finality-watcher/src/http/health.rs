//! Health check endpoint.

use crate::controller::Controller;
use axum::{Extension, Json};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Health status response.
#[derive(Debug, Clone, Serialize)]
pub struct HealthStatus {
    /// Overall status.
    pub status: String,
    /// Watcher version.
    pub version: String,
    /// Number of configured nodes.
    pub nodes: usize,
    /// Whether a run is in progress.
    pub running: bool,
    /// Uptime in seconds.
    pub uptime_seconds: u64,
}

/// Health check handler.
pub async fn health_handler(
    Extension(controller): Extension<Arc<Mutex<Controller>>>,
) -> Json<HealthStatus> {
    let controller = controller.lock().await;

    Json(HealthStatus {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        nodes: controller.node_count(),
        running: controller.is_running(),
        uptime_seconds: controller.uptime().as_secs(),
    })
}
