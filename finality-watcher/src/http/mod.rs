//! HTTP control channel.
//!
//! `POST /` takes one JSON command and answers with one JSON reply.
//! `GET /health` reports liveness.

pub mod health;

use crate::controller::{handle_command, CommandOutcome, Controller};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use finality_types::{Command, Reply, NO_SUCH_FUNCTION};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error};

pub use health::HealthStatus;

/// Build the HTTP router with all endpoints.
pub fn build_router(controller: Arc<Mutex<Controller>>) -> Router {
    Router::new()
        .route("/", post(command_handler))
        .route("/health", get(health::health_handler))
        .layer(Extension(controller))
}

/// Control command endpoint.
///
/// The body is taken as text so that malformed JSON and unknown functions
/// get the same error reply.
async fn command_handler(
    Extension(controller): Extension<Arc<Mutex<Controller>>>,
    body: String,
) -> Response {
    let command = match Command::from_json(&body) {
        Ok(command) => command,
        Err(e) => {
            error!(error = %e, "Unparseable control command");
            return (StatusCode::BAD_REQUEST, Json(Reply::error(NO_SUCH_FUNCTION))).into_response();
        }
    };
    debug!(command = command.name(), "Control command received");

    match handle_command(&controller, command).await {
        CommandOutcome::Reply(reply) => {
            let status = if reply.is_error() {
                StatusCode::BAD_REQUEST
            } else {
                StatusCode::OK
            };
            (status, Json(reply)).into_response()
        }
        CommandOutcome::Cancelled => StatusCode::GONE.into_response(),
    }
}
