//! Control channel server wiring.

use crate::config::Config;
use crate::controller::Controller;
use crate::error::WatcherError;
use crate::http::build_router;
use crate::node_api::HttpNodeApi;
use crate::scheduler::Schedule;
use crate::submit::HttpSubmitter;
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tracing::info;

/// Build a controller that talks to real nodes over HTTP.
pub fn build_controller(config: &Config) -> Result<Controller, WatcherError> {
    let timeout = config.http.request_timeout();
    let api = HttpNodeApi::new(timeout)?;
    let submitter = HttpSubmitter::new(timeout)?;
    Ok(Controller::new(
        Arc::new(api),
        Arc::new(submitter),
        Schedule::from(&config.schedule),
        config.submit.default_url.clone(),
    ))
}

/// Serve the control channel on `listener` until `shutdown` resolves.
pub async fn serve<F>(
    config: &Config,
    listener: TcpListener,
    shutdown: F,
) -> Result<(), WatcherError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let controller = build_controller(config)?;
    let router = build_router(Arc::new(Mutex::new(controller)));

    info!(
        address = %listener.local_addr()?,
        soft_deadline_secs = config.schedule.soft_deadline_secs,
        hard_deadline_secs = config.schedule.hard_deadline_secs,
        "Control channel listening"
    );

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await?;

    info!("Control channel stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ControlClient;
    use tokio::sync::oneshot;

    #[tokio::test]
    async fn serves_until_shutdown() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (stop_tx, stop_rx) = oneshot::channel::<()>();

        let server = tokio::spawn(async move {
            let config = Config::default();
            serve(&config, listener, async move {
                let _ = stop_rx.await;
            })
            .await
        });

        let client = ControlClient::new(&format!("http://{}", addr));
        let reply = client.watches(vec!["http://127.0.0.1:8888".into()]).await.unwrap();
        assert_eq!(reply.message, "watches config succeed");
        drop(client);

        stop_tx.send(()).unwrap();
        server.await.unwrap().unwrap();
    }
}
