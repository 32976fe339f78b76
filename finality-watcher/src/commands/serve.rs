//! Serve command - run the control channel.

use anyhow::{Context, Result};
use finality_watcher::{server, Config};
use std::path::Path;
use tracing::info;

/// Run the serve command until ctrl-c.
pub async fn run(config_path: Option<&Path>, bind: Option<String>) -> Result<()> {
    let mut config = Config::load(config_path).context("Failed to load configuration")?;
    if let Some(bind) = bind {
        config.server.bind_address = bind;
    }

    let listener = tokio::net::TcpListener::bind(&config.server.bind_address)
        .await
        .with_context(|| format!("Failed to bind {}", config.server.bind_address))?;

    server::serve(&config, listener, async {
        let _ = tokio::signal::ctrl_c().await;
        info!("Shutting down");
    })
    .await
    .context("Control channel failed")?;

    Ok(())
}
