//! Client commands against a running watcher.

use anyhow::{bail, Context, Result};
use finality_types::{Reply, RunRequest, Verdict};
use finality_watcher::ControlClient;

/// Configure the watcher's nodes.
pub async fn watches(server: &str, nodes: Vec<String>) -> Result<()> {
    let reply = ControlClient::new(server)
        .watches(nodes)
        .await
        .context("watches request failed")?;
    print_reply(&reply)
}

/// Start a run and wait for the verdict. Fails unless the verdict is success.
pub async fn run(server: &str, request: RunRequest) -> Result<()> {
    let reply = ControlClient::new(server)
        .run(request)
        .await
        .context("run request failed")?;
    print_reply(&reply)?;

    if reply.message != Verdict::Success.as_message() {
        bail!("run failed: {}", reply.message);
    }
    Ok(())
}

/// Cancel the active run.
pub async fn stop(server: &str) -> Result<()> {
    let reply = ControlClient::new(server)
        .stop()
        .await
        .context("stop request failed")?;
    print_reply(&reply)
}

fn print_reply(reply: &Reply) -> Result<()> {
    println!("{}", reply.message);
    if let Some(diagnosis) = &reply.diagnosis {
        println!("{}", serde_json::to_string_pretty(diagnosis)?);
    }
    if reply.is_error() {
        bail!("watcher rejected the command: {}", reply.message);
    }
    Ok(())
}
