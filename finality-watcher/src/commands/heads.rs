//! Heads command - check that node heads are close together.

use anyhow::{bail, Context, Result};
use finality_core::NodeRegistry;
use finality_watcher::{measure, HttpNodeApi};
use std::time::Duration;

/// Run the heads command.
pub async fn run(nodes: &[String], max_spread: u64, timeout: Duration) -> Result<()> {
    let registry = NodeRegistry::new(nodes).context("Invalid node list")?;
    let api = HttpNodeApi::new(timeout).context("Failed to build node API client")?;
    let spread = measure(&api, &registry).await?;

    for (url, head) in &spread.heads {
        println!("{:>10}  {}", head, url);
    }
    println!("spread: {}", spread.spread);

    if !spread.is_within(max_spread) {
        bail!(
            "head spread {} is not below {}",
            spread.spread,
            max_spread
        );
    }
    Ok(())
}
