//! # finality-watcher
//!
//! Watches transactions for irreversible finality across a cluster under
//! fault injection.
//!
//! ## Commands
//!
//! - `serve`: Run the control channel
//! - `watches`: Configure the nodes of a running watcher
//! - `run`: Start a run and wait for its verdict
//! - `stop`: Cancel the active run
//! - `heads`: Check that node heads are close together
//!
//! ## Example
//!
//! ```bash
//! # Start the watcher
//! finality-watcher serve --config watcher.toml
//!
//! # Make sure the cluster is in sync before injecting faults
//! finality-watcher heads --nodes http://10.0.0.1:8888 http://10.0.0.2:8888 --max-spread 5
//!
//! # Configure nodes and run 10 transactions, one per second
//! finality-watcher watches --nodes http://10.0.0.1:8888 http://10.0.0.2:8888
//! finality-watcher run --freq 1 --amount 10
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use finality_types::RunRequest;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

mod commands;

use commands::{control, heads, serve};

/// Transaction finality watcher for chaos-testing blockchain clusters.
#[derive(Parser, Debug)]
#[command(name = "finality-watcher")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Control channel of the watcher to talk to
    #[arg(long, global = true, default_value = "http://127.0.0.1:6666")]
    server: String,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the control channel
    Serve {
        /// Configuration file (defaults to ./watcher.toml if present)
        #[arg(long, short)]
        config: Option<PathBuf>,

        /// Override the configured bind address
        #[arg(long)]
        bind: Option<String>,
    },

    /// Configure the nodes of a running watcher
    Watches {
        /// Node base URLs
        #[arg(long, num_args = 1.., required = true)]
        nodes: Vec<String>,
    },

    /// Start a run and wait for its verdict
    Run {
        /// Seconds between submissions
        #[arg(long)]
        freq: f64,

        /// Number of transactions to submit
        #[arg(long)]
        amount: u32,

        /// Submission endpoint (watcher default if omitted)
        #[arg(long)]
        url: Option<String>,

        /// Account source forwarded to the submitter
        #[arg(long)]
        users: Option<String>,

        /// Debug switch forwarded to the submitter (JSON)
        #[arg(long)]
        debug: Option<String>,
    },

    /// Cancel the active run
    Stop,

    /// Check that node heads are close together
    Heads {
        /// Node base URLs
        #[arg(long, num_args = 1.., required = true)]
        nodes: Vec<String>,

        /// Fail unless max head minus min head is below this
        #[arg(long)]
        max_spread: u64,

        /// Per-request timeout in milliseconds
        #[arg(long, default_value = "5000")]
        timeout_ms: u64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Serve { config, bind } => {
            serve::run(config.as_deref(), bind).await?;
        }
        Commands::Watches { nodes } => {
            control::watches(&cli.server, nodes).await?;
        }
        Commands::Run {
            freq,
            amount,
            url,
            users,
            debug,
        } => {
            let debug = debug
                .map(|raw| parse_debug(&raw))
                .transpose()
                .context("Invalid --debug value")?;
            let request = RunRequest {
                freq,
                amount,
                url,
                users,
                debug,
            };
            control::run(&cli.server, request).await?;
        }
        Commands::Stop => {
            control::stop(&cli.server).await?;
        }
        Commands::Heads {
            nodes,
            max_spread,
            timeout_ms,
        } => {
            heads::run(&nodes, max_spread, Duration::from_millis(timeout_ms)).await?;
        }
    }

    Ok(())
}

/// Accept JSON, or fall back to a plain string.
fn parse_debug(raw: &str) -> Result<serde_json::Value> {
    if raw.trim().is_empty() {
        anyhow::bail!("empty value");
    }
    Ok(serde_json::from_str(raw).unwrap_or_else(|_| serde_json::Value::String(raw.to_string())))
}
