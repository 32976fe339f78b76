//! # finality-watcher
//!
//! Transaction finality watcher for chaos-testing blockchain clusters.
//!
//! While a fault-injection tool degrades the network between nodes, the
//! watcher submits tagged transactions through an external submission
//! service and polls every node until each transaction is irreversibly
//! final everywhere, or until it detects that a transaction was never
//! packed, was rolled back, or landed in different blocks on different
//! nodes.
//!
//! ## Architecture
//!
//! ```text
//!  control client ──POST /──► http ──► Controller
//!                                          │ spawn_run
//!                                          ▼
//!                             scheduler (one task per run)
//!                               │ owns finality_core::Run
//!               ┌───────────────┼────────────────┐
//!               ▼               ▼                ▼
//!           Submitter     NodeApi::chain_info  NodeApi::resolve
//! ```
//!
//! ## Control commands
//!
//! - `watches`: configure the monitored nodes
//! - `run`: submit transactions and block until a verdict
//! - `stop`: cancel the active run (the blocked `run` gets `410 Gone`)

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod client;
pub mod config;
pub mod controller;
pub mod error;
pub mod heads;
pub mod http;
pub mod node_api;
pub mod scheduler;
pub mod server;
pub mod submit;

pub use client::{ClientError, ControlClient};
pub use config::{Config, ConfigError};
pub use controller::{handle_command, CommandOutcome, ControlError, Controller};
pub use error::WatcherError;
pub use heads::{measure, HeadSpread, HeadsError};
pub use http::build_router;
pub use node_api::{HttpNodeApi, MockNodeApi, NodeApi, NodeApiError, Resolution};
pub use scheduler::{spawn_run, RunHandle, RunParams, Schedule};
pub use submit::{HttpSubmitter, MockSubmitter, SubmitError, SubmitRequest, Submitter};
