//! # finality-types
//!
//! Wire types for the transaction finality watcher.
//!
//! This crate provides the foundational types used across all watcher crates:
//! - [`CorrelationId`] - Identifier embedded in a submitted transaction
//! - [`ChainInfo`], [`TrxLocation`] - Node query API payloads
//! - [`Command`], [`Reply`] - Control channel wire format
//! - [`StatusValue`] - What one node reported for one watch
//! - [`Verdict`], [`Diagnosis`] - Terminal run outcomes
//! - [`TypesError`] - Error types

#![warn(missing_docs)]
#![warn(clippy::all)]

mod control;
mod error;
mod ids;
mod node_api;
mod verdict;

pub use control::{Command, Reply, ReplyKind, RunRequest, WatchesRequest, NO_SUCH_FUNCTION};
pub use error::TypesError;
pub use ids::{CorrelationId, CORRELATION_ID_LEN};
pub use node_api::{BlockId, ChainInfo, LinkTrxResponse, TrxLocation};
pub use verdict::{Diagnosis, NodeReport, StatusValue, Verdict};
