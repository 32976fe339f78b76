//! # finality-core
//!
//! Pure logic for the transaction finality watcher (no I/O, instant tests).
//!
//! This crate holds the registries and the consistency rules that decide
//! whether a watched transaction reached irreversible finality on every
//! node, or was never packed, rolled back, or forked.
//!
//! ## Design Philosophy
//!
//! Nothing here performs I/O or reads a clock. Every operation that depends
//! on time takes `now` explicitly, so tests can simulate minutes of cluster
//! behaviour instantly and deterministically.
//!
//! The actual I/O (polling nodes, submitting transactions) is performed by
//! `finality-watcher`, which feeds responses into a [`Run`] and acts on the
//! verdicts it produces.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod engine;
pub mod error;
pub mod node;
pub mod registry;
pub mod run;
pub mod watch;

pub use engine::{detect_fork, Assessment, ConsistencyEngine, Deadlines};
pub use error::CoreError;
pub use node::{Node, NodeIndex, NodeRegistry};
pub use registry::WatchRegistry;
pub use run::{Run, RunProgress, RunReport};
pub use watch::{Observation, Watch};
