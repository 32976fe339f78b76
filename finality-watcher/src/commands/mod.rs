//! CLI command implementations.

pub mod control;
pub mod heads;
pub mod serve;
