//! CLI command implementations.

pub mod common;
pub mod config;
pub mod metrics;
pub mod probe;
pub mod track;
