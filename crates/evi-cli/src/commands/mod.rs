//! CLI subcommand implementations.

pub mod export;
pub mod query;
pub mod stats;
