//! Event index CLI library.
//!
//! This crate provides the `evi` command-line interface over `evi-core`.

mod cli;
pub mod commands;
mod config;
pub mod edit_log;

pub use cli::{Cli, Commands, InputArgs};
pub use config::Config;
