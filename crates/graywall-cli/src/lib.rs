//! # graywall-cli
//!
//! Command-line tooling for the graywall reputation filter.
//!
//! Provides commands for:
//! - Printing default and example configurations
//! - Validating configuration files
//! - Replaying packet traces through the filter offline
//!
//! Replay drives the filter from recorded timestamps rather than the wall
//! clock, so the same trace and configuration always produce the same
//! verdicts.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cli;
pub mod commands;
pub mod error;
pub mod output;

pub use cli::{Cli, Commands, ConfigCommands, Format, ReplayArgs};
pub use error::CliError;
pub use output::OutputFormat;
