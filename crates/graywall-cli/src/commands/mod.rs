//! CLI command implementations.
//!
//! - [`config`] - Print and validate filter configurations
//! - [`replay`] - Run a packet trace through the filter

pub mod config;
pub mod replay;

pub use config::ConfigCommand;
pub use replay::ReplayCommand;
