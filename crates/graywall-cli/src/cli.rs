//! Command-line argument parsing with clap.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// Graywall - inline source reputation filter tooling.
#[derive(Parser, Debug, Clone)]
#[command(name = "graywall")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Output format.
    #[arg(short, long, value_enum, default_value_t = Format::Table, global = true)]
    pub format: Format,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Format {
    /// Human-readable output (TOML for configurations).
    #[default]
    Table,
    /// JSON output for scripting.
    Json,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Configuration helpers.
    Config {
        /// Config subcommand to execute.
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Feed a packet trace through the filter and report every verdict.
    Replay(ReplayArgs),
}

/// Config subcommands.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum ConfigCommands {
    /// Print the default configuration.
    Default,

    /// Print an example configuration using every option.
    Example,

    /// Load and validate a configuration file (.toml or .json).
    Check {
        /// Path to the configuration file.
        path: PathBuf,
    },
}

/// Arguments for the replay command.
#[derive(Parser, Debug, Clone)]
pub struct ReplayArgs {
    /// JSON-lines trace file, one packet per line.
    pub trace: PathBuf,

    /// Filter configuration file; defaults are used when omitted.
    #[arg(short, long, env = "GRAYWALL_CONFIG")]
    pub config: Option<PathBuf>,

    /// Dump the tracking and enforcement tables after the replay.
    #[arg(long)]
    pub show_tables: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_config_default() {
        let cli = Cli::parse_from(["graywall", "config", "default"]);
        assert!(matches!(
            cli.command,
            Commands::Config {
                command: ConfigCommands::Default
            }
        ));
        assert_eq!(cli.format, Format::Table);
    }

    #[test]
    fn parses_config_check_path() {
        let cli = Cli::parse_from(["graywall", "config", "check", "/etc/graywall.toml"]);
        match cli.command {
            Commands::Config {
                command: ConfigCommands::Check { path },
            } => assert_eq!(path, PathBuf::from("/etc/graywall.toml")),
            other => panic!("expected config check, got {other:?}"),
        }
    }

    #[test]
    fn parses_replay_flags() {
        let cli = Cli::parse_from([
            "graywall",
            "replay",
            "trace.jsonl",
            "--config",
            "filter.toml",
            "--show-tables",
        ]);
        match cli.command {
            Commands::Replay(args) => {
                assert_eq!(args.trace, PathBuf::from("trace.jsonl"));
                assert_eq!(args.config, Some(PathBuf::from("filter.toml")));
                assert!(args.show_tables);
            }
            other => panic!("expected replay, got {other:?}"),
        }
    }

    #[test]
    fn format_flag_is_global() {
        let cli = Cli::parse_from(["graywall", "config", "example", "--format", "json"]);
        assert_eq!(cli.format, Format::Json);
    }

    #[test]
    fn replay_requires_trace() {
        assert!(Cli::try_parse_from(["graywall", "replay"]).is_err());
    }
}
