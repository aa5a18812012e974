//! Configuration command implementation.

use std::io::Write;

use graywall::FilterConfig;
use tracing::debug;

use crate::cli::ConfigCommands;
use crate::error::CliError;
use crate::output::{ConfigCheck, OutputFormat};

/// Config command executor.
#[derive(Debug, Default)]
pub struct ConfigCommand;

impl ConfigCommand {
    /// Create a new config command.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Execute a config subcommand.
    ///
    /// # Errors
    ///
    /// Returns an error if a checked file cannot be loaded or fails
    /// validation, or if output fails.
    pub fn execute<W: Write>(
        &self,
        writer: &mut W,
        format: &OutputFormat,
        command: &ConfigCommands,
    ) -> Result<(), CliError> {
        match command {
            ConfigCommands::Default => format.write(writer, &FilterConfig::default()),
            ConfigCommands::Example => format.write(writer, &FilterConfig::example()),
            ConfigCommands::Check { path } => {
                let config = FilterConfig::from_file(path)?;
                debug!(path = %path.display(), "Configuration is valid");
                let check = ConfigCheck {
                    path: path.display().to_string(),
                    config,
                };
                format.write(writer, &check)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Format;
    use std::io::Write as _;
    use std::path::PathBuf;
    use tempfile::NamedTempFile;
    use test_case::test_case;

    fn run(command: &ConfigCommands, format: Format) -> Result<String, CliError> {
        let mut out = Vec::new();
        ConfigCommand::new().execute(&mut out, &OutputFormat::new(format), command)?;
        Ok(String::from_utf8(out).expect("utf-8 output"))
    }

    #[test_case(ConfigCommands::Default, FilterConfig::default() ; "default")]
    #[test_case(ConfigCommands::Example, FilterConfig::example() ; "example")]
    fn printed_toml_loads_back(command: ConfigCommands, expected: FilterConfig) {
        let output = run(&command, Format::Table).expect("config prints");
        assert_eq!(FilterConfig::from_toml(&output).expect("printed TOML loads"), expected);
    }

    #[test]
    fn example_json_lists_static_sources() {
        let output = run(&ConfigCommands::Example, Format::Json).expect("config prints");
        assert!(output.contains("\"192.168.1.103\""));
        assert!(output.contains("\"192.168.1.203\""));
    }

    #[test]
    fn check_accepts_valid_file() {
        let mut file = NamedTempFile::with_suffix(".toml").expect("create temp file");
        writeln!(file, "threshold_duration = 5000000\nfast_packet_limit = 2")
            .expect("write temp file");

        let command = ConfigCommands::Check {
            path: file.path().to_path_buf(),
        };
        let output = run(&command, Format::Table).expect("valid file passes");
        assert!(output.contains(": OK"));
        assert!(output.contains("Threshold:        5000000 ns"));
    }

    #[test]
    fn check_rejects_invalid_file() {
        let mut file = NamedTempFile::with_suffix(".json").expect("create temp file");
        write!(file, r#"{{"tracking_capacity": 0}}"#).expect("write temp file");

        let command = ConfigCommands::Check {
            path: file.path().to_path_buf(),
        };
        let err = run(&command, Format::Json).expect_err("zero capacity rejected");
        assert!(err.to_string().contains("tracking_capacity"));
    }

    #[test]
    fn check_missing_file_fails() {
        let command = ConfigCommands::Check {
            path: PathBuf::from("/nonexistent/graywall.toml"),
        };
        assert!(matches!(
            run(&command, Format::Table),
            Err(CliError::Filter(_))
        ));
    }
}
