//! CLI error types.

use graywall::FilterError;
use thiserror::Error;

/// CLI-specific errors.
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration or trace could not be loaded.
    #[error(transparent)]
    Filter(#[from] FilterError),

    /// Output formatting error.
    #[error("format error: {0}")]
    Format(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_error_display_filter_is_transparent() {
        let err = CliError::from(FilterError::Config("bad threshold".into()));
        assert_eq!(err.to_string(), "Configuration error: bad threshold");
    }

    #[test]
    fn cli_error_display_format() {
        let err = CliError::Format("broken".into());
        assert_eq!(err.to_string(), "format error: broken");
    }

    #[test]
    fn cli_error_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "closed");
        let cli_err = CliError::from(io_err);
        assert!(matches!(cli_err, CliError::Io(_)));
    }
}
