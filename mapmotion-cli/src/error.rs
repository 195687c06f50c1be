//! CLI error types.

use std::fmt;
use std::path::PathBuf;

use mapmotion::config::ConfigError;
use mapmotion::logging::LoggingError;
use mapmotion::remote::QueryError;
use mapmotion::MotionError;

/// Errors surfaced to the user by CLI commands.
#[derive(Debug)]
pub enum CliError {
    /// Configuration file could not be read or written.
    Config(String),

    /// Logging could not be initialized.
    Logging(LoggingError),

    /// A path file could not be read.
    ReadPath { path: PathBuf, source: std::io::Error },

    /// A path file did not contain a usable path.
    InvalidPath { path: PathBuf, message: String },

    /// The animation could not be started.
    Animation(MotionError),

    /// A remote query failed.
    Query(QueryError),

    /// Failed to create the Tokio runtime.
    RuntimeCreation(String),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Config(msg) => write!(f, "Configuration error: {}", msg),
            CliError::Logging(e) => write!(f, "Failed to initialize logging: {}", e),
            CliError::ReadPath { path, source } => {
                write!(f, "Failed to read {}: {}", path.display(), source)
            }
            CliError::InvalidPath { path, message } => {
                write!(f, "Invalid path file {}: {}", path.display(), message)
            }
            CliError::Animation(e) => write!(f, "Animation failed: {}", e),
            CliError::Query(e) => write!(f, "Feature query failed: {}", e),
            CliError::RuntimeCreation(msg) => {
                write!(f, "Failed to create Tokio runtime: {}", msg)
            }
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Logging(e) => Some(e),
            CliError::ReadPath { source, .. } => Some(source),
            CliError::Animation(e) => Some(e),
            CliError::Query(e) => Some(e),
            CliError::Config(_) | CliError::InvalidPath { .. } | CliError::RuntimeCreation(_) => {
                None
            }
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        CliError::Config(e.to_string())
    }
}

impl From<LoggingError> for CliError {
    fn from(e: LoggingError) -> Self {
        CliError::Logging(e)
    }
}

impl From<MotionError> for CliError {
    fn from(e: MotionError) -> Self {
        CliError::Animation(e)
    }
}

impl From<QueryError> for CliError {
    fn from(e: QueryError) -> Self {
        CliError::Query(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_config_error_display() {
        let err = CliError::Config("bad value".to_string());
        assert_eq!(err.to_string(), "Configuration error: bad value");
        assert!(err.source().is_none());
    }

    #[test]
    fn test_invalid_path_display() {
        let err = CliError::InvalidPath {
            path: PathBuf::from("route.json"),
            message: "path is empty".to_string(),
        };
        assert!(err.to_string().contains("route.json"));
        assert!(err.to_string().contains("path is empty"));
    }

    #[test]
    fn test_from_motion_error_keeps_source() {
        let err: CliError = MotionError::invalid("no map").into();
        assert!(matches!(err, CliError::Animation(_)));
        assert!(err.source().is_some());
    }

    #[test]
    fn test_from_query_error() {
        let err: CliError = QueryError::Status {
            status: 404,
            url: "http://example.com/wms".to_string(),
        }
        .into();
        assert!(err.to_string().contains("HTTP 404"));
    }
}
