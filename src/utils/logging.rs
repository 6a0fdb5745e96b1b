//! Logging initialization and output formatting

use tracing_subscriber::EnvFilter;

use crate::error::{VidopsError, VidopsResult};

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable text format
    Pretty,
    /// JSON format for structured logging
    Json,
}

impl LogFormat {
    pub fn from_json_flag(json: bool) -> Self {
        if json {
            LogFormat::Json
        } else {
            LogFormat::Pretty
        }
    }
}

/// Build the filter; `RUST_LOG` takes precedence over the configured level
pub fn build_filter(level: &str) -> VidopsResult<EnvFilter> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(level).map_err(|e| VidopsError::LoggingError {
            message: format!("Invalid log level '{}': {}", level, e),
        }),
    }
}

/// Install the global subscriber. Logs go to stderr so command output stays parseable.
pub fn init_logging(level: &str, format: LogFormat) -> VidopsResult<()> {
    let filter = build_filter(level)?;
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    let result = match format {
        LogFormat::Pretty => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };

    result.map_err(|e| VidopsError::LoggingError {
        message: e.to_string(),
    })
}
