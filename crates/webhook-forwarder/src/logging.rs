//! Logging initialization for the forwarder binary.
//!
//! Library code only emits `tracing` events; the binary calls
//! [`init_logging`] once at startup to decide where they go.

use crate::error::{ForwarderError, ForwarderResult};
use tracing_subscriber::EnvFilter;

/// Configuration for the logging system.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Default level or filter directives. `RUST_LOG` takes precedence when
    /// set.
    pub default_level: String,

    /// Emit one JSON object per line instead of the compact text format.
    pub json: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            default_level: "info".into(),
            json: false,
        }
    }
}

/// Install the global subscriber writing to stderr.
///
/// Returns `Ok(false)` when a subscriber was already installed and an error
/// when `default_level` is not a valid filter.
pub fn init_logging(config: &LogConfig) -> ForwarderResult<bool> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => parse_filter(&config.default_level)?,
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr);

    let installed = if config.json {
        builder.json().try_init().is_ok()
    } else {
        builder.compact().try_init().is_ok()
    };
    Ok(installed)
}

/// Parse a level or a full filter such as `webhook_forwarder=debug,info`.
pub fn parse_filter(directives: &str) -> ForwarderResult<EnvFilter> {
    EnvFilter::try_new(directives)
        .map_err(|e| ForwarderError::Config(format!("invalid log filter {directives:?}: {e}")))
}
