//! crates/logging/src/tracing_bridge.rs
//! Process-level tracing subscriber installation.
//!
//! Per-transfer sinks emit through `tracing`; this module installs the
//! formatting subscriber that renders those events, filtered by the
//! directive from [`LogConfig`].
//!
//! ```rust,ignore
//! use logging::{LogConfig, LogLevel, init_tracing};
//!
//! init_tracing(&LogConfig::from_env(LogLevel::Info))?;
//! tracing::info!(target: "blobroute::route", "ready");
//! ```

use super::config::LogConfig;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};

/// Errors raised while installing the global subscriber.
#[derive(Debug)]
pub enum InitError {
    /// The filter directive could not be parsed.
    Filter(tracing_subscriber::filter::ParseError),
    /// A global subscriber was already installed.
    AlreadyInstalled(TryInitError),
}

impl std::fmt::Display for InitError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Filter(e) => write!(f, "invalid log filter: {e}"),
            Self::AlreadyInstalled(e) => write!(f, "tracing already initialised: {e}"),
        }
    }
}

impl std::error::Error for InitError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Filter(e) => Some(e),
            Self::AlreadyInstalled(e) => Some(e),
        }
    }
}

/// Builds the `EnvFilter` described by `config`.
pub fn build_filter(config: &LogConfig) -> Result<EnvFilter, InitError> {
    EnvFilter::try_new(config.directive()).map_err(InitError::Filter)
}

/// Installs a global formatting subscriber filtered according to `config`.
///
/// Output goes to standard error so that it never interleaves with data
/// written to standard output.
pub fn init_tracing(config: &LogConfig) -> Result<(), InitError> {
    let filter = build_filter(config)?;
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init()
        .map_err(InitError::AlreadyInstalled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LogLevel;

    #[test]
    fn builds_filter_from_level() {
        assert!(build_filter(&LogConfig::new(LogLevel::Debug)).is_ok());
        assert!(build_filter(&LogConfig::new(LogLevel::None)).is_ok());
    }

    #[test]
    fn rejects_malformed_directive() {
        let config = LogConfig::new(LogLevel::Info).with_filter("blobroute::route=loud");
        assert!(matches!(build_filter(&config), Err(InitError::Filter(_))));
    }
}
