//! crates/logging/src/config.rs
//! Process-level logging configuration.

use super::levels::LogLevel;

/// Environment variable holding an `EnvFilter` directive that overrides the
/// configured level.
pub const LOG_FILTER_ENV: &str = "BLOBROUTE_LOG";

/// Logging configuration consumed by [`init_tracing`](crate::init_tracing)
/// and by [`TracingTransferLog`](crate::TracingTransferLog).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LogConfig {
    level: LogLevel,
    filter: Option<String>,
}

impl LogConfig {
    /// Creates a configuration with an explicit level and no filter directive.
    #[must_use]
    pub const fn new(level: LogLevel) -> Self {
        Self {
            level,
            filter: None,
        }
    }

    /// Maps a `-v` count onto a level: 0 is warnings, 1 is info, 2+ is debug.
    #[must_use]
    pub const fn from_verbose_level(verbose: u8) -> Self {
        let level = match verbose {
            0 => LogLevel::Warning,
            1 => LogLevel::Info,
            _ => LogLevel::Debug,
        };
        Self::new(level)
    }

    /// Reads the filter directive from [`LOG_FILTER_ENV`], keeping `level`
    /// as the threshold for per-transfer sinks.
    #[must_use]
    pub fn from_env(level: LogLevel) -> Self {
        let filter = std::env::var(LOG_FILTER_ENV)
            .ok()
            .filter(|value| !value.trim().is_empty());
        Self { level, filter }
    }

    /// Replaces the filter directive.
    #[must_use]
    pub fn with_filter(mut self, directive: impl Into<String>) -> Self {
        self.filter = Some(directive.into());
        self
    }

    /// Threshold applied by per-transfer sinks.
    #[must_use]
    pub const fn level(&self) -> LogLevel {
        self.level
    }

    /// Explicit filter directive, if one was supplied.
    #[must_use]
    pub fn filter(&self) -> Option<&str> {
        self.filter.as_deref()
    }

    /// Directive handed to `EnvFilter`: the explicit filter when present,
    /// otherwise the level name.
    #[must_use]
    pub fn directive(&self) -> String {
        match &self.filter {
            Some(filter) => filter.clone(),
            None => match self.level {
                LogLevel::None => "off".to_owned(),
                LogLevel::Warning => "warn".to_owned(),
                level => level.as_str().to_owned(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbose_levels_map_to_thresholds() {
        assert_eq!(LogConfig::from_verbose_level(0).level(), LogLevel::Warning);
        assert_eq!(LogConfig::from_verbose_level(1).level(), LogLevel::Info);
        assert_eq!(LogConfig::from_verbose_level(4).level(), LogLevel::Debug);
    }

    #[test]
    fn directive_prefers_explicit_filter() {
        let config = LogConfig::new(LogLevel::Info).with_filter("blobroute::route=debug");
        assert_eq!(config.directive(), "blobroute::route=debug");
        assert_eq!(LogConfig::new(LogLevel::Warning).directive(), "warn");
        assert_eq!(LogConfig::new(LogLevel::None).directive(), "off");
    }
}
