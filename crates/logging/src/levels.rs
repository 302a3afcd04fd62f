//! crates/logging/src/levels.rs
//! Severity levels shared by transfer log sinks and the tracing bridge.

use std::fmt;
use std::str::FromStr;

/// Severity of a transfer log line.
///
/// Levels are ordered from least to most verbose, so `level <= threshold`
/// reads as "enabled at this threshold".
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LogLevel {
    /// Logging disabled.
    None,
    /// Failures that abort a transfer.
    Error,
    /// Problems the transfer survives.
    Warning,
    /// Routing decisions and other noteworthy events.
    Info,
    /// Verbose per-transfer diagnostics.
    Debug,
}

impl LogLevel {
    /// Returns `true` when a line at `self` passes a sink configured at `threshold`.
    #[must_use]
    pub const fn enabled_at(self, threshold: Self) -> bool {
        !matches!(self, Self::None) && (self as u8) <= (threshold as u8)
    }

    /// Maps the level onto the closest `tracing` level.
    ///
    /// Returns `None` for [`LogLevel::None`], which has no tracing equivalent.
    #[must_use]
    pub const fn as_tracing(self) -> Option<tracing::Level> {
        match self {
            Self::None => None,
            Self::Error => Some(tracing::Level::ERROR),
            Self::Warning => Some(tracing::Level::WARN),
            Self::Info => Some(tracing::Level::INFO),
            Self::Debug => Some(tracing::Level::DEBUG),
        }
    }

    /// Returns the lowercase name used in filters and configuration.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Info => "info",
            Self::Debug => "debug",
        }
    }
}

impl Default for LogLevel {
    fn default() -> Self {
        Self::Info
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a level name is not recognised.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParseLogLevelError {
    input: String,
}

impl fmt::Display for ParseLogLevelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unknown log level '{}' (expected none, error, warning, info or debug)",
            self.input
        )
    }
}

impl std::error::Error for ParseLogLevelError {}

impl FromStr for LogLevel {
    type Err = ParseLogLevelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" | "off" => Ok(Self::None),
            "error" => Ok(Self::Error),
            "warning" | "warn" => Ok(Self::Warning),
            "info" => Ok(Self::Info),
            "debug" => Ok(Self::Debug),
            _ => Err(ParseLogLevelError {
                input: s.to_owned(),
            }),
        }
    }
}
