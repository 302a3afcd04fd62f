//! crates/logging/src/sink.rs
//! Level-gated log sinks bound to a single transfer.

use super::levels::LogLevel;

/// Target used for every per-transfer event emitted through tracing.
pub const TRANSFER_TARGET: &str = "blobroute::transfer";

/// Log sink scoped to one transfer.
///
/// Callers check [`should_log`](Self::should_log) before formatting a message
/// so the formatting cost is only paid when the line is emitted.
pub trait TransferLog: Send + Sync {
    /// Returns `true` when lines at `level` reach the sink.
    fn should_log(&self, level: LogLevel) -> bool;

    /// Records `message` against the transfer identified by `source` and
    /// `destination`.
    fn log_transfer_info(&self, level: LogLevel, source: &str, destination: &str, message: &str);
}

impl<T: TransferLog + ?Sized> TransferLog for &T {
    fn should_log(&self, level: LogLevel) -> bool {
        (**self).should_log(level)
    }

    fn log_transfer_info(&self, level: LogLevel, source: &str, destination: &str, message: &str) {
        (**self).log_transfer_info(level, source, destination, message);
    }
}

/// [`TransferLog`] that forwards lines to `tracing` under [`TRANSFER_TARGET`].
#[derive(Clone, Debug)]
pub struct TracingTransferLog {
    threshold: LogLevel,
    job: Option<String>,
}

impl TracingTransferLog {
    /// Creates a sink that admits lines up to `threshold`.
    #[must_use]
    pub const fn new(threshold: LogLevel) -> Self {
        Self {
            threshold,
            job: None,
        }
    }

    /// Tags every emitted line with the owning job identifier.
    #[must_use]
    pub fn with_job(mut self, job: impl Into<String>) -> Self {
        self.job = Some(job.into());
        self
    }

    /// Threshold configured for this sink.
    #[must_use]
    pub const fn threshold(&self) -> LogLevel {
        self.threshold
    }
}

impl TransferLog for TracingTransferLog {
    fn should_log(&self, level: LogLevel) -> bool {
        level.enabled_at(self.threshold)
    }

    fn log_transfer_info(&self, level: LogLevel, source: &str, destination: &str, message: &str) {
        if !self.should_log(level) {
            return;
        }
        let job = self.job.as_deref().unwrap_or("-");
        match level {
            LogLevel::None => {}
            LogLevel::Error => tracing::error!(
                target: TRANSFER_TARGET,
                job = job,
                source = source,
                destination = destination,
                "{message}"
            ),
            LogLevel::Warning => tracing::warn!(
                target: TRANSFER_TARGET,
                job = job,
                source = source,
                destination = destination,
                "{message}"
            ),
            LogLevel::Info => tracing::info!(
                target: TRANSFER_TARGET,
                job = job,
                source = source,
                destination = destination,
                "{message}"
            ),
            LogLevel::Debug => tracing::debug!(
                target: TRANSFER_TARGET,
                job = job,
                source = source,
                destination = destination,
                "{message}"
            ),
        }
    }
}
