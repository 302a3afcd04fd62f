//! crates/logging/src/notice.rs
//! Human-facing lifecycle notices and the one-shot guard that rate-limits them.

use std::sync::Once;

/// Target used when notices are mirrored into tracing.
pub const NOTICE_TARGET: &str = "blobroute::notice";

/// Receives notices meant for the person running the transfer, as opposed to
/// per-transfer diagnostics.
pub trait Notifier: Send + Sync {
    /// Delivers an informational notice.
    fn info(&self, message: &str);
}

/// [`Notifier`] that prints to standard error and mirrors the text into tracing.
#[derive(Clone, Copy, Debug, Default)]
pub struct StderrNotifier;

impl Notifier for StderrNotifier {
    fn info(&self, message: &str) {
        eprintln!("INFO: {message}");
        tracing::info!(target: NOTICE_TARGET, "{message}");
    }
}

/// Guard that lets exactly one caller deliver a notice.
///
/// Backed by [`Once`]: concurrent first callers block until the winning
/// caller's notice has been delivered, and later callers return immediately.
/// A notifier that panics leaves the guard unset for the next caller instead
/// of poisoning it. Once delivered, the guard is never reset.
#[derive(Debug)]
pub struct OneShotNotice {
    once: Once,
}

impl OneShotNotice {
    /// Creates an unset guard. Usable in `static` items.
    #[must_use]
    pub const fn new() -> Self {
        Self { once: Once::new() }
    }

    /// Sends `message` through `notifier` unless this guard already fired.
    ///
    /// Returns `true` for the single call that delivered the notice.
    pub fn notify(&self, notifier: &dyn Notifier, message: &str) -> bool {
        let mut delivered = false;
        self.once.call_once_force(|_| {
            notifier.info(message);
            delivered = true;
        });
        delivered
    }

    /// Returns `true` once the notice has been delivered.
    #[must_use]
    pub fn has_fired(&self) -> bool {
        self.once.is_completed()
    }
}

impl Default for OneShotNotice {
    fn default() -> Self {
        Self::new()
    }
}
