//! Integration tests for level gating across sinks and configuration.

use std::sync::Mutex;

use logging::{LogConfig, LogLevel, Notifier, OneShotNotice, TracingTransferLog, TransferLog, build_filter};

// ============================================================================
// Threshold Tests
// ============================================================================

/// Every level up to the threshold passes; nothing passes a `None` threshold.
#[test]
fn tracing_sink_gates_by_threshold() {
    let levels = [LogLevel::Error, LogLevel::Warning, LogLevel::Info, LogLevel::Debug];
    for (index, threshold) in levels.into_iter().enumerate() {
        let sink = TracingTransferLog::new(threshold);
        for (other, level) in levels.into_iter().enumerate() {
            assert_eq!(sink.should_log(level), other <= index, "{level} at {threshold}");
        }
    }

    let silent = TracingTransferLog::new(LogLevel::None);
    assert!(levels.into_iter().all(|level| !silent.should_log(level)));
}

/// Sinks accept lines without a subscriber installed.
#[test]
fn logging_without_subscriber_is_harmless() {
    let sink = TracingTransferLog::new(LogLevel::Debug).with_job("job-1");
    sink.log_transfer_info(LogLevel::Debug, "/data/a", "https://acct.blob.x/c/a", "line");
    sink.log_transfer_info(LogLevel::None, "/data/a", "https://acct.blob.x/c/a", "dropped");
}

// ============================================================================
// Configuration Tests
// ============================================================================

/// Verbosity counts select the per-transfer threshold and a valid filter.
#[test]
fn verbosity_config_produces_valid_filters() {
    for verbose in 0..4 {
        let config = LogConfig::from_verbose_level(verbose);
        assert!(build_filter(&config).is_ok(), "verbose {verbose}");
        assert_eq!(TracingTransferLog::new(config.level()).threshold(), config.level());
    }
}

// ============================================================================
// Notice Tests
// ============================================================================

#[derive(Default)]
struct Collect(Mutex<Vec<String>>);

impl Notifier for Collect {
    fn info(&self, message: &str) {
        self.0.lock().expect("lock").push(message.to_owned());
    }
}

/// Separate guards fire independently; a static guard fires once.
#[test]
fn guards_are_independent() {
    static SHARED: OneShotNotice = OneShotNotice::new();
    let local = OneShotNotice::new();
    let notifier = Collect::default();

    assert!(SHARED.notify(&notifier, "shared"));
    assert!(local.notify(&notifier, "local"));
    assert!(!SHARED.notify(&notifier, "shared again"));

    assert_eq!(*notifier.0.lock().expect("lock"), ["shared", "local"]);
}
