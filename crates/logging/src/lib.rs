#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `logging` provides the diagnostic plumbing shared by the blobroute
//! workspace: severity levels, log sinks bound to a single transfer,
//! human-facing lifecycle notices, and installation of the process-wide
//! `tracing` subscriber.
//!
//! # Design
//!
//! - [`TransferLog`] is the level-gated sink handed to route resolution.
//!   Callers ask [`TransferLog::should_log`] before formatting, so quiet
//!   levels cost nothing.
//! - [`Notifier`] carries messages meant for the operator rather than for a
//!   transfer's log. [`OneShotNotice`] wraps a [`std::sync::Once`] so that a
//!   notice is delivered exactly once per guard even when many threads race
//!   to send it.
//! - [`init_tracing`] installs a formatting subscriber filtered by
//!   [`LogConfig`].
//!
//! # Examples
//!
//! ```
//! use logging::{LogLevel, TracingTransferLog, TransferLog};
//!
//! let log = TracingTransferLog::new(LogLevel::Info);
//! assert!(log.should_log(LogLevel::Info));
//! assert!(!log.should_log(LogLevel::Debug));
//! ```

mod config;
mod levels;
mod notice;
mod sink;
mod tracing_bridge;

pub use config::{LOG_FILTER_ENV, LogConfig};
pub use levels::{LogLevel, ParseLogLevelError};
pub use notice::{NOTICE_TARGET, Notifier, OneShotNotice, StderrNotifier};
pub use sink::{TRANSFER_TARGET, TracingTransferLog, TransferLog};
pub use tracing_bridge::{InitError, build_filter, init_tracing};
