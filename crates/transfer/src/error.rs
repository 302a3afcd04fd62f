//! crates/transfer/src/error.rs
//!
//! Errors raised while resolving a transfer route or querying a source.

use metadata::MetadataError;
use thiserror::Error;

use crate::sender::SenderKind;

/// Fatal configuration errors for a single transfer.
///
/// Neither variant is retried; the job manager fails the transfer and moves
/// on to the next one.
#[derive(Debug, Error)]
pub enum RouteError {
    /// The destination endpoint is not a valid URL.
    #[error("invalid destination URL '{destination}': {source}")]
    InvalidDestination {
        /// Destination as supplied by the scheduler.
        destination: String,
        /// Parser failure.
        #[source]
        source: url::ParseError,
    },

    /// The sender factory rejected the selected sender.
    #[error("failed to create {kind} sender for {raw_source} -> {destination}: {message}")]
    SenderConstruction {
        /// Sender that was selected.
        kind: SenderKind,
        /// Source identifier, for diagnostics.
        raw_source: String,
        /// Destination after normalization.
        destination: String,
        /// Factory error, rendered.
        message: String,
    },
}

/// A source capability was present but reading it failed.
///
/// Recoverable: the transfer fails, the job continues.
#[derive(Debug, Error)]
#[error("failed to {operation} of source {raw_source}: {error}")]
pub struct SourceInfoError {
    /// Source identifier, for diagnostics.
    pub raw_source: String,
    /// What was being read, e.g. `"read SMB properties"`.
    pub operation: &'static str,
    /// Underlying metadata failure.
    #[source]
    pub error: MetadataError,
}

impl SourceInfoError {
    /// Wraps a metadata failure for `raw_source`.
    pub fn new(raw_source: impl Into<String>, operation: &'static str, error: MetadataError) -> Self {
        Self {
            raw_source: raw_source.into(),
            operation,
            error,
        }
    }
}
