//! crates/transfer/src/endpoint.rs
//!
//! Rewriting hierarchical-namespace destinations onto the flat blob
//! endpoint of the same account.
//!
//! Blob writes cannot go through the `.dfs` host, so the first occurrence
//! of the hierarchical marker in the host is replaced with the flat marker.
//! Path, query (including SAS tokens) and fragment are left alone. The first
//! rewrite in the process tells the operator about the switch; later rewrites
//! are silent.

use std::fmt;
use std::sync::Arc;

use logging::{Notifier, OneShotNotice, StderrNotifier};
use tracing::debug;
use url::Url;

use crate::config::RouteConfig;
use crate::error::RouteError;

/// Target for endpoint rewrite events.
pub const ENDPOINT_TARGET: &str = "blobroute::endpoint";

/// Notice shown the first time a destination is rewritten.
pub const BLOB_ENDPOINT_NOTICE_TEXT: &str = "Switching to blob endpoint to write to destination account. \
There are some limitations when writing between blob/dfs endpoints. \
Please refer to https://learn.microsoft.com/en-us/azure/storage/blobs/data-lake-storage-known-issues#blob-storage-apis";

/// Process-wide guard for [`BLOB_ENDPOINT_NOTICE_TEXT`].
pub static BLOB_ENDPOINT_NOTICE: OneShotNotice = OneShotNotice::new();

/// Rewrites hierarchical destinations onto the flat endpoint.
#[derive(Clone)]
pub struct EndpointNormalizer {
    from_marker: String,
    to_marker: String,
    guard: &'static OneShotNotice,
    notifier: Arc<dyn Notifier>,
}

impl EndpointNormalizer {
    /// Uses the markers from `config` and the process-wide notice guard.
    #[must_use]
    pub fn new(config: &RouteConfig, notifier: Arc<dyn Notifier>) -> Self {
        Self::with_guard(config, notifier, &BLOB_ENDPOINT_NOTICE)
    }

    /// Uses a caller-owned guard instead of the process-wide one.
    #[must_use]
    pub fn with_guard(
        config: &RouteConfig,
        notifier: Arc<dyn Notifier>,
        guard: &'static OneShotNotice,
    ) -> Self {
        Self {
            from_marker: config.hierarchical().to_owned(),
            to_marker: config.flat().to_owned(),
            guard,
            notifier,
        }
    }

    /// Guard deciding whether the notice still has to be shown.
    #[must_use]
    pub const fn guard(&self) -> &'static OneShotNotice {
        self.guard
    }

    /// Normalizes `destination`.
    ///
    /// A destination whose host carries no hierarchical marker is returned
    /// unchanged, byte for byte.
    ///
    /// # Errors
    ///
    /// Returns [`RouteError::InvalidDestination`] when `destination` is not
    /// an absolute URL.
    pub fn normalize(&self, destination: &str) -> Result<String, RouteError> {
        let invalid = |source| RouteError::InvalidDestination {
            destination: destination.to_owned(),
            source,
        };
        let mut url = Url::parse(destination).map_err(invalid)?;

        let Some(host) = url.host_str() else {
            return Ok(destination.to_owned());
        };
        if self.from_marker.is_empty() || !host.contains(self.from_marker.as_str()) {
            return Ok(destination.to_owned());
        }

        let rewritten = host.replacen(self.from_marker.as_str(), &self.to_marker, 1);
        url.set_host(Some(&rewritten)).map_err(invalid)?;

        if self.guard.notify(self.notifier.as_ref(), BLOB_ENDPOINT_NOTICE_TEXT) {
            debug!(target: ENDPOINT_TARGET, "blob endpoint notice delivered");
        }
        debug!(
            target: ENDPOINT_TARGET,
            from = %destination,
            to = %url,
            "rewrote hierarchical destination onto blob endpoint"
        );
        Ok(url.into())
    }
}

impl Default for EndpointNormalizer {
    fn default() -> Self {
        Self::new(&RouteConfig::default(), Arc::new(StderrNotifier))
    }
}

impl fmt::Debug for EndpointNormalizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EndpointNormalizer")
            .field("from_marker", &self.from_marker)
            .field("to_marker", &self.to_marker)
            .field("notice_fired", &self.guard.has_fired())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_support::RecordingNotifier;

    fn normalizer(guard: &'static OneShotNotice) -> (EndpointNormalizer, Arc<RecordingNotifier>) {
        let notifier = Arc::new(RecordingNotifier::new());
        let normalizer =
            EndpointNormalizer::with_guard(&RouteConfig::default(), notifier.clone(), guard);
        (normalizer, notifier)
    }

    #[test]
    fn rewrites_host_and_keeps_path_and_query() {
        static GUARD: OneShotNotice = OneShotNotice::new();
        let (normalizer, notifier) = normalizer(&GUARD);

        let out = normalizer
            .normalize("https://acct.dfs.core.windows.net/fs/dir/file.txt?sv=2024&sig=abc%2Fdef")
            .expect("normalize");
        assert_eq!(
            out,
            "https://acct.blob.core.windows.net/fs/dir/file.txt?sv=2024&sig=abc%2Fdef"
        );
        assert_eq!(notifier.messages(), [BLOB_ENDPOINT_NOTICE_TEXT]);
    }

    #[test]
    fn only_first_marker_in_host_is_replaced() {
        static GUARD: OneShotNotice = OneShotNotice::new();
        let (normalizer, _) = normalizer(&GUARD);

        let out = normalizer
            .normalize("https://acct.dfs.dfs.example/c/a.dfs")
            .expect("normalize");
        assert_eq!(out, "https://acct.blob.dfs.example/c/a.dfs");
    }

    #[test]
    fn flat_destination_is_returned_verbatim_without_notice() {
        static GUARD: OneShotNotice = OneShotNotice::new();
        let (normalizer, notifier) = normalizer(&GUARD);

        // Not canonical: the url crate would add a trailing slash.
        let input = "https://acct.blob.core.windows.net";
        assert_eq!(normalizer.normalize(input).expect("normalize"), input);
        let with_path = "https://acct.blob.core.windows.net/c/.dfs/x";
        assert_eq!(normalizer.normalize(with_path).expect("normalize"), with_path);
        assert!(notifier.messages().is_empty());
        assert!(!GUARD.has_fired());
    }

    #[test]
    fn normalization_is_idempotent() {
        static GUARD: OneShotNotice = OneShotNotice::new();
        let (normalizer, notifier) = normalizer(&GUARD);

        let once = normalizer
            .normalize("https://acct.dfs.core.windows.net/fs/f")
            .expect("normalize");
        let twice = normalizer.normalize(&once).expect("normalize");
        assert_eq!(once, twice);
        assert_eq!(notifier.messages().len(), 1);
    }

    #[test]
    fn malformed_destination_is_rejected() {
        static GUARD: OneShotNotice = OneShotNotice::new();
        let (normalizer, notifier) = normalizer(&GUARD);

        for input in ["not a url", "/relative/path", "https://[::1/x"] {
            let error = normalizer.normalize(input).expect_err("invalid destination");
            assert!(
                matches!(&error, RouteError::InvalidDestination { destination, .. } if destination == input),
                "{error}"
            );
        }
        assert!(notifier.messages().is_empty());
    }

    #[test]
    fn custom_markers_are_honoured() {
        static GUARD: OneShotNotice = OneShotNotice::new();
        let config = RouteConfig::new()
            .hierarchical_marker("-hns")
            .flat_marker("-flat");
        let notifier = Arc::new(RecordingNotifier::new());
        let normalizer = EndpointNormalizer::with_guard(&config, notifier, &GUARD);
        assert_eq!(
            normalizer.normalize("https://acct-hns.example.net/c").expect("normalize"),
            "https://acct-flat.example.net/c"
        );
    }

    #[test]
    fn debug_reports_guard_state() {
        static GUARD: OneShotNotice = OneShotNotice::new();
        let (normalizer, _) = normalizer(&GUARD);
        assert!(format!("{normalizer:?}").contains("notice_fired: false"));
    }
}
