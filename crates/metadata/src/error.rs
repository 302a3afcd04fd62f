use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Error raised while reading metadata from a source path.
///
/// Carries the failing operation and the path so that the owning transfer can
/// be identified from the message alone.
#[derive(Debug, Error)]
#[error("failed to {context} for {}: {source}", path.display())]
pub struct MetadataError {
    context: &'static str,
    path: PathBuf,
    #[source]
    source: io::Error,
}

impl MetadataError {
    /// Creates a new error for `context` on `path`.
    pub fn new(context: &'static str, path: &Path, source: io::Error) -> Self {
        Self {
            context,
            path: path.to_path_buf(),
            source,
        }
    }

    /// Operation that failed, e.g. `"read security descriptor"`.
    #[must_use]
    pub const fn context(&self) -> &'static str {
        self.context
    }

    /// Path the operation was applied to.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Kind of the underlying I/O error.
    #[must_use]
    pub fn kind(&self) -> io::ErrorKind {
        self.source.kind()
    }

    /// Consumes the error and returns the underlying I/O error.
    #[must_use]
    pub fn into_io(self) -> io::Error {
        self.source
    }
}
