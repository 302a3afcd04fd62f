//! crates/metadata/src/opener.rs
//!
//! Host-specific ways of opening a local source file.
//!
//! Windows needs `FILE_FLAG_BACKUP_SEMANTICS` to open directories and to
//! let backup operators read files their ACLs would otherwise deny. No other
//! host needs anything special, so [`host_opener`] returns `None` there and
//! callers use [`File::open`].

use std::fs::File;
use std::io;
use std::path::Path;

use crate::error::MetadataError;

/// Opens local files with host-specific flags.
pub trait LocalOpener: Send + Sync {
    /// Opens `path` for reading.
    fn open(&self, path: &Path) -> io::Result<File>;
}

#[cfg(windows)]
mod backup {
    use std::fs::{File, OpenOptions};
    use std::io;
    use std::os::windows::fs::OpenOptionsExt;
    use std::path::Path;

    use windows::Win32::Storage::FileSystem::FILE_FLAG_BACKUP_SEMANTICS;

    use super::LocalOpener;

    /// Opens with `FILE_FLAG_BACKUP_SEMANTICS`.
    #[derive(Clone, Copy, Debug, Default)]
    pub struct BackupSemanticsOpener;

    impl LocalOpener for BackupSemanticsOpener {
        fn open(&self, path: &Path) -> io::Result<File> {
            OpenOptions::new()
                .read(true)
                .custom_flags(FILE_FLAG_BACKUP_SEMANTICS.0)
                .open(path)
        }
    }

    pub(super) static OPENER: BackupSemanticsOpener = BackupSemanticsOpener;
}

#[cfg(windows)]
pub use backup::BackupSemanticsOpener;

/// The opener this host requires, if any.
#[must_use]
pub fn host_opener() -> Option<&'static dyn LocalOpener> {
    #[cfg(windows)]
    {
        Some(&backup::OPENER)
    }
    #[cfg(not(windows))]
    {
        None
    }
}

/// Opens `path` for metadata queries with the host opener, falling back to
/// an ordinary open.
pub fn open_for_metadata(path: &Path) -> Result<File, MetadataError> {
    let result = match host_opener() {
        Some(opener) => opener.open(path),
        None => File::open(path),
    };
    result.map_err(|error| MetadataError::new("open file", path, error))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn host_opener_matches_platform() {
        assert_eq!(host_opener().is_some(), cfg!(windows));
    }

    #[test]
    fn opens_regular_file() {
        let dir = tempdir().expect("create temp dir");
        let file = dir.path().join("data.bin");
        fs::write(&file, b"abc").expect("write file");

        let handle = open_for_metadata(&file).expect("open");
        assert_eq!(handle.metadata().expect("metadata").len(), 3);
    }

    #[test]
    fn open_failure_names_path() {
        let dir = tempdir().expect("create temp dir");
        let missing = dir.path().join("missing");
        let error = open_for_metadata(&missing).expect_err("missing file");
        assert_eq!(error.kind(), io::ErrorKind::NotFound);
        assert_eq!(error.path(), missing.as_path());
    }

    #[cfg(windows)]
    #[test]
    fn backup_semantics_opens_directories() {
        let dir = tempdir().expect("create temp dir");
        let handle = open_for_metadata(dir.path()).expect("open directory");
        assert!(handle.metadata().expect("metadata").is_dir());
    }
}
