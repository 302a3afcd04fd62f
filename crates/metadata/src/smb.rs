//! crates/metadata/src/smb.rs
//!
//! SMB property extraction: creation time, last-write time and the
//! attribute word of a local file, converted to the portable representation
//! a file share expects.
//!
//! Native timestamps are Windows FILETIME values (100 ns ticks since
//! 1601-01-01 UTC); portable timestamps are signed nanoseconds since the
//! Unix epoch.

use std::fmt;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::MetadataError;

/// FILETIME ticks between 1601-01-01 and 1970-01-01.
pub const FILETIME_UNIX_EPOCH_OFFSET: u64 = 116_444_736_000_000_000;

const NANOS_PER_TICK: i128 = 100;

/// Converts FILETIME ticks to nanoseconds since the Unix epoch, saturating
/// at the limits of `i64`.
#[must_use]
pub fn filetime_ticks_to_unix_nanos(ticks: u64) -> i64 {
    let nanos = (i128::from(ticks) - i128::from(FILETIME_UNIX_EPOCH_OFFSET)) * NANOS_PER_TICK;
    saturate_i64(nanos)
}

/// Converts nanoseconds since the Unix epoch to FILETIME ticks, truncating
/// towards 1601 and clamping instants before it to zero.
#[must_use]
pub fn unix_nanos_to_filetime_ticks(nanos: i64) -> u64 {
    let ticks =
        i128::from(nanos).div_euclid(NANOS_PER_TICK) + i128::from(FILETIME_UNIX_EPOCH_OFFSET);
    u64::try_from(ticks.max(0)).unwrap_or(u64::MAX)
}

/// Converts a [`SystemTime`] to signed nanoseconds since the Unix epoch.
#[must_use]
pub fn system_time_to_unix_nanos(time: SystemTime) -> i64 {
    match time.duration_since(UNIX_EPOCH) {
        Ok(after) => saturate_i64(i128::try_from(after.as_nanos()).unwrap_or(i128::MAX)),
        Err(before) => {
            saturate_i64(-i128::try_from(before.duration().as_nanos()).unwrap_or(i128::MAX))
        }
    }
}

fn saturate_i64(value: i128) -> i64 {
    i64::try_from(value).unwrap_or(if value < 0 { i64::MIN } else { i64::MAX })
}

/// Native `FILE_ATTRIBUTE_*` values with their portable counterparts.
const ATTRIBUTE_TABLE: &[(u32, u32, &str)] = &[
    (0x0000_0001, FileAttributes::READ_ONLY, "ReadOnly"),
    (0x0000_0002, FileAttributes::HIDDEN, "Hidden"),
    (0x0000_0004, FileAttributes::SYSTEM, "System"),
    (0x0000_0010, FileAttributes::DIRECTORY, "Directory"),
    (0x0000_0020, FileAttributes::ARCHIVE, "Archive"),
    (0x0000_0080, FileAttributes::NORMAL, "Normal"),
    (0x0000_0100, FileAttributes::TEMPORARY, "Temporary"),
    (0x0000_1000, FileAttributes::OFFLINE, "Offline"),
    (0x0000_2000, FileAttributes::NOT_CONTENT_INDEXED, "NotContentIndexed"),
    (0x0002_0000, FileAttributes::NO_SCRUB_DATA, "NoScrubData"),
];

/// Portable SMB file attribute flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct FileAttributes(u32);

impl FileAttributes {
    /// Read-only file.
    pub const READ_ONLY: u32 = 1 << 0;
    /// Hidden from ordinary listings.
    pub const HIDDEN: u32 = 1 << 1;
    /// Used by the operating system.
    pub const SYSTEM: u32 = 1 << 2;
    /// Directory.
    pub const DIRECTORY: u32 = 1 << 3;
    /// Marked for backup.
    pub const ARCHIVE: u32 = 1 << 4;
    /// No other attributes set.
    pub const NORMAL: u32 = 1 << 5;
    /// Temporary storage.
    pub const TEMPORARY: u32 = 1 << 6;
    /// Data lives offline.
    pub const OFFLINE: u32 = 1 << 7;
    /// Excluded from content indexing.
    pub const NOT_CONTENT_INDEXED: u32 = 1 << 8;
    /// Excluded from integrity scans.
    pub const NO_SCRUB_DATA: u32 = 1 << 9;

    /// Creates flags from a portable value.
    #[must_use]
    pub const fn from_raw(value: u32) -> Self {
        Self(value)
    }

    /// Returns the portable value.
    #[must_use]
    pub const fn as_raw(self) -> u32 {
        self.0
    }

    /// Checks if a flag is set.
    #[must_use]
    pub const fn contains(self, flag: u32) -> bool {
        (self.0 & flag) != 0
    }

    /// Returns `true` when no flag is set.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Maps a native `FILE_ATTRIBUTE_*` word; bits outside the table are
    /// dropped.
    #[must_use]
    pub fn from_native(native: u32) -> Self {
        Self(
            ATTRIBUTE_TABLE
                .iter()
                .filter(|(bit, _, _)| native & *bit != 0)
                .fold(0u32, |acc, (_, portable, _)| acc | *portable),
        )
    }

    /// Returns the native `FILE_ATTRIBUTE_*` word.
    #[must_use]
    pub fn to_native(self) -> u32 {
        ATTRIBUTE_TABLE
            .iter()
            .filter(|(_, portable, _)| self.contains(*portable))
            .fold(0u32, |acc, (bit, _, _)| acc | *bit)
    }
}

impl fmt::Display for FileAttributes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("None");
        }
        let mut first = true;
        for (_, portable, name) in ATTRIBUTE_TABLE {
            if self.contains(*portable) {
                if !first {
                    f.write_str("|")?;
                }
                f.write_str(name)?;
                first = false;
            }
        }
        Ok(())
    }
}

/// SMB properties of a source file in portable form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SmbProperties {
    /// Creation instant, nanoseconds since the Unix epoch.
    pub creation_time: i64,
    /// Last-write instant, nanoseconds since the Unix epoch.
    pub last_write_time: i64,
    /// Portable attribute flags.
    pub attributes: FileAttributes,
}

/// OS-native snapshot of the values behind [`SmbProperties`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct NativeFileInformation {
    /// Creation time in FILETIME ticks.
    pub creation_ticks: u64,
    /// Last-write time in FILETIME ticks.
    pub last_write_ticks: u64,
    /// Native `FILE_ATTRIBUTE_*` word.
    pub attributes: u32,
}

impl NativeFileInformation {
    /// Converts to the portable representation.
    #[must_use]
    pub fn to_smb_properties(&self) -> SmbProperties {
        SmbProperties {
            creation_time: filetime_ticks_to_unix_nanos(self.creation_ticks),
            last_write_time: filetime_ticks_to_unix_nanos(self.last_write_ticks),
            attributes: FileAttributes::from_native(self.attributes),
        }
    }
}

/// Reads the SMB properties of `path`.
pub fn read_smb_properties(path: &Path) -> Result<SmbProperties, MetadataError> {
    read_native_file_information(path).map(|info| info.to_smb_properties())
}

#[cfg(windows)]
pub use windows_impl::read_native_file_information;

#[cfg(unix)]
pub use unix_impl::read_native_file_information;

#[cfg(not(any(unix, windows)))]
pub use portable_impl::read_native_file_information;

#[cfg(windows)]
mod windows_impl {
    use std::os::windows::fs::MetadataExt;
    use std::path::Path;

    use super::NativeFileInformation;
    use crate::error::MetadataError;
    use crate::opener::open_for_metadata;

    /// Reads creation time, last-write time and attributes through a handle
    /// opened with backup semantics.
    pub fn read_native_file_information(path: &Path) -> Result<NativeFileInformation, MetadataError> {
        let file = open_for_metadata(path)?;
        let metadata = file
            .metadata()
            .map_err(|error| MetadataError::new("read file information", path, error))?;
        Ok(NativeFileInformation {
            creation_ticks: metadata.creation_time(),
            last_write_ticks: metadata.last_write_time(),
            attributes: metadata.file_attributes(),
        })
    }
}

#[cfg(not(any(unix, windows)))]
mod portable_impl {
    use std::fs;
    use std::path::Path;

    use super::{NativeFileInformation, system_time_to_unix_nanos, unix_nanos_to_filetime_ticks};
    use crate::error::MetadataError;

    /// Reads what the standard library exposes: timestamps, directory and
    /// read-only bits.
    pub fn read_native_file_information(path: &Path) -> Result<NativeFileInformation, MetadataError> {
        let metadata =
            fs::metadata(path).map_err(|error| MetadataError::new("read file information", path, error))?;
        let modified = metadata
            .modified()
            .map_err(|error| MetadataError::new("read modification time", path, error))?;
        let last_write_ticks = unix_nanos_to_filetime_ticks(system_time_to_unix_nanos(modified));
        let creation_ticks = metadata.created().map_or(last_write_ticks, |created| {
            unix_nanos_to_filetime_ticks(system_time_to_unix_nanos(created))
        });
        let mut attributes = if metadata.is_dir() { 0x10 } else { 0x20 };
        if metadata.permissions().readonly() {
            attributes |= 0x01;
        }
        Ok(NativeFileInformation {
            creation_ticks,
            last_write_ticks,
            attributes,
        })
    }
}

#[cfg(unix)]
mod unix_impl {
    use std::fs::{self, Metadata};
    use std::io;
    use std::path::Path;

    use tracing::trace;

    use super::{NativeFileInformation, system_time_to_unix_nanos, unix_nanos_to_filetime_ticks};
    use crate::error::MetadataError;
    use crate::translator::METADATA_TARGET;

    /// CIFS virtual attribute with the server-side creation FILETIME.
    pub const CIFS_CREATION_TIME_XATTR: &str = "user.cifs.creationtime";
    /// CIFS virtual attribute with the server-side attribute word.
    pub const CIFS_DOS_ATTRIBUTES_XATTR: &str = "user.cifs.dosattrib";

    const FILE_ATTRIBUTE_READONLY: u32 = 0x01;
    const FILE_ATTRIBUTE_DIRECTORY: u32 = 0x10;
    const FILE_ATTRIBUTE_ARCHIVE: u32 = 0x20;

    /// Decodes the 8-byte little-endian `user.cifs.creationtime` payload.
    #[must_use]
    pub fn decode_cifs_creation_time(payload: &[u8]) -> Option<u64> {
        let bytes: [u8; 8] = payload.try_into().ok()?;
        Some(u64::from_le_bytes(bytes))
    }

    /// Decodes the 4-byte little-endian `user.cifs.dosattrib` payload.
    #[must_use]
    pub fn decode_cifs_dos_attributes(payload: &[u8]) -> Option<u32> {
        let bytes: [u8; 4] = payload.try_into().ok()?;
        Some(u32::from_le_bytes(bytes))
    }

    /// Reads SMB-relevant information, preferring the values a CIFS mount
    /// reports for the server-side file.
    pub fn read_native_file_information(path: &Path) -> Result<NativeFileInformation, MetadataError> {
        let metadata =
            fs::metadata(path).map_err(|error| MetadataError::new("read file information", path, error))?;
        let modified = metadata
            .modified()
            .map_err(|error| MetadataError::new("read modification time", path, error))?;
        let last_write_ticks = unix_nanos_to_filetime_ticks(system_time_to_unix_nanos(modified));

        let creation_ticks = match cifs_attribute(path, CIFS_CREATION_TIME_XATTR, decode_cifs_creation_time)? {
            Some(ticks) => ticks,
            None => metadata.created().map_or(last_write_ticks, |created| {
                unix_nanos_to_filetime_ticks(system_time_to_unix_nanos(created))
            }),
        };
        let attributes = match cifs_attribute(path, CIFS_DOS_ATTRIBUTES_XATTR, decode_cifs_dos_attributes)? {
            Some(attributes) => attributes,
            None => derived_attributes(&metadata),
        };

        Ok(NativeFileInformation {
            creation_ticks,
            last_write_ticks,
            attributes,
        })
    }

    /// Reads and decodes a CIFS attribute. Absent attributes and filesystems
    /// without extended attributes yield `None`; a payload of the wrong size
    /// is an error.
    fn cifs_attribute<T>(
        path: &Path,
        name: &str,
        decode: fn(&[u8]) -> Option<T>,
    ) -> Result<Option<T>, MetadataError> {
        let payload = match xattr::get_deref(path, name) {
            Ok(payload) => payload,
            Err(error) if is_missing_support(&error) => None,
            Err(error) => return Err(MetadataError::new("read CIFS attribute", path, error)),
        };
        let Some(payload) = payload else {
            trace!(target: METADATA_TARGET, path = %path.display(), name, "CIFS attribute absent");
            return Ok(None);
        };
        decode(&payload).map(Some).ok_or_else(|| {
            MetadataError::new(
                "decode CIFS attribute",
                path,
                io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("{name} has {} bytes", payload.len()),
                ),
            )
        })
    }

    fn is_missing_support(error: &io::Error) -> bool {
        error.kind() == io::ErrorKind::Unsupported
            || error.raw_os_error() == Some(libc::EOPNOTSUPP)
            || error.raw_os_error() == Some(libc::ENODATA)
    }

    /// Attribute bits implied by the file type and write permissions.
    fn derived_attributes(metadata: &Metadata) -> u32 {
        use std::os::unix::fs::PermissionsExt;

        let write_bits = u32::from(libc::S_IWUSR | libc::S_IWGRP | libc::S_IWOTH);
        let mut attributes = if metadata.is_dir() {
            FILE_ATTRIBUTE_DIRECTORY
        } else {
            FILE_ATTRIBUTE_ARCHIVE
        };
        if metadata.permissions().mode() & write_bits == 0 {
            attributes |= FILE_ATTRIBUTE_READONLY;
        }
        attributes
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use crate::smb::{FILETIME_UNIX_EPOCH_OFFSET, FileAttributes};
        use std::ffi::OsStr;
        use std::os::unix::fs::PermissionsExt;
        use tempfile::tempdir;

        fn xattrs_supported(path: &Path) -> bool {
            let test_name = OsStr::new("user.test_support");
            match xattr::set(path, test_name, b"test") {
                Ok(()) => {
                    let _ = xattr::remove(path, test_name);
                    true
                }
                Err(_) => false,
            }
        }

        #[test]
        fn decodes_cifs_payloads() {
            let ticks: u64 = 132_223_104_000_000_000;
            assert_eq!(decode_cifs_creation_time(&ticks.to_le_bytes()), Some(ticks));
            assert_eq!(decode_cifs_creation_time(&[0; 7]), None);
            assert_eq!(decode_cifs_dos_attributes(&[0x21, 0, 0, 0]), Some(0x21));
            assert_eq!(decode_cifs_dos_attributes(&[0x21, 0, 0]), None);
        }

        #[test]
        fn plain_file_falls_back_to_filesystem_times() {
            let dir = tempdir().expect("create temp dir");
            let file = dir.path().join("plain.txt");
            fs::write(&file, b"data").expect("write file");

            let info = read_native_file_information(&file).expect("read info");
            let modified = fs::metadata(&file).expect("metadata").modified().expect("mtime");
            assert_eq!(
                info.last_write_ticks,
                unix_nanos_to_filetime_ticks(system_time_to_unix_nanos(modified))
            );
            assert!(info.creation_ticks > FILETIME_UNIX_EPOCH_OFFSET);
            assert_eq!(info.attributes, FILE_ATTRIBUTE_ARCHIVE);
        }

        #[test]
        fn read_only_directory_is_flagged() {
            let dir = tempdir().expect("create temp dir");
            let sub = dir.path().join("frozen");
            fs::create_dir(&sub).expect("create dir");
            fs::set_permissions(&sub, fs::Permissions::from_mode(0o555)).expect("chmod");

            let info = read_native_file_information(&sub).expect("read info");
            let attributes = FileAttributes::from_native(info.attributes);
            assert!(attributes.contains(FileAttributes::DIRECTORY));
            assert!(attributes.contains(FileAttributes::READ_ONLY));

            fs::set_permissions(&sub, fs::Permissions::from_mode(0o755)).expect("restore");
        }

        #[test]
        fn cifs_attributes_take_precedence() {
            let dir = tempdir().expect("create temp dir");
            let file = dir.path().join("share.txt");
            fs::write(&file, b"data").expect("write file");
            if !xattrs_supported(&file) {
                eprintln!("xattrs not supported, skipping test");
                return;
            }

            let created: u64 = 132_223_104_000_000_000;
            xattr::set(&file, CIFS_CREATION_TIME_XATTR, &created.to_le_bytes()).expect("set time");
            xattr::set(&file, CIFS_DOS_ATTRIBUTES_XATTR, &0x22u32.to_le_bytes()).expect("set attrs");

            let info = read_native_file_information(&file).expect("read info");
            assert_eq!(info.creation_ticks, created);
            assert_eq!(info.attributes, 0x22);
            let properties = info.to_smb_properties();
            assert_eq!(properties.creation_time, 1_577_836_800_000_000_000);
            assert_eq!(properties.attributes.to_string(), "Hidden|Archive");
        }

        #[test]
        fn truncated_cifs_payload_is_an_error() {
            let dir = tempdir().expect("create temp dir");
            let file = dir.path().join("bad.txt");
            fs::write(&file, b"data").expect("write file");
            if !xattrs_supported(&file) {
                eprintln!("xattrs not supported, skipping test");
                return;
            }

            xattr::set(&file, CIFS_CREATION_TIME_XATTR, &[1, 2, 3]).expect("set time");
            let error = read_native_file_information(&file).expect_err("bad payload");
            assert_eq!(error.kind(), io::ErrorKind::InvalidData);
            assert_eq!(error.context(), "decode CIFS attribute");
        }
    }
}

#[cfg(unix)]
pub use unix_impl::{
    CIFS_CREATION_TIME_XATTR, CIFS_DOS_ATTRIBUTES_XATTR, decode_cifs_creation_time,
    decode_cifs_dos_attributes,
};

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn converts_known_instant() {
        let ticks = 132_223_104_000_000_000;
        assert_eq!(filetime_ticks_to_unix_nanos(ticks), 1_577_836_800_000_000_000);
        assert_eq!(unix_nanos_to_filetime_ticks(1_577_836_800_000_000_000), ticks);
    }

    #[test]
    fn epoch_offsets_line_up() {
        assert_eq!(filetime_ticks_to_unix_nanos(FILETIME_UNIX_EPOCH_OFFSET), 0);
        // 1601 is further from 1970 than i64 nanoseconds reach.
        assert_eq!(filetime_ticks_to_unix_nanos(0), i64::MIN);
        assert!(unix_nanos_to_filetime_ticks(i64::MIN) < FILETIME_UNIX_EPOCH_OFFSET);
        assert_eq!(system_time_to_unix_nanos(UNIX_EPOCH), 0);
    }

    #[test]
    fn times_before_unix_epoch_are_negative() {
        let before = UNIX_EPOCH - std::time::Duration::from_secs(1);
        assert_eq!(system_time_to_unix_nanos(before), -1_000_000_000);
    }

    #[test]
    fn attribute_mapping_drops_unknown_bits() {
        // READONLY | ARCHIVE | REPARSE_POINT (0x400, unmapped) | COMPRESSED (0x800, unmapped)
        let attributes = FileAttributes::from_native(0x0000_0C21);
        assert!(attributes.contains(FileAttributes::READ_ONLY));
        assert!(attributes.contains(FileAttributes::ARCHIVE));
        assert_eq!(attributes.to_native(), 0x21);
        assert_eq!(attributes.to_string(), "ReadOnly|Archive");
    }

    #[test]
    fn empty_attributes_render_as_none() {
        assert_eq!(FileAttributes::default().to_string(), "None");
        assert_eq!(FileAttributes::from_native(0x400).to_string(), "None");
    }

    #[test]
    fn native_snapshot_converts() {
        let info = NativeFileInformation {
            creation_ticks: FILETIME_UNIX_EPOCH_OFFSET + 10,
            last_write_ticks: FILETIME_UNIX_EPOCH_OFFSET + 20,
            attributes: 0x0002_0010,
        };
        let properties = info.to_smb_properties();
        assert_eq!(properties.creation_time, 1_000);
        assert_eq!(properties.last_write_time, 2_000);
        assert_eq!(properties.attributes.to_string(), "Directory|NoScrubData");
    }

    proptest! {
        #[test]
        fn tick_conversion_is_lossless_for_whole_ticks(ticks in 30_000_000_000_000_000u64..=200_000_000_000_000_000) {
            prop_assert_eq!(unix_nanos_to_filetime_ticks(filetime_ticks_to_unix_nanos(ticks)), ticks);
        }

        #[test]
        fn mapped_attributes_survive_native_round_trip(native in any::<u32>()) {
            let portable = FileAttributes::from_native(native);
            prop_assert_eq!(FileAttributes::from_native(portable.to_native()), portable);
            prop_assert_eq!(portable.to_native() & !native, 0);
        }
    }
}
