#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `metadata` reads the file metadata a transfer to an SMB-backed share
//! carries alongside the data: the security descriptor (owner, group and
//! DACL) and the SMB property set (creation time, last-write time and
//! attribute flags).
//!
//! # Design
//!
//! - [`sddl`] models security descriptors as SDDL text and as self-relative
//!   binary, and renders the portable form with every alias expanded.
//! - [`SecurityDescriptorTranslator`] is implemented once per host OS as
//!   [`HostTranslator`]: Linux reads the CIFS `system.cifs_ntsd` attribute,
//!   Windows calls the Win32 security API, and other hosts report
//!   [`std::io::ErrorKind::Unsupported`].
//!   [`portable_security_descriptor`] runs the fetch, render, parse and
//!   fidelity check sequence shared by all of them.
//! - [`smb`] converts native timestamps and attribute words into
//!   [`SmbProperties`].
//! - [`host_opener`] exposes the Windows backup-semantics open; other hosts
//!   have none and use [`std::fs::File::open`].
//!
//! # Errors
//!
//! Filesystem failures are reported as [`MetadataError`], which names the
//! operation and the path. Malformed descriptor text or bytes are reported
//! as [`SddlError`].
//!
//! # Examples
//!
//! ```
//! use metadata::sddl::SecurityDescriptor;
//!
//! let descriptor: SecurityDescriptor = "O:BAG:SYD:(A;;FA;;;SY)".parse().unwrap();
//! assert_eq!(
//!     descriptor.to_portable_string().unwrap(),
//!     "O:S-1-5-32-544G:S-1-5-18D:(A;;FA;;;S-1-5-18)"
//! );
//! ```

mod error;
mod opener;
pub mod sddl;
pub mod smb;
mod translator;

#[cfg(target_os = "linux")]
#[path = "translator_linux.rs"]
mod host;
#[cfg(windows)]
#[path = "translator_windows.rs"]
mod host;
#[cfg(not(any(target_os = "linux", windows)))]
#[path = "translator_stub.rs"]
mod host;

pub use error::MetadataError;
pub use host::{HostTranslator, is_supported as security_descriptors_supported};
#[cfg(target_os = "linux")]
pub use host::CIFS_NTSD_XATTR;
#[cfg(windows)]
pub use opener::BackupSemanticsOpener;
pub use opener::{LocalOpener, host_opener, open_for_metadata};
pub use sddl::{SddlError, SecurityDescriptor};
pub use smb::{
    FILETIME_UNIX_EPOCH_OFFSET, FileAttributes, NativeFileInformation, SmbProperties,
    filetime_ticks_to_unix_nanos, read_native_file_information, read_smb_properties,
    system_time_to_unix_nanos, unix_nanos_to_filetime_ticks,
};
pub use translator::{
    METADATA_TARGET, SECURITY_INFORMATION, SecurityDescriptorTranslator, SecurityInformation,
    portable_security_descriptor, verify_round_trip,
};
