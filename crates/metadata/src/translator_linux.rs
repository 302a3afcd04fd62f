//! crates/metadata/src/translator_linux.rs
//!
//! Security descriptors on Linux come from the CIFS client, which exposes
//! the server-side descriptor of a mounted SMB share as the extended
//! attribute `system.cifs_ntsd`. That attribute carries exactly the owner,
//! group and DACL; the SACL variant needs a separate attribute and audit
//! privileges on the server.

use std::io;
use std::path::Path;

use crate::error::MetadataError;
use crate::sddl::{SddlError, SecurityDescriptor};
use crate::translator::SecurityDescriptorTranslator;

/// Extended attribute holding the owner, group and DACL of a CIFS file.
pub const CIFS_NTSD_XATTR: &str = "system.cifs_ntsd";

/// Decodes descriptors read from CIFS mounts with the crate's own codec.
#[derive(Clone, Copy, Debug, Default)]
pub struct HostTranslator;

impl HostTranslator {
    /// Creates the translator.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

/// Security descriptors can be read on this host.
#[must_use]
pub const fn is_supported() -> bool {
    true
}

impl SecurityDescriptorTranslator for HostTranslator {
    fn fetch(&self, path: &Path) -> Result<Vec<u8>, MetadataError> {
        let map_error = |error: io::Error| {
            MetadataError::new("read security descriptor", path, classify_xattr_error(error))
        };
        xattr::get_deref(path, CIFS_NTSD_XATTR)
            .map_err(map_error)?
            .ok_or_else(|| {
                map_error(io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("{CIFS_NTSD_XATTR} is not set; is the path on a CIFS mount?"),
                ))
            })
    }

    fn binary_to_string(&self, raw: &[u8]) -> Result<String, SddlError> {
        SecurityDescriptor::from_self_relative(raw).map(|descriptor| descriptor.to_string())
    }
}

/// Filesystems without the attribute namespace answer `EOPNOTSUPP`; surface
/// that as [`io::ErrorKind::Unsupported`] so callers can tell it apart from
/// permission problems.
fn classify_xattr_error(error: io::Error) -> io::Error {
    if error.raw_os_error() == Some(libc::EOPNOTSUPP) {
        io::Error::new(io::ErrorKind::Unsupported, error)
    } else {
        error
    }
}
