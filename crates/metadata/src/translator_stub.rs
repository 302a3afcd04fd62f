//! crates/metadata/src/translator_stub.rs
//!
//! Hosts with neither CIFS descriptor attributes nor Win32 security APIs.
//! Text handling still works so that descriptors received from elsewhere
//! can be parsed and re-rendered.

use std::io;
use std::path::Path;

use crate::error::MetadataError;
use crate::sddl::{SddlError, SecurityDescriptor};
use crate::translator::SecurityDescriptorTranslator;

/// Translator that cannot fetch descriptors.
#[derive(Clone, Copy, Debug, Default)]
pub struct HostTranslator;

impl HostTranslator {
    /// Creates the translator.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

/// Security descriptors cannot be read on this host.
#[must_use]
pub const fn is_supported() -> bool {
    false
}

impl SecurityDescriptorTranslator for HostTranslator {
    fn fetch(&self, path: &Path) -> Result<Vec<u8>, MetadataError> {
        Err(MetadataError::new(
            "read security descriptor",
            path,
            io::Error::new(
                io::ErrorKind::Unsupported,
                "security descriptors are not available on this platform",
            ),
        ))
    }

    fn binary_to_string(&self, raw: &[u8]) -> Result<String, SddlError> {
        SecurityDescriptor::from_self_relative(raw).map(|descriptor| descriptor.to_string())
    }
}
