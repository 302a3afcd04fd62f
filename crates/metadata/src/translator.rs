//! crates/metadata/src/translator.rs
//!
//! Host-independent half of security descriptor extraction.
//!
//! Each host OS supplies a [`SecurityDescriptorTranslator`] (see
//! `translator_linux.rs`, `translator_windows.rs` and the stub for every
//! other target). [`portable_security_descriptor`] drives it: fetch the raw
//! descriptor, render it as SDDL, parse that text back and check that
//! nothing was lost, then expand aliases into the portable form.
//!
//! A translator that cannot reproduce its own output is a defect in this
//! crate, not in the file being copied, so the fidelity check panics instead
//! of returning an error. Everything that depends on the file (missing
//! attribute, permission denied, malformed bytes) is a recoverable
//! [`MetadataError`].

use std::fmt;
use std::path::Path;

use tracing::debug;

use crate::error::MetadataError;
use crate::sddl::{SddlError, SecurityDescriptor, Sid};

/// Tracing target for metadata extraction.
pub const METADATA_TARGET: &str = "blobroute::metadata";

/// Which parts of a security descriptor are requested from the host.
///
/// Values mirror the `*_SECURITY_INFORMATION` bits used by Windows.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct SecurityInformation(u32);

impl SecurityInformation {
    /// Owner SID.
    pub const OWNER: Self = Self(0x0000_0001);
    /// Primary group SID.
    pub const GROUP: Self = Self(0x0000_0002);
    /// Discretionary ACL.
    pub const DACL: Self = Self(0x0000_0004);

    /// Raw bit value.
    #[must_use]
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Union of two selections.
    #[must_use]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// Returns `true` when every bit of `other` is selected.
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl fmt::Display for SecurityInformation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// Owner, group and DACL: everything a file share stores, nothing that
/// needs audit privileges.
pub const SECURITY_INFORMATION: SecurityInformation = SecurityInformation::OWNER
    .union(SecurityInformation::GROUP)
    .union(SecurityInformation::DACL);

/// Per-OS access to file security descriptors.
pub trait SecurityDescriptorTranslator: Send + Sync {
    /// Reads the raw self-relative descriptor of `path`, restricted to
    /// [`SECURITY_INFORMATION`].
    fn fetch(&self, path: &Path) -> Result<Vec<u8>, MetadataError>;

    /// Renders a raw descriptor as SDDL text.
    fn binary_to_string(&self, raw: &[u8]) -> Result<String, SddlError>;

    /// Parses SDDL text into its structured form.
    fn parse(&self, text: &str) -> Result<SecurityDescriptor, SddlError> {
        text.parse()
    }

    /// Expands a parsed descriptor into its portable form.
    ///
    /// The default cannot expand domain-relative aliases; hosts that know
    /// their domain override [`resolve_alias`](Self::resolve_alias).
    fn portable_string(&self, descriptor: &SecurityDescriptor) -> Result<String, SddlError> {
        descriptor.to_portable_string_with(&|alias| self.resolve_alias(alias))
    }

    /// Resolves a machine- or domain-relative alias such as `DA` to a SID.
    fn resolve_alias(&self, _alias: &str) -> Option<Sid> {
        None
    }
}

/// Reads the security descriptor of `path` and returns its portable SDDL
/// form.
///
/// # Panics
///
/// Panics when the translator cannot parse its own rendering of the
/// descriptor, or when the parsed form does not render back to the same
/// text.
pub fn portable_security_descriptor<T>(translator: &T, path: &Path) -> Result<String, MetadataError>
where
    T: SecurityDescriptorTranslator + ?Sized,
{
    let raw = translator.fetch(path)?;
    let text = translator
        .binary_to_string(&raw)
        .map_err(|error| MetadataError::new("decode security descriptor", path, error.into()))?;
    let descriptor = verify_round_trip(translator, &text);
    let portable = translator
        .portable_string(&descriptor)
        .map_err(|error| MetadataError::new("expand security descriptor", path, error.into()))?;
    debug!(
        target: METADATA_TARGET,
        path = %path.display(),
        info = %SECURITY_INFORMATION,
        sddl = %portable,
        "read security descriptor"
    );
    Ok(portable)
}

/// Parses `text` with `translator` and checks that it renders back to the
/// same string, ignoring surrounding whitespace.
///
/// # Panics
///
/// Panics when parsing fails or the rendering differs.
pub fn verify_round_trip<T>(translator: &T, text: &str) -> SecurityDescriptor
where
    T: SecurityDescriptorTranslator + ?Sized,
{
    let descriptor = match translator.parse(text) {
        Ok(descriptor) => descriptor,
        Err(error) => panic!("security descriptor rendered by this host does not parse: {error}: {text}"),
    };
    let rendered = descriptor.to_string();
    assert!(
        rendered.trim() == text.trim(),
        "security descriptor round trip changed the text: {} became {}",
        text.trim(),
        rendered.trim()
    );
    descriptor
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    /// Translator backed by fixed bytes, using the crate's own codec.
    struct Fixed(Result<Vec<u8>, io::ErrorKind>);

    impl SecurityDescriptorTranslator for Fixed {
        fn fetch(&self, path: &Path) -> Result<Vec<u8>, MetadataError> {
            self.0
                .clone()
                .map_err(|kind| MetadataError::new("read security descriptor", path, kind.into()))
        }

        fn binary_to_string(&self, raw: &[u8]) -> Result<String, SddlError> {
            SecurityDescriptor::from_self_relative(raw).map(|sd| sd.to_string())
        }
    }

    /// Translator whose renderer disagrees with the parser.
    struct Lossy;

    impl SecurityDescriptorTranslator for Lossy {
        fn fetch(&self, _path: &Path) -> Result<Vec<u8>, MetadataError> {
            Ok(Vec::new())
        }

        fn binary_to_string(&self, _raw: &[u8]) -> Result<String, SddlError> {
            // Repeated ACE flag; the parser rejects it.
            Ok("O:SYD:(A;OIOI;FA;;;SY)".to_owned())
        }
    }

    /// Translator that normalises spelling while parsing.
    struct Normalising;

    impl SecurityDescriptorTranslator for Normalising {
        fn fetch(&self, _path: &Path) -> Result<Vec<u8>, MetadataError> {
            Ok(Vec::new())
        }

        fn binary_to_string(&self, _raw: &[u8]) -> Result<String, SddlError> {
            Ok("O:SYD:(A;;FA;;;SY)".to_owned())
        }

        fn parse(&self, _text: &str) -> Result<SecurityDescriptor, SddlError> {
            "O:BAD:(A;;FA;;;SY)".parse()
        }
    }

    fn sample_binary() -> Vec<u8> {
        let descriptor: SecurityDescriptor = "O:BAG:SYD:PAI(A;OICI;FA;;;SY)(A;;0x1200a9;;;BU)"
            .parse()
            .expect("parse sample");
        descriptor.to_self_relative(&|_| None).expect("encode sample")
    }

    #[test]
    fn selection_is_owner_group_dacl() {
        assert_eq!(SECURITY_INFORMATION.bits(), 0x7);
        assert!(SECURITY_INFORMATION.contains(SecurityInformation::DACL));
        assert_eq!(SECURITY_INFORMATION.to_string(), "0x7");
    }

    #[test]
    fn portable_descriptor_from_binary() {
        let translator = Fixed(Ok(sample_binary()));
        let portable = portable_security_descriptor(&translator, Path::new("/share/a.txt"))
            .expect("portable descriptor");
        assert_eq!(
            portable,
            "O:S-1-5-32-544G:S-1-5-18D:PAI(A;OICI;FA;;;S-1-5-18)(A;;0x1200a9;;;S-1-5-32-545)"
        );
    }

    #[test]
    fn fetch_failure_is_recoverable() {
        let translator = Fixed(Err(io::ErrorKind::PermissionDenied));
        let error = portable_security_descriptor(&translator, Path::new("/share/locked"))
            .expect_err("fetch should fail");
        assert_eq!(error.kind(), io::ErrorKind::PermissionDenied);
        assert_eq!(error.path(), Path::new("/share/locked"));
    }

    #[test]
    fn malformed_binary_is_recoverable() {
        let translator = Fixed(Ok(vec![1, 0, 0, 0x80]));
        let error = portable_security_descriptor(&translator, Path::new("/share/odd"))
            .expect_err("decode should fail");
        assert_eq!(error.kind(), io::ErrorKind::InvalidData);
        assert_eq!(error.context(), "decode security descriptor");
    }

    #[test]
    #[should_panic(expected = "does not parse")]
    fn unparsable_own_output_panics() {
        let _ = portable_security_descriptor(&Lossy, Path::new("/share/a"));
    }

    #[test]
    #[should_panic(expected = "round trip changed the text")]
    fn round_trip_mismatch_panics() {
        let _ = portable_security_descriptor(&Normalising, Path::new("/share/a"));
    }

    #[test]
    fn round_trip_ignores_surrounding_whitespace() {
        let translator = Fixed(Ok(Vec::new()));
        let descriptor = verify_round_trip(&translator, "  O:SYD:(A;;FA;;;SY)\r\n");
        assert_eq!(descriptor.to_string(), "O:SYD:(A;;FA;;;SY)");
    }
}
