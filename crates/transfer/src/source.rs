//! crates/transfer/src/source.rs
//!
//! Capability-tagged descriptions of a transfer's source.
//!
//! Every provider names its source through
//! [`SourceInfoProvider::raw_source`]. Richer views are optional and probed
//! with the `as_*` queries, which return `None` when the source lacks the
//! capability. A missing capability steers routing; it is never an error.

use std::fmt;
use std::fs::File;
use std::path::{Path, PathBuf};

use metadata::{
    HostTranslator, LocalOpener, MetadataError, SecurityDescriptorTranslator, SmbProperties,
    host_opener, portable_security_descriptor, read_smb_properties,
    security_descriptors_supported,
};

use crate::blob_type::BlobType;
use crate::error::SourceInfoError;

/// Optional views a source may expose.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Capability {
    /// The source is a blob with a known storage representation.
    NativeRepresentation,
    /// Creation time, last-write time and attribute flags.
    SmbProperties,
    /// Owner, group and DACL as portable SDDL.
    SecurityDescriptor,
    /// The host needs a special open call for this source.
    CustomOpener,
}

impl Capability {
    /// Every capability, in rendering order.
    pub const ALL: [Self; 4] = [
        Self::NativeRepresentation,
        Self::SmbProperties,
        Self::SecurityDescriptor,
        Self::CustomOpener,
    ];

    const fn bit(self) -> u8 {
        match self {
            Self::NativeRepresentation => 1 << 0,
            Self::SmbProperties => 1 << 1,
            Self::SecurityDescriptor => 1 << 2,
            Self::CustomOpener => 1 << 3,
        }
    }

    /// Name used in diagnostics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NativeRepresentation => "NativeRepresentation",
            Self::SmbProperties => "SmbProperties",
            Self::SecurityDescriptor => "SecurityDescriptor",
            Self::CustomOpener => "CustomOpener",
        }
    }
}

/// Set of [`Capability`] values.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct CapabilitySet(u8);

impl CapabilitySet {
    /// No capabilities.
    pub const EMPTY: Self = Self(0);

    /// Adds a capability.
    #[must_use]
    pub const fn with(self, capability: Capability) -> Self {
        Self(self.0 | capability.bit())
    }

    /// Adds `capability` when `present` is true.
    #[must_use]
    pub const fn with_if(self, capability: Capability, present: bool) -> Self {
        if present { self.with(capability) } else { self }
    }

    /// Checks membership.
    #[must_use]
    pub const fn contains(self, capability: Capability) -> bool {
        self.0 & capability.bit() != 0
    }

    /// Returns `true` when the set is empty.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Members in [`Capability::ALL`] order.
    pub fn iter(self) -> impl Iterator<Item = Capability> {
        Capability::ALL.into_iter().filter(move |capability| self.contains(*capability))
    }
}

impl fmt::Display for CapabilitySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("none");
        }
        for (index, capability) in self.iter().enumerate() {
            if index > 0 {
                f.write_str("|")?;
            }
            f.write_str(capability.as_str())?;
        }
        Ok(())
    }
}

/// Blob sources report the representation they are stored as.
pub trait NativeRepresentation: Send + Sync {
    /// Storage representation of the source blob.
    fn blob_type(&self) -> BlobType;
}

/// Sources that can report SMB properties.
pub trait SmbPropertySource: Send + Sync {
    /// Reads creation time, last-write time and attribute flags.
    fn smb_properties(&self) -> Result<SmbProperties, SourceInfoError>;
}

/// Sources that can report a security descriptor.
pub trait SecurityDescriptorSource: Send + Sync {
    /// Reads owner, group and DACL as portable SDDL.
    ///
    /// # Panics
    ///
    /// Panics when the host translator cannot reproduce its own rendering;
    /// see [`metadata::verify_round_trip`].
    fn portable_sddl(&self) -> Result<String, SourceInfoError>;
}

/// Sources that must be opened with host-specific flags.
pub trait CustomOpener: Send + Sync {
    /// Opens the source for reading.
    fn open(&self) -> Result<File, SourceInfoError>;
}

/// Description of a transfer's source.
pub trait SourceInfoProvider: Send + Sync {
    /// Source identifier, for diagnostics only.
    fn raw_source(&self) -> &str;

    /// Native storage representation, for blob sources that know it.
    fn as_native_representation(&self) -> Option<&dyn NativeRepresentation> {
        None
    }

    /// SMB property view.
    fn as_smb_properties(&self) -> Option<&dyn SmbPropertySource> {
        None
    }

    /// Security descriptor view.
    fn as_security_descriptor(&self) -> Option<&dyn SecurityDescriptorSource> {
        None
    }

    /// Host-specific opener.
    fn as_custom_opener(&self) -> Option<&dyn CustomOpener> {
        None
    }

    /// Capabilities this provider exposes, derived from the `as_*` queries.
    fn capabilities(&self) -> CapabilitySet {
        CapabilitySet::EMPTY
            .with_if(Capability::NativeRepresentation, self.as_native_representation().is_some())
            .with_if(Capability::SmbProperties, self.as_smb_properties().is_some())
            .with_if(Capability::SecurityDescriptor, self.as_security_descriptor().is_some())
            .with_if(Capability::CustomOpener, self.as_custom_opener().is_some())
    }
}

impl fmt::Debug for dyn SourceInfoProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceInfoProvider")
            .field("raw_source", &self.raw_source())
            .field("capabilities", &format_args!("{}", self.capabilities()))
            .finish()
    }
}

/// A blob in another account or container.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RemoteBlobSource {
    raw_source: String,
    blob_type: Option<BlobType>,
}

impl RemoteBlobSource {
    /// Creates a source whose representation is not known.
    pub fn new(raw_source: impl Into<String>) -> Self {
        Self {
            raw_source: raw_source.into(),
            blob_type: None,
        }
    }

    /// Records the representation reported by the service.
    /// [`BlobType::Detect`] clears it.
    #[must_use]
    pub fn with_blob_type(mut self, blob_type: BlobType) -> Self {
        self.blob_type = Some(blob_type).filter(|kind| !kind.is_detect());
        self
    }

    /// Records the representation from the service's blob type header.
    #[must_use]
    pub fn with_service_header(mut self, header: Option<&str>) -> Self {
        self.blob_type = header.and_then(BlobType::from_service_header);
        self
    }
}

impl NativeRepresentation for RemoteBlobSource {
    fn blob_type(&self) -> BlobType {
        self.blob_type.unwrap_or(BlobType::Detect)
    }
}

impl SourceInfoProvider for RemoteBlobSource {
    fn raw_source(&self) -> &str {
        &self.raw_source
    }

    fn as_native_representation(&self) -> Option<&dyn NativeRepresentation> {
        self.blob_type.map(|_| self as &dyn NativeRepresentation)
    }
}

/// An object in a non-blob remote store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RemoteUrlSource {
    raw_source: String,
}

impl RemoteUrlSource {
    /// Creates the source.
    pub fn new(raw_source: impl Into<String>) -> Self {
        Self {
            raw_source: raw_source.into(),
        }
    }
}

impl SourceInfoProvider for RemoteUrlSource {
    fn raw_source(&self) -> &str {
        &self.raw_source
    }
}

/// A file or directory on the local filesystem.
///
/// SMB properties are available everywhere. Security descriptors are
/// available where the host has a translator (Linux CIFS mounts, Windows),
/// and a custom opener where the host requires one (Windows).
pub struct LocalFileSource {
    raw_source: String,
    path: PathBuf,
    translator: Option<Box<dyn SecurityDescriptorTranslator>>,
    opener: Option<&'static dyn LocalOpener>,
}

impl LocalFileSource {
    /// Describes `path` using the host's translator and opener.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let translator: Option<Box<dyn SecurityDescriptorTranslator>> =
            security_descriptors_supported().then(|| Box::new(HostTranslator::new()) as _);
        Self {
            raw_source: path.display().to_string(),
            path,
            translator,
            opener: host_opener(),
        }
    }

    /// Replaces the security descriptor translator.
    #[must_use]
    pub fn with_translator(mut self, translator: impl SecurityDescriptorTranslator + 'static) -> Self {
        self.translator = Some(Box::new(translator));
        self
    }

    /// Drops the security descriptor capability.
    #[must_use]
    pub fn without_translator(mut self) -> Self {
        self.translator = None;
        self
    }

    /// Local path of the source.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn wrap(&self, operation: &'static str) -> impl FnOnce(MetadataError) -> SourceInfoError + '_ {
        move |error| SourceInfoError::new(self.raw_source.clone(), operation, error)
    }
}

impl fmt::Debug for LocalFileSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalFileSource")
            .field("path", &self.path)
            .field("translator", &self.translator.is_some())
            .field("opener", &self.opener.is_some())
            .finish()
    }
}

impl SmbPropertySource for LocalFileSource {
    fn smb_properties(&self) -> Result<SmbProperties, SourceInfoError> {
        read_smb_properties(&self.path).map_err(self.wrap("read SMB properties"))
    }
}

impl SecurityDescriptorSource for LocalFileSource {
    fn portable_sddl(&self) -> Result<String, SourceInfoError> {
        let translator = self.translator.as_deref().ok_or_else(|| {
            self.wrap("read security descriptor")(MetadataError::new(
                "read security descriptor",
                &self.path,
                std::io::Error::from(std::io::ErrorKind::Unsupported),
            ))
        })?;
        portable_security_descriptor(translator, &self.path)
            .map_err(self.wrap("read security descriptor"))
    }
}

impl CustomOpener for LocalFileSource {
    fn open(&self) -> Result<File, SourceInfoError> {
        let opener = self.opener.unwrap_or(&StdOpener);
        opener
            .open(&self.path)
            .map_err(|error| MetadataError::new("open file", &self.path, error))
            .map_err(self.wrap("open source"))
    }
}

/// Plain [`File::open`], used when a provider carries no host opener.
struct StdOpener;

impl LocalOpener for StdOpener {
    fn open(&self, path: &Path) -> std::io::Result<File> {
        File::open(path)
    }
}

impl SourceInfoProvider for LocalFileSource {
    fn raw_source(&self) -> &str {
        &self.raw_source
    }

    fn as_smb_properties(&self) -> Option<&dyn SmbPropertySource> {
        Some(self)
    }

    fn as_security_descriptor(&self) -> Option<&dyn SecurityDescriptorSource> {
        self.translator.as_ref().map(|_| self as &dyn SecurityDescriptorSource)
    }

    fn as_custom_opener(&self) -> Option<&dyn CustomOpener> {
        self.opener.map(|_| self as &dyn CustomOpener)
    }
}
