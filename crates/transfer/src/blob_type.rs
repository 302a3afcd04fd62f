//! crates/transfer/src/blob_type.rs
//!
//! Choosing the storage representation of a destination blob.
//!
//! Resolution is priority ordered and the first rule that applies wins:
//!
//! 1. an explicit user override (anything but [`BlobType::Detect`]);
//! 2. the native representation of a blob source, copied verbatim;
//! 3. the destination file extension, looked up in an [`ExtensionTable`],
//!    with [`BlobType::Block`] for anything the table does not map.
//!
//! The result is never [`BlobType::Detect`].

use std::fmt;
use std::str::FromStr;

use logging::{LogLevel, TransferLog};
use rustc_hash::FxHashMap;
use thiserror::Error;

use crate::source::SourceInfoProvider;

/// Storage representation of a destination blob.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BlobType {
    /// Let the resolver decide.
    #[default]
    Detect,
    /// Block blob; the general-purpose default.
    Block,
    /// Append-only blob.
    Append,
    /// Page blob for random-access disk images.
    Page,
}

impl BlobType {
    /// User-facing and service-facing name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Detect => "Detect",
            Self::Block => "BlockBlob",
            Self::Append => "AppendBlob",
            Self::Page => "PageBlob",
        }
    }

    /// Maps the service's blob type header to a concrete type. Anything else
    /// means the source has no usable native representation.
    #[must_use]
    pub fn from_service_header(value: &str) -> Option<Self> {
        match value {
            "BlockBlob" => Some(Self::Block),
            "AppendBlob" => Some(Self::Append),
            "PageBlob" => Some(Self::Page),
            _ => None,
        }
    }

    /// Returns `true` for [`BlobType::Detect`].
    #[must_use]
    pub const fn is_detect(self) -> bool {
        matches!(self, Self::Detect)
    }
}

impl fmt::Display for BlobType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a blob type name is not recognised.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("unknown blob type '{0}'; expected Detect, BlockBlob, AppendBlob or PageBlob")]
pub struct ParseBlobTypeError(String);

impl FromStr for BlobType {
    type Err = ParseBlobTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [Self::Detect, Self::Block, Self::Append, Self::Page]
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ParseBlobTypeError(s.to_owned()))
    }
}

/// Extension to blob type policy used for inference.
///
/// Keys are stored lower-case without the leading dot; lookups are
/// case-insensitive.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ExtensionTable {
    entries: FxHashMap<String, BlobType>,
}

impl Default for ExtensionTable {
    /// Virtual hard disk images (`.vhd`, `.vhdx`) become page blobs.
    fn default() -> Self {
        Self::empty().with("vhd", BlobType::Page).with("vhdx", BlobType::Page)
    }
}

impl ExtensionTable {
    /// A table that maps nothing; every inference yields [`BlobType::Block`].
    #[must_use]
    pub fn empty() -> Self {
        Self {
            entries: FxHashMap::default(),
        }
    }

    /// Adds or replaces a mapping. A leading dot on `extension` is ignored.
    /// Mapping to [`BlobType::Detect`] removes the extension instead.
    #[must_use]
    pub fn with(mut self, extension: &str, blob_type: BlobType) -> Self {
        self.insert(extension, blob_type);
        self
    }

    /// In-place form of [`with`](Self::with).
    pub fn insert(&mut self, extension: &str, blob_type: BlobType) {
        let key = extension.trim_start_matches('.').to_ascii_lowercase();
        if blob_type.is_detect() {
            self.entries.remove(&key);
        } else {
            self.entries.insert(key, blob_type);
        }
    }

    /// Looks up an extension (without the dot).
    #[must_use]
    pub fn lookup(&self, extension: &str) -> Option<BlobType> {
        self.entries.get(&extension.to_ascii_lowercase()).copied()
    }

    /// Number of mapped extensions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` when nothing is mapped.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Infers the blob type for a destination URL or path from the extension
    /// of its final segment.
    #[must_use]
    pub fn infer(&self, destination: &str) -> BlobType {
        file_extension(destination)
            .and_then(|extension| self.lookup(extension))
            .unwrap_or(BlobType::Block)
    }
}

/// Extension of the last path segment, ignoring any query or fragment.
/// Dot-files such as `.bashrc` and names ending in a dot have none.
fn file_extension(destination: &str) -> Option<&str> {
    let path = destination
        .split(['?', '#'])
        .next()
        .unwrap_or(destination);
    let name = path.rsplit(['/', '\\']).next().unwrap_or(path);
    match name.rfind('.') {
        Some(0) | None => None,
        Some(dot) => Some(&name[dot + 1..]).filter(|extension| !extension.is_empty()),
    }
}

/// Inputs to blob type resolution.
pub struct BlobTypeRequest<'a> {
    /// User-specified representation; [`BlobType::Detect`] when absent.
    pub override_type: BlobType,
    /// Source of the transfer.
    pub source: &'a dyn SourceInfoProvider,
    /// Destination endpoint after normalization.
    pub destination: &'a str,
    /// Per-transfer log sink.
    pub log: &'a dyn TransferLog,
}

impl fmt::Debug for BlobTypeRequest<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlobTypeRequest")
            .field("override_type", &self.override_type)
            .field("source", &self.source.raw_source())
            .field("destination", &self.destination)
            .finish_non_exhaustive()
    }
}

/// Strategy computing the destination blob type.
pub trait BlobTypeStrategy: Send + Sync {
    /// Resolves the blob type for one transfer. Implementations should never
    /// return [`BlobType::Detect`]; the route resolver treats it as block.
    fn resolve(&self, request: &BlobTypeRequest<'_>) -> BlobType;
}

/// The override, native, extension resolution order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DefaultBlobTypeResolver {
    extensions: ExtensionTable,
}

impl DefaultBlobTypeResolver {
    /// Creates a resolver inferring from `extensions`.
    #[must_use]
    pub const fn new(extensions: ExtensionTable) -> Self {
        Self { extensions }
    }

    /// Extension table in use.
    #[must_use]
    pub const fn extensions(&self) -> &ExtensionTable {
        &self.extensions
    }
}

impl BlobTypeStrategy for DefaultBlobTypeResolver {
    fn resolve(&self, request: &BlobTypeRequest<'_>) -> BlobType {
        let BlobTypeRequest {
            override_type,
            source,
            destination,
            log,
        } = *request;

        if !override_type.is_detect() {
            if log.should_log(LogLevel::Info) {
                log.log_transfer_info(
                    LogLevel::Info,
                    source.raw_source(),
                    destination,
                    &format!("BlobType has been explicitly set to \"{override_type}\" for destination blob."),
                );
            }
            return override_type;
        }

        let resolved = source
            .as_native_representation()
            .map(|native| native.blob_type())
            .filter(|native| !native.is_detect())
            .unwrap_or_else(|| self.extensions.infer(destination));

        if resolved != BlobType::Block && log.should_log(LogLevel::Info) {
            log.log_transfer_info(
                LogLevel::Info,
                source.raw_source(),
                destination,
                &format!("Autodetected {} blob type as {resolved}.", source.raw_source()),
            );
        }
        resolved
    }
}
