//! crates/transfer/src/descriptor.rs
//! Per-transfer input to route resolution.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use thiserror::Error;

use crate::blob_type::BlobType;
use crate::location::{FromTo, Location};
use crate::source::SourceInfoProvider;

/// What a transfer moves.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EntityType {
    /// File contents.
    #[default]
    File,
    /// Properties of a folder, without contents.
    FolderProperties,
    /// A symbolic link.
    Symlink,
}

impl EntityType {
    /// Name used in diagnostics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::File => "File",
            Self::FolderProperties => "FolderProperties",
            Self::Symlink => "Symlink",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when an entity type name is not recognised.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("unknown entity type '{0}'; expected File, FolderProperties or Symlink")]
pub struct ParseEntityTypeError(String);

impl FromStr for EntityType {
    type Err = ParseEntityTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [Self::File, Self::FolderProperties, Self::Symlink]
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ParseEntityTypeError(s.to_owned()))
    }
}

/// One scheduled transfer.
///
/// Built once by the scheduler and consumed by
/// [`RouteResolver::resolve`](crate::RouteResolver::resolve).
#[derive(Clone)]
pub struct TransferDescriptor {
    source: Arc<dyn SourceInfoProvider>,
    destination: String,
    entity_type: EntityType,
    blob_type_override: BlobType,
    from_to: FromTo,
}

impl TransferDescriptor {
    /// Describes a file transfer with no blob type override.
    pub fn new(source: Arc<dyn SourceInfoProvider>, destination: impl Into<String>, from_to: FromTo) -> Self {
        Self {
            source,
            destination: destination.into(),
            entity_type: EntityType::File,
            blob_type_override: BlobType::Detect,
            from_to,
        }
    }

    /// Sets what the transfer moves.
    #[must_use]
    pub const fn with_entity_type(mut self, entity_type: EntityType) -> Self {
        self.entity_type = entity_type;
        self
    }

    /// Sets the user's blob type; [`BlobType::Detect`] means none.
    #[must_use]
    pub const fn with_blob_type(mut self, blob_type: BlobType) -> Self {
        self.blob_type_override = blob_type;
        self
    }

    /// Source of the transfer.
    #[must_use]
    pub fn source(&self) -> &dyn SourceInfoProvider {
        self.source.as_ref()
    }

    /// Shared handle to the source.
    #[must_use]
    pub fn source_arc(&self) -> &Arc<dyn SourceInfoProvider> {
        &self.source
    }

    /// Destination endpoint as scheduled.
    #[must_use]
    pub fn destination(&self) -> &str {
        &self.destination
    }

    /// What the transfer moves.
    #[must_use]
    pub const fn entity_type(&self) -> EntityType {
        self.entity_type
    }

    /// User-specified blob type.
    #[must_use]
    pub const fn blob_type_override(&self) -> BlobType {
        self.blob_type_override
    }

    /// Location pair.
    #[must_use]
    pub const fn from_to(&self) -> FromTo {
        self.from_to
    }

    /// Destination location kind.
    #[must_use]
    pub const fn destination_location(&self) -> Location {
        self.from_to.to()
    }
}

impl fmt::Debug for TransferDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransferDescriptor")
            .field("source", &self.source.raw_source())
            .field("destination", &self.destination)
            .field("entity_type", &self.entity_type)
            .field("blob_type_override", &self.blob_type_override)
            .field("from_to", &self.from_to)
            .finish()
    }
}
