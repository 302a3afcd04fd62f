//! crates/transfer/src/sender.rs
//!
//! Sender selection and construction.
//!
//! The route resolver decides *which* sender a transfer needs; building it
//! is delegated to a [`SenderFactory`] owned by the job manager, one
//! constructor per [`SenderKind`].

use std::convert::Infallible;
use std::fmt;

use crate::blob_type::BlobType;
use crate::location::FromTo;
use crate::source::SourceInfoProvider;

/// Kind of sender selected for a transfer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SenderKind {
    /// Uploads a block blob.
    BlockBlob,
    /// Uploads an append blob.
    AppendBlob,
    /// Uploads a page blob.
    PageBlob,
    /// Writes folder properties only.
    FolderProperties,
    /// Writes a symbolic link.
    Symlink,
}

impl SenderKind {
    /// Sender for a resolved blob type. [`BlobType::Detect`] maps to
    /// [`SenderKind::BlockBlob`].
    #[must_use]
    pub const fn for_blob_type(blob_type: BlobType) -> Self {
        match blob_type {
            BlobType::Append => Self::AppendBlob,
            BlobType::Page => Self::PageBlob,
            BlobType::Block | BlobType::Detect => Self::BlockBlob,
        }
    }

    /// Name used in diagnostics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::BlockBlob => "BlockBlob",
            Self::AppendBlob => "AppendBlob",
            Self::PageBlob => "PageBlob",
            Self::FolderProperties => "FolderProperties",
            Self::Symlink => "Symlink",
        }
    }

    /// Returns `true` for the three blob upload senders.
    #[must_use]
    pub const fn is_blob(self) -> bool {
        matches!(self, Self::BlockBlob | Self::AppendBlob | Self::PageBlob)
    }
}

impl fmt::Display for SenderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything a sender constructor receives.
#[derive(Clone, Copy)]
pub struct SenderRequest<'a> {
    /// Source of the transfer.
    pub source: &'a dyn SourceInfoProvider,
    /// Destination after endpoint normalization.
    pub destination: &'a str,
    /// Resolved blob type; `None` for folder and symlink senders.
    pub blob_type: Option<BlobType>,
    /// Location pair of the transfer.
    pub from_to: FromTo,
}

impl fmt::Debug for SenderRequest<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SenderRequest")
            .field("source", &self.source.raw_source())
            .field("destination", &self.destination)
            .field("blob_type", &self.blob_type)
            .field("from_to", &self.from_to)
            .finish()
    }
}

/// Builds senders on behalf of the route resolver.
pub trait SenderFactory {
    /// Sender handed back to the job manager.
    type Sender;
    /// Construction failure, rendered into
    /// [`RouteError::SenderConstruction`](crate::RouteError::SenderConstruction).
    type Error: fmt::Display;

    /// Builds the sender of `kind` for `request`.
    ///
    /// # Errors
    ///
    /// Returns the factory's error when the sender cannot be built.
    fn create(&self, kind: SenderKind, request: &SenderRequest<'_>) -> Result<Self::Sender, Self::Error>;
}

impl<F: SenderFactory + ?Sized> SenderFactory for &F {
    type Sender = F::Sender;
    type Error = F::Error;

    fn create(&self, kind: SenderKind, request: &SenderRequest<'_>) -> Result<Self::Sender, Self::Error> {
        (**self).create(kind, request)
    }
}

/// Description of the sender a transfer would use.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SenderPlan {
    /// Selected sender.
    pub kind: SenderKind,
    /// Source identifier.
    pub raw_source: String,
    /// Destination after normalization.
    pub destination: String,
    /// Resolved blob type, for blob senders.
    pub blob_type: Option<BlobType>,
    /// Location pair of the transfer.
    pub from_to: FromTo,
}

impl fmt::Display for SenderPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} -> {} ({})", self.kind, self.raw_source, self.destination, self.from_to)
    }
}

/// Factory that records the plan instead of building a sender.
#[derive(Clone, Copy, Debug, Default)]
pub struct PlanFactory;

impl SenderFactory for PlanFactory {
    type Sender = SenderPlan;
    type Error = Infallible;

    fn create(&self, kind: SenderKind, request: &SenderRequest<'_>) -> Result<SenderPlan, Infallible> {
        Ok(SenderPlan {
            kind,
            raw_source: request.source.raw_source().to_owned(),
            destination: request.destination.to_owned(),
            blob_type: request.blob_type,
            from_to: request.from_to,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::location::Location;
    use crate::source::RemoteUrlSource;

    #[test]
    fn blob_types_map_to_senders() {
        assert_eq!(SenderKind::for_blob_type(BlobType::Block), SenderKind::BlockBlob);
        assert_eq!(SenderKind::for_blob_type(BlobType::Append), SenderKind::AppendBlob);
        assert_eq!(SenderKind::for_blob_type(BlobType::Page), SenderKind::PageBlob);
        assert_eq!(SenderKind::for_blob_type(BlobType::Detect), SenderKind::BlockBlob);
        assert!(!SenderKind::Symlink.is_blob());
    }

    #[test]
    fn plan_factory_records_request() {
        let source = RemoteUrlSource::new("s3://bucket/a.vhd");
        let request = SenderRequest {
            source: &source,
            destination: "https://acct.blob.core.windows.net/c/a.vhd",
            blob_type: Some(BlobType::Page),
            from_to: FromTo::new(Location::OtherRemote, Location::Blob),
        };
        let Ok(plan) = PlanFactory.create(SenderKind::PageBlob, &request);
        assert_eq!(plan.kind, SenderKind::PageBlob);
        assert_eq!(plan.blob_type, Some(BlobType::Page));
        assert_eq!(
            plan.to_string(),
            "PageBlob s3://bucket/a.vhd -> https://acct.blob.core.windows.net/c/a.vhd (OtherRemoteBlob)"
        );
    }
}
