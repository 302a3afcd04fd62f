#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![cfg_attr(docsrs, feature(doc_cfg))]
//! crates/transfer/src/lib.rs
//!
//! Route resolution for blob transfers.
//!
//! Given a scheduled [`TransferDescriptor`], [`RouteResolver`] picks the
//! sender that will move the data and hands construction to the job
//! manager's [`SenderFactory`].
//!
//! # Resolution
//!
//! 1. Destinations on the hierarchical (`.dfs`) endpoint are rewritten onto
//!    the flat (`.blob`) endpoint by [`EndpointNormalizer`]. The first
//!    rewrite in the process prints a one-time notice.
//! 2. Folder-property and symlink transfers get their dedicated senders.
//! 3. File transfers resolve a [`BlobType`]: an explicit override wins, then
//!    the native type of a blob source, then the destination extension via
//!    [`ExtensionTable`]. Anything unmapped becomes a block blob.
//!
//! # Sources
//!
//! Sources implement [`SourceInfoProvider`]. Beyond a raw identifier they
//! expose optional capabilities, probed with `as_*` queries returning
//! `Option<&dyn ...>`: native blob type, SMB properties, security descriptor
//! and custom opener. [`LocalFileSource`] backs the last three with the
//! `metadata` crate.
//!
//! # Errors
//!
//! [`RouteError`] is fatal for one transfer and never retried.
//! [`SourceInfoError`] reports a capability that was present but could not be
//! read.
//!
//! # Examples
//!
//! ```
//! use std::sync::Arc;
//!
//! use logging::{LogLevel, TracingTransferLog};
//! use transfer::{
//!     FromTo, Location, PlanFactory, RemoteUrlSource, RouteResolver, SenderKind,
//!     TransferDescriptor,
//! };
//!
//! let resolver = RouteResolver::new(PlanFactory);
//! let descriptor = TransferDescriptor::new(
//!     Arc::new(RemoteUrlSource::new("s3://bucket/disk.vhd")),
//!     "https://acct.blob.core.windows.net/images/disk.vhd",
//!     FromTo::new(Location::OtherRemote, Location::Blob),
//! );
//! let plan = resolver
//!     .resolve(descriptor, &TracingTransferLog::new(LogLevel::Info))
//!     .unwrap();
//! assert_eq!(plan.kind, SenderKind::PageBlob);
//! ```

mod blob_type;
mod config;
mod descriptor;
mod endpoint;
mod error;
mod location;
mod route;
mod sender;
mod source;

pub use blob_type::{
    BlobType, BlobTypeRequest, BlobTypeStrategy, DefaultBlobTypeResolver, ExtensionTable,
    ParseBlobTypeError,
};
pub use config::{DEFAULT_FLAT_MARKER, DEFAULT_HIERARCHICAL_MARKER, RouteConfig};
pub use descriptor::{EntityType, ParseEntityTypeError, TransferDescriptor};
pub use endpoint::{BLOB_ENDPOINT_NOTICE, BLOB_ENDPOINT_NOTICE_TEXT, ENDPOINT_TARGET, EndpointNormalizer};
pub use error::{RouteError, SourceInfoError};
pub use location::{FromTo, Location};
pub use route::{ROUTE_TARGET, RouteResolver};
pub use sender::{PlanFactory, SenderFactory, SenderKind, SenderPlan, SenderRequest};
pub use source::{
    Capability, CapabilitySet, CustomOpener, LocalFileSource, NativeRepresentation,
    RemoteBlobSource, RemoteUrlSource, SecurityDescriptorSource, SmbPropertySource,
    SourceInfoProvider,
};
