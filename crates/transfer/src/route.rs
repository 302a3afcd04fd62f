//! crates/transfer/src/route.rs
//!
//! Turning a [`TransferDescriptor`] into a sender.
//!
//! Resolution runs in three steps:
//!
//! 1. destinations on the hierarchical endpoint are rewritten onto the flat
//!    endpoint by the [`EndpointNormalizer`];
//! 2. folder-property and symlink transfers pick their dedicated sender
//!    without consulting the blob type strategy;
//! 3. file transfers resolve a [`BlobType`] and pick the matching blob
//!    sender, falling back to block blobs if the strategy could not decide.
//!
//! The resolver holds no mutable state and may be shared between worker
//! threads. The only process-wide state touched is the endpoint notice
//! guard.

use std::sync::Arc;

use logging::{LogLevel, Notifier, StderrNotifier, TransferLog};
use tracing::debug;

use crate::blob_type::{BlobType, BlobTypeRequest, BlobTypeStrategy, DefaultBlobTypeResolver};
use crate::config::RouteConfig;
use crate::descriptor::{EntityType, TransferDescriptor};
use crate::endpoint::EndpointNormalizer;
use crate::error::RouteError;
use crate::location::Location;
use crate::sender::{SenderFactory, SenderKind, SenderRequest};

/// Target for route resolution events.
pub const ROUTE_TARGET: &str = "blobroute::route";

/// Selects and builds the sender for each transfer.
#[derive(Debug)]
pub struct RouteResolver<F, S = DefaultBlobTypeResolver> {
    factory: F,
    strategy: S,
    normalizer: EndpointNormalizer,
}

impl<F: SenderFactory> RouteResolver<F> {
    /// Resolver with default configuration, printing notices to stderr.
    pub fn new(factory: F) -> Self {
        Self::with_config(factory, &RouteConfig::default(), Arc::new(StderrNotifier))
    }

    /// Resolver using `config` for endpoint markers and inference, and
    /// `notifier` for operator notices.
    pub fn with_config(factory: F, config: &RouteConfig, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            factory,
            strategy: DefaultBlobTypeResolver::new(config.extensions().clone()),
            normalizer: EndpointNormalizer::new(config, notifier),
        }
    }
}

impl<F: SenderFactory, S: BlobTypeStrategy> RouteResolver<F, S> {
    /// Replaces the blob type strategy.
    #[must_use]
    pub fn with_strategy<T: BlobTypeStrategy>(self, strategy: T) -> RouteResolver<F, T> {
        RouteResolver {
            factory: self.factory,
            strategy,
            normalizer: self.normalizer,
        }
    }

    /// Replaces the endpoint normalizer.
    #[must_use]
    pub fn with_normalizer(mut self, normalizer: EndpointNormalizer) -> Self {
        self.normalizer = normalizer;
        self
    }

    /// Sender factory in use.
    pub const fn factory(&self) -> &F {
        &self.factory
    }

    /// Blob type strategy in use.
    pub const fn strategy(&self) -> &S {
        &self.strategy
    }

    /// Resolves `descriptor` into a sender.
    ///
    /// # Errors
    ///
    /// - [`RouteError::InvalidDestination`] when a hierarchical destination
    ///   does not parse as a URL.
    /// - [`RouteError::SenderConstruction`] when the factory fails.
    pub fn resolve(
        &self,
        descriptor: TransferDescriptor,
        log: &dyn TransferLog,
    ) -> Result<F::Sender, RouteError> {
        let source = descriptor.source();
        let from_to = descriptor.from_to();

        let destination = if from_to.to() == Location::BlobFs {
            self.normalizer.normalize(descriptor.destination())?
        } else {
            descriptor.destination().to_owned()
        };

        let (kind, blob_type) = match descriptor.entity_type() {
            EntityType::FolderProperties => (SenderKind::FolderProperties, None),
            EntityType::Symlink => (SenderKind::Symlink, None),
            EntityType::File => {
                let blob_type = self.resolve_blob_type(&descriptor, &destination, log);
                (SenderKind::for_blob_type(blob_type), Some(blob_type))
            }
        };

        debug!(
            target: ROUTE_TARGET,
            source = source.raw_source(),
            destination = %destination,
            from_to = %from_to,
            entity = %descriptor.entity_type(),
            sender = %kind,
            "selected sender"
        );

        let request = SenderRequest {
            source,
            destination: &destination,
            blob_type,
            from_to,
        };
        self.factory
            .create(kind, &request)
            .map_err(|error| RouteError::SenderConstruction {
                kind,
                raw_source: source.raw_source().to_owned(),
                destination: destination.clone(),
                message: error.to_string(),
            })
    }

    fn resolve_blob_type(
        &self,
        descriptor: &TransferDescriptor,
        destination: &str,
        log: &dyn TransferLog,
    ) -> BlobType {
        let source = descriptor.source();
        let resolved = self.strategy.resolve(&BlobTypeRequest {
            override_type: descriptor.blob_type_override(),
            source,
            destination,
            log,
        });

        if resolved.is_detect() {
            if log.should_log(LogLevel::Debug) {
                log.log_transfer_info(
                    LogLevel::Debug,
                    source.raw_source(),
                    destination,
                    "BlobType \"BlockBlob\" is used for destination blob by default.",
                );
            }
            return BlobType::Block;
        }

        if log.should_log(LogLevel::Debug) {
            log.log_transfer_info(
                LogLevel::Debug,
                source.raw_source(),
                destination,
                &format!("BlobType \"{resolved}\" is set for destination blob."),
            );
        }
        resolved
    }
}
