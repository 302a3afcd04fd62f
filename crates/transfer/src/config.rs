//! crates/transfer/src/config.rs
//! Options that shape route resolution.

use std::borrow::Cow;

use crate::blob_type::{BlobType, ExtensionTable};

/// Host marker of the hierarchical-namespace endpoint.
pub const DEFAULT_HIERARCHICAL_MARKER: &str = ".dfs";

/// Host marker of the flat blob endpoint.
pub const DEFAULT_FLAT_MARKER: &str = ".blob";

/// Options controlling endpoint normalization and blob type inference.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct RouteConfig {
    hierarchical_marker: Cow<'static, str>,
    flat_marker: Cow<'static, str>,
    extension_table: ExtensionTable,
}

impl Default for RouteConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl RouteConfig {
    /// Creates a configuration with the `.dfs` to `.blob` rewrite and the
    /// default extension table.
    #[must_use]
    pub fn new() -> Self {
        Self {
            hierarchical_marker: Cow::Borrowed(DEFAULT_HIERARCHICAL_MARKER),
            flat_marker: Cow::Borrowed(DEFAULT_FLAT_MARKER),
            extension_table: ExtensionTable::default(),
        }
    }

    /// Sets the host marker that identifies the hierarchical endpoint.
    #[must_use]
    pub fn hierarchical_marker(mut self, marker: impl Into<Cow<'static, str>>) -> Self {
        self.hierarchical_marker = marker.into();
        self
    }

    /// Sets the host marker that replaces the hierarchical one.
    #[must_use]
    pub fn flat_marker(mut self, marker: impl Into<Cow<'static, str>>) -> Self {
        self.flat_marker = marker.into();
        self
    }

    /// Replaces the extension table used for inference.
    #[must_use]
    pub fn extension_table(mut self, table: ExtensionTable) -> Self {
        self.extension_table = table;
        self
    }

    /// Adds one extension mapping to the current table.
    #[must_use]
    pub fn map_extension(mut self, extension: &str, blob_type: BlobType) -> Self {
        self.extension_table.insert(extension, blob_type);
        self
    }

    /// Hierarchical endpoint marker.
    #[must_use]
    pub fn hierarchical(&self) -> &str {
        &self.hierarchical_marker
    }

    /// Flat endpoint marker.
    #[must_use]
    pub fn flat(&self) -> &str {
        &self.flat_marker
    }

    /// Extension table used for inference.
    #[must_use]
    pub const fn extensions(&self) -> &ExtensionTable {
        &self.extension_table
    }
}
