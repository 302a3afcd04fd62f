//! crates/transfer/src/location.rs
//! Endpoint kinds and the source/destination pair of a transfer.

use std::fmt;

/// Kind of endpoint a transfer reads from or writes to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Location {
    /// Flat blob endpoint (`*.blob.*`).
    Blob,
    /// Hierarchical-namespace endpoint (`*.dfs.*`) fronting the same account.
    BlobFs,
    /// Local filesystem.
    Local,
    /// Any other remote object store.
    OtherRemote,
}

impl Location {
    /// Name used in diagnostics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Blob => "Blob",
            Self::BlobFs => "BlobFS",
            Self::Local => "Local",
            Self::OtherRemote => "OtherRemote",
        }
    }

    /// Returns `true` for endpoints outside the local machine.
    #[must_use]
    pub const fn is_remote(self) -> bool {
        !matches!(self, Self::Local)
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Source and destination endpoint kinds of one transfer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FromTo {
    from: Location,
    to: Location,
}

impl FromTo {
    /// Pairs a source and destination kind.
    #[must_use]
    pub const fn new(from: Location, to: Location) -> Self {
        Self { from, to }
    }

    /// Source kind.
    #[must_use]
    pub const fn from(self) -> Location {
        self.from
    }

    /// Destination kind.
    #[must_use]
    pub const fn to(self) -> Location {
        self.to
    }
}

impl fmt::Display for FromTo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.from, self.to)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_pair_without_separator() {
        assert_eq!(FromTo::new(Location::Local, Location::BlobFs).to_string(), "LocalBlobFS");
        assert_eq!(FromTo::new(Location::OtherRemote, Location::Blob).to_string(), "OtherRemoteBlob");
    }

    #[test]
    fn only_local_is_not_remote() {
        assert!(!Location::Local.is_remote());
        assert!(Location::BlobFs.is_remote());
    }
}
