//! Per-entity metadata for files and directories

use crate::model::CrateId;
use chrono::{DateTime, Utc};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// An algorithm-agnostic checksum value.
///
/// Stored as the big-endian magnitude of an arbitrary-precision unsigned
/// integer; equality is numeric (leading zero bytes are not significant).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Checksum(Vec<u8>);

impl Ord for Checksum {
    // magnitudes carry no leading zeros, so a longer value is always larger
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (self.0.len(), &self.0).cmp(&(other.0.len(), &other.0))
    }
}

impl PartialOrd for Checksum {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Checksum {
    /// Create a checksum from big-endian magnitude bytes
    pub fn from_be_bytes(bytes: &[u8]) -> Self {
        let first_nonzero = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len());
        Self(bytes[first_nonzero..].to_vec())
    }

    pub fn from_u64(value: u64) -> Self {
        Self::from_be_bytes(&value.to_be_bytes())
    }

    /// Magnitude bytes, big-endian, without leading zeros
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Lowercase hex rendering of the magnitude
    pub fn to_hex(&self) -> String {
        if self.0.is_empty() {
            "00".to_string()
        } else {
            hex::encode(&self.0)
        }
    }
}

impl std::fmt::Display for Checksum {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl Serialize for Checksum {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Checksum {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        let bytes = hex::decode(&value).map_err(D::Error::custom)?;
        Ok(Self::from_be_bytes(&bytes))
    }
}

/// Metadata describing one filesystem entity at a point in time.
///
/// A file's content is addressed by one or more crates; the `crates` map
/// links each crate-part path to the crate holding that part's data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum EntityMetadata {
    File {
        path: PathBuf,
        link: Option<PathBuf>,
        is_hidden: bool,
        created: DateTime<Utc>,
        updated: DateTime<Utc>,
        owner: String,
        group: String,
        permissions: String,
        size: u64,
        checksum: Checksum,
        crates: BTreeMap<PathBuf, CrateId>,
        compression: String,
    },
    Directory {
        path: PathBuf,
        link: Option<PathBuf>,
        is_hidden: bool,
        created: DateTime<Utc>,
        updated: DateTime<Utc>,
        owner: String,
        group: String,
        permissions: String,
    },
}

impl EntityMetadata {
    pub fn path(&self) -> &Path {
        match self {
            Self::File { path, .. } | Self::Directory { path, .. } => path,
        }
    }

    pub fn permissions(&self) -> &str {
        match self {
            Self::File { permissions, .. } | Self::Directory { permissions, .. } => permissions,
        }
    }

    pub fn owner(&self) -> &str {
        match self {
            Self::File { owner, .. } | Self::Directory { owner, .. } => owner,
        }
    }

    pub fn group(&self) -> &str {
        match self {
            Self::File { group, .. } | Self::Directory { group, .. } => group,
        }
    }

    pub fn updated(&self) -> DateTime<Utc> {
        match self {
            Self::File { updated, .. } | Self::Directory { updated, .. } => *updated,
        }
    }

    pub fn is_file(&self) -> bool {
        matches!(self, Self::File { .. })
    }

    pub fn is_directory(&self) -> bool {
        matches!(self, Self::Directory { .. })
    }

    /// Variant name, for diagnostics
    pub fn class(&self) -> &'static str {
        match self {
            Self::File { .. } => "file",
            Self::Directory { .. } => "directory",
        }
    }

    /// Size in bytes; directories have none
    pub fn size(&self) -> u64 {
        match self {
            Self::File { size, .. } => *size,
            Self::Directory { .. } => 0,
        }
    }

    /// True when this metadata differs structurally from `compared_to`.
    ///
    /// For two files the `compression` tag is not part of the comparison;
    /// the algorithm used to pack existing crates has no bearing on whether
    /// the entity itself changed.
    pub fn has_changed(&self, compared_to: &EntityMetadata) -> bool {
        match (self, compared_to) {
            (Self::File { compression, .. }, Self::File { .. }) => {
                let mut other = compared_to.clone();
                if let Self::File {
                    compression: other_compression,
                    ..
                } = &mut other
                {
                    *other_compression = compression.clone();
                }
                *self != other
            }
            _ => self != compared_to,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::fixtures::file_metadata;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_checksum_normalizes_leading_zeros() {
        let a = Checksum::from_be_bytes(&[0x00, 0x00, 0x01, 0xe2, 0x40]);
        let b = Checksum::from_be_bytes(&[0x01, 0xe2, 0x40]);

        assert_eq!(a, b);
        assert_eq!(a.to_hex(), "01e240");
        assert_eq!(Checksum::from_u64(0).to_hex(), "00");
    }

    #[test]
    fn test_checksums_order_numerically() {
        assert!(Checksum::from_u64(256) > Checksum::from_u64(2));
        assert!(Checksum::from_u64(2) < Checksum::from_u64(3));
        assert!(
            Checksum::from_be_bytes(&[0x00, 0x02]) < Checksum::from_be_bytes(&[0x01, 0x00])
        );
    }

    #[test]
    fn test_checksum_serde_round_trip() {
        let checksum = Checksum::from_u64(123_456);
        let encoded = serde_json::to_string(&checksum).unwrap();
        let decoded: Checksum = serde_json::from_str(&encoded).unwrap();

        assert_eq!(decoded, checksum);
    }

    #[test]
    fn test_compression_is_ignored_by_change_detection() {
        let a = file_metadata("/tmp/a", 10, 1);
        let mut b = a.clone();
        if let EntityMetadata::File { compression, .. } = &mut b {
            *compression = "none".to_string();
        }

        assert!(a != b);
        assert!(!a.has_changed(&b));
    }

    #[test]
    fn test_metadata_only_difference_is_a_change() {
        let a = file_metadata("/tmp/a", 10, 1);
        let mut b = a.clone();
        if let EntityMetadata::File { owner, .. } = &mut b {
            *owner = "nobody".to_string();
        }

        assert!(a.has_changed(&b));
    }

    #[test]
    fn test_variant_difference_is_a_change() {
        let file = file_metadata("/tmp/a", 10, 1);
        let directory = EntityMetadata::Directory {
            path: PathBuf::from("/tmp/a"),
            link: None,
            is_hidden: false,
            created: DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
            updated: DateTime::from_timestamp(1_700_000_100, 0).unwrap(),
            owner: "root".to_string(),
            group: "root".to_string(),
            permissions: "rwxr-xr-x".to_string(),
        };

        assert!(file.has_changed(&directory));
    }

    #[test]
    fn test_entity_metadata_serde_round_trip() {
        let metadata = file_metadata("/tmp/a", 10, 1);
        let encoded = serde_json::to_string(&metadata).unwrap();
        let decoded: EntityMetadata = serde_json::from_str(&encoded).unwrap();

        assert_eq!(decoded, metadata);
    }
}
