//! Metadata model: per-entity metadata, filesystem state tracking and
//! dataset-level grouping across backup generations.

pub mod dataset;
pub mod entity;
pub mod filesystem;
pub mod source;
pub mod target;

pub use dataset::DatasetMetadata;
pub use entity::{Checksum, EntityMetadata};
pub use filesystem::{EntityState, FilesystemMetadata};
pub use source::SourceEntity;
pub use target::{Destination, TargetEntity};

use uuid::Uuid;

/// Identifier of one content-addressed storage unit ("crate")
pub type CrateId = Uuid;

/// Identifier of a named backup configuration
pub type DatasetDefinitionId = Uuid;

/// Identifier of one immutable point-in-time backup under a definition
pub type DatasetEntryId = Uuid;

/// Identifier of the owning user
pub type UserId = Uuid;

/// Identifier of the backed-up device
pub type DeviceId = Uuid;

#[cfg(test)]
pub(crate) mod fixtures {
    use super::entity::{Checksum, EntityMetadata};
    use chrono::DateTime;
    use std::collections::BTreeMap;
    use std::path::PathBuf;

    pub(crate) fn file_metadata(path: &str, size: u64, checksum: u64) -> EntityMetadata {
        EntityMetadata::File {
            path: PathBuf::from(path),
            link: None,
            is_hidden: false,
            created: DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
            updated: DateTime::from_timestamp(1_700_000_100, 0).unwrap(),
            owner: "root".to_string(),
            group: "root".to_string(),
            permissions: "rw-r--r--".to_string(),
            size,
            checksum: Checksum::from_u64(checksum),
            crates: BTreeMap::new(),
            compression: "gzip".to_string(),
        }
    }

    pub(crate) fn directory_metadata(path: &str) -> EntityMetadata {
        EntityMetadata::Directory {
            path: PathBuf::from(path),
            link: None,
            is_hidden: false,
            created: DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
            updated: DateTime::from_timestamp(1_700_000_100, 0).unwrap(),
            owner: "root".to_string(),
            group: "root".to_string(),
            permissions: "rwxr-xr-x".to_string(),
        }
    }
}
