//! Entities as seen by a backup run.

use std::path::PathBuf;

use crate::error::{Error, Result};
use crate::model::entity::EntityMetadata;

/// A filesystem entity scheduled for backup, pairing its current on-disk
/// metadata with the metadata captured by the latest entry, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceEntity {
    pub path: PathBuf,
    pub existing_metadata: Option<EntityMetadata>,
    pub current_metadata: EntityMetadata,
}

impl SourceEntity {
    pub fn new(
        path: PathBuf,
        existing_metadata: Option<EntityMetadata>,
        current_metadata: EntityMetadata,
    ) -> Result<Self> {
        if let Some(existing) = &existing_metadata {
            if existing.is_file() != current_metadata.is_file() {
                return Err(Error::MismatchedEntityVariants {
                    current: current_metadata.class().to_string(),
                    existing: existing.class().to_string(),
                });
            }
        }

        Ok(Self {
            path,
            existing_metadata,
            current_metadata,
        })
    }

    /// True when the entity was never backed up or differs from its last
    /// captured state.
    pub fn has_changed(&self) -> bool {
        match &self.existing_metadata {
            Some(existing) => self.current_metadata.has_changed(existing),
            None => true,
        }
    }

    /// True when the entity is a file whose content needs to be pushed; for
    /// files, content is compared by size and checksum only.
    pub fn has_content_changed(&self) -> bool {
        match (&self.current_metadata, &self.existing_metadata) {
            (
                EntityMetadata::File {
                    size: current_size,
                    checksum: current_checksum,
                    ..
                },
                Some(EntityMetadata::File {
                    size: existing_size,
                    checksum: existing_checksum,
                    ..
                }),
            ) => current_size != existing_size || current_checksum != existing_checksum,
            (EntityMetadata::File { .. }, None) => true,
            _ => false,
        }
    }
}
