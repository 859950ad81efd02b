//! Entities as seen by a recovery run.

use std::path::PathBuf;

use crate::error::{Error, Result};
use crate::model::entity::EntityMetadata;

/// Where a recovered entity should be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    /// Recover to the entity's original path.
    Default,
    /// Recover under `path`; with `keep_structure` the original directory
    /// layout is recreated below it, otherwise entities are flattened into
    /// the directory itself.
    Directory { path: PathBuf, keep_structure: bool },
}

/// A backed-up entity scheduled for recovery, pairing its captured metadata
/// with whatever currently exists on disk at the destination, if anything.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetEntity {
    pub path: PathBuf,
    pub destination: Destination,
    pub existing_metadata: EntityMetadata,
    pub current_metadata: Option<EntityMetadata>,
}

impl TargetEntity {
    pub fn new(
        path: PathBuf,
        destination: Destination,
        existing_metadata: EntityMetadata,
        current_metadata: Option<EntityMetadata>,
    ) -> Result<Self> {
        if let Some(current) = &current_metadata {
            if current.is_file() != existing_metadata.is_file() {
                return Err(Error::MismatchedEntityVariants {
                    current: current.class().to_string(),
                    existing: existing_metadata.class().to_string(),
                });
            }
        }

        Ok(Self {
            path,
            destination,
            existing_metadata,
            current_metadata,
        })
    }

    /// True when nothing exists at the destination or it differs from the
    /// captured state.
    pub fn has_changed(&self) -> bool {
        match &self.current_metadata {
            Some(current) => self.existing_metadata.has_changed(current),
            None => true,
        }
    }

    /// True when the entity is a file whose content needs to be pulled; for
    /// files, content is compared by size and checksum only.
    pub fn has_content_changed(&self) -> bool {
        match (&self.existing_metadata, &self.current_metadata) {
            (
                EntityMetadata::File {
                    size: existing_size,
                    checksum: existing_checksum,
                    ..
                },
                Some(EntityMetadata::File {
                    size: current_size,
                    checksum: current_checksum,
                    ..
                }),
            ) => existing_size != current_size || existing_checksum != current_checksum,
            (EntityMetadata::File { .. }, None) => true,
            _ => false,
        }
    }

    /// The path the entity was originally backed up from.
    pub fn original_path(&self) -> PathBuf {
        self.existing_metadata.path().to_path_buf()
    }

    /// The path the entity will be written to, after applying the
    /// destination.
    pub fn destination_path(&self) -> PathBuf {
        let original = self.original_path();

        match &self.destination {
            Destination::Default => original,
            Destination::Directory {
                path,
                keep_structure: true,
            } => {
                let relative = original.strip_prefix("/").unwrap_or(&original);
                path.join(relative)
            }
            Destination::Directory {
                path,
                keep_structure: false,
            } => match original.file_name() {
                Some(name) => path.join(name),
                None => path.clone(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::entity::Checksum;
    use crate::model::fixtures::{directory_metadata, file_metadata};
    use pretty_assertions::assert_eq;

    fn target(destination: Destination) -> TargetEntity {
        TargetEntity::new(
            PathBuf::from("/tmp/nested/file"),
            destination,
            file_metadata("/tmp/nested/file", 10, 1),
            None,
        )
        .unwrap()
    }

    #[test]
    fn test_target_entities_reject_mismatched_variants() {
        let result = TargetEntity::new(
            PathBuf::from("/tmp/a"),
            Destination::Default,
            file_metadata("/tmp/a", 10, 1),
            Some(directory_metadata("/tmp/a")),
        );

        assert!(matches!(result, Err(Error::MismatchedEntityVariants { .. })));
    }

    #[test]
    fn test_target_entities_without_current_metadata_have_changed() {
        let entity = target(Destination::Default);

        assert!(entity.has_changed());
        assert!(entity.has_content_changed());
    }

    #[test]
    fn test_target_entities_detect_content_changes_by_checksum() {
        let existing = file_metadata("/tmp/a", 10, 1);
        let mut current = existing.clone();
        if let EntityMetadata::File { checksum, .. } = &mut current {
            *checksum = Checksum::from_u64(2);
        }

        let entity = TargetEntity::new(
            PathBuf::from("/tmp/a"),
            Destination::Default,
            existing,
            Some(current),
        )
        .unwrap();

        assert!(entity.has_changed());
        assert!(entity.has_content_changed());
    }

    #[test]
    fn test_target_entities_detect_content_changes_by_size() {
        let existing = file_metadata("/tmp/a", 10, 1);
        let current = file_metadata("/tmp/a", 20, 1);

        let entity = TargetEntity::new(
            PathBuf::from("/tmp/a"),
            Destination::Default,
            existing,
            Some(current),
        )
        .unwrap();

        assert!(entity.has_changed());
        assert!(entity.has_content_changed());
    }

    #[test]
    fn test_unchanged_target_entities_report_no_changes() {
        let existing = file_metadata("/tmp/a", 10, 1);
        let entity = TargetEntity::new(
            PathBuf::from("/tmp/a"),
            Destination::Default,
            existing.clone(),
            Some(existing),
        )
        .unwrap();

        assert!(!entity.has_changed());
        assert!(!entity.has_content_changed());
    }

    #[test]
    fn test_default_destination_recovers_to_the_original_path() {
        let entity = target(Destination::Default);

        assert_eq!(entity.destination_path(), PathBuf::from("/tmp/nested/file"));
    }

    #[test]
    fn test_directory_destination_can_keep_the_original_structure() {
        let entity = target(Destination::Directory {
            path: PathBuf::from("/restore"),
            keep_structure: true,
        });

        assert_eq!(
            entity.destination_path(),
            PathBuf::from("/restore/tmp/nested/file")
        );
    }

    #[test]
    fn test_directory_destination_can_flatten_entities() {
        let entity = target(Destination::Directory {
            path: PathBuf::from("/restore"),
            keep_structure: false,
        });

        assert_eq!(entity.destination_path(), PathBuf::from("/restore/file"));
    }
}
