//! Stage two: reconstructing entity content from remote crates.

use std::fs;
use std::path::Path;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::compression;
use crate::error::{Error, Result};
use crate::model::entity::EntityMetadata;
use crate::model::target::{Destination, TargetEntity};
use crate::model::CrateId;
use crate::ops::recovery::{Descriptor, Providers};
use crate::ops::OperationId;

// destination directories are created private to the recovering user
const CREATED_DIRECTORY_MODE: u32 = 0o700;

/// Processes one entity; returns whether it should proceed to metadata
/// application.
///
/// Directories recovered into a flattening destination are dropped (their
/// contents land in the destination directly). A crate that cannot be pulled
/// fails with [`Error::CratePullFailed`], which aborts the whole stage;
/// every other failure is scoped to the entity.
pub async fn process(
    operation: OperationId,
    entity: &TargetEntity,
    descriptor: &Descriptor,
    providers: &Providers,
    cancel: &CancellationToken,
) -> Result<bool> {
    let destination_path = entity.destination_path();

    if entity.existing_metadata.is_directory() {
        if matches!(
            entity.destination,
            Destination::Directory {
                keep_structure: false,
                ..
            }
        ) {
            debug!(
                entity = %entity.path.display(),
                "Directory dropped by flattening destination"
            );
            return Ok(false);
        }

        providers
            .track
            .entity_processing_started(operation, &entity.path, 0);
        create_directory(&destination_path)?;
        providers.track.entity_processed(operation, &entity.path);

        return Ok(true);
    }

    if let Some(parent) = destination_path.parent() {
        create_directory(parent)?;
    }

    if !entity.has_content_changed() {
        // metadata-only difference; nothing to pull
        providers
            .track
            .entity_processing_started(operation, &entity.path, 0);
        providers.track.entity_processed(operation, &entity.path);
        return Ok(true);
    }

    let EntityMetadata::File {
        checksum,
        crates,
        compression: compression_name,
        ..
    } = &entity.existing_metadata
    else {
        return Err(Error::MetadataNotFound {
            entity: entity.path.clone(),
        });
    };

    let mut parts: Vec<(&std::path::PathBuf, &CrateId)> = crates.iter().collect();
    parts.sort_by_key(|(path, _)| part_id(path));

    if let Some((last, _)) = parts.last() {
        let last_part = part_id(last);
        if last_part + 1 != parts.len() {
            return Err(Error::UnexpectedCrateParts {
                last_part,
                parts: parts.len(),
            });
        }
    }

    providers
        .track
        .entity_processing_started(operation, &entity.path, parts.len());

    let mut merged = Vec::new();

    for (part_path, crate_id) in parts {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let pulled = match providers.clients.core.pull(*crate_id).await {
            Ok(Some(content)) => content,
            Ok(None) => {
                return Err(Error::CratePullFailed {
                    crate_id: *crate_id,
                    entity: entity.path.clone(),
                })
            }
            Err(e) => {
                warn!(
                    operation = %operation,
                    crate_id = %crate_id,
                    error = %e,
                    "Crate pull failed"
                );
                return Err(Error::CratePullFailed {
                    crate_id: *crate_id,
                    entity: entity.path.clone(),
                });
            }
        };

        debug!(
            entity = %entity.path.display(),
            part = %part_path.display(),
            "Crate part pulled"
        );

        // each part is encrypted under its own derived secret
        let secret = descriptor.device_secret.to_file_secret(part_path, checksum)?;
        merged.extend(secret.decrypt(&pulled)?);
        providers.track.entity_part_processed(operation, &entity.path);
    }

    let content = compression::for_name(compression_name)?.decompress(&merged)?;

    let mut staged = providers.staging.stage_new()?;
    if let Err(e) = staged.write_all(&content) {
        if let Err(discard_error) = providers.staging.discard(staged) {
            warn!(
                operation = %operation,
                error = %discard_error,
                "Failed to discard staged file"
            );
        }
        return Err(e);
    }
    providers.staging.destage(staged, &destination_path)?;

    providers.track.entity_processed(operation, &entity.path);

    Ok(true)
}

/// Part ordinal encoded in a crate-part path; paths without a part suffix
/// are the sole part of their entity.
fn part_id(path: &Path) -> usize {
    path.file_name()
        .and_then(|name| name.to_str())
        .and_then(|name| name.rsplit_once("__part="))
        .and_then(|(_, id)| id.parse().ok())
        .unwrap_or(0)
}

#[cfg(unix)]
fn create_directory(path: &Path) -> Result<()> {
    use std::os::unix::fs::DirBuilderExt;

    fs::DirBuilder::new()
        .recursive(true)
        .mode(CREATED_DIRECTORY_MODE)
        .create(path)?;
    Ok(())
}

#[cfg(not(unix))]
fn create_directory(path: &Path) -> Result<()> {
    fs::create_dir_all(path)?;
    Ok(())
}
