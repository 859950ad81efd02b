//! Progress tracking for recovery operations.

use std::path::Path;
use tracing::{info, warn};

use crate::error::Error;
use crate::ops::OperationId;

/// Observer of recovery progress.
///
/// Implementations are fire-and-forget: they must not block and cannot fail
/// the pipeline.
pub trait RecoveryTracker: Send + Sync {
    /// An entity was considered for recovery.
    fn entity_examined(&self, operation: OperationId, entity: &Path);

    /// An entity was selected for recovery.
    fn entity_collected(&self, operation: OperationId, entity: &Path);

    /// Processing of an entity began; `expected_parts` is the number of
    /// crate parts that will be pulled (zero for metadata-only entities and
    /// directories).
    fn entity_processing_started(&self, operation: OperationId, entity: &Path, expected_parts: usize);

    /// One crate part of an entity was pulled and decrypted.
    fn entity_part_processed(&self, operation: OperationId, entity: &Path);

    /// An entity's content was fully reconstructed.
    fn entity_processed(&self, operation: OperationId, entity: &Path);

    /// An entity's metadata was applied to the recovered file.
    fn metadata_applied(&self, operation: OperationId, entity: &Path);

    /// A failure occurred; `entity` is set when the failure is scoped to one
    /// entity.
    fn failure_encountered(&self, operation: OperationId, entity: Option<&Path>, failure: &Error);

    /// The operation finished.
    fn completed(&self, operation: OperationId);
}

/// Tracker that ignores all events.
#[derive(Debug, Default)]
pub struct NoOpTracker;

impl RecoveryTracker for NoOpTracker {
    fn entity_examined(&self, _operation: OperationId, _entity: &Path) {}
    fn entity_collected(&self, _operation: OperationId, _entity: &Path) {}
    fn entity_processing_started(
        &self,
        _operation: OperationId,
        _entity: &Path,
        _expected_parts: usize,
    ) {
    }
    fn entity_part_processed(&self, _operation: OperationId, _entity: &Path) {}
    fn entity_processed(&self, _operation: OperationId, _entity: &Path) {}
    fn metadata_applied(&self, _operation: OperationId, _entity: &Path) {}
    fn failure_encountered(&self, _operation: OperationId, _entity: Option<&Path>, _failure: &Error) {
    }
    fn completed(&self, _operation: OperationId) {}
}

/// Tracker that emits all events as tracing events.
#[derive(Debug, Default)]
pub struct LogTracker;

impl RecoveryTracker for LogTracker {
    fn entity_examined(&self, operation: OperationId, entity: &Path) {
        info!(%operation, entity = %entity.display(), "Entity examined");
    }

    fn entity_collected(&self, operation: OperationId, entity: &Path) {
        info!(%operation, entity = %entity.display(), "Entity collected");
    }

    fn entity_processing_started(&self, operation: OperationId, entity: &Path, expected_parts: usize) {
        info!(
            %operation,
            entity = %entity.display(),
            expected_parts,
            "Entity processing started"
        );
    }

    fn entity_part_processed(&self, operation: OperationId, entity: &Path) {
        info!(%operation, entity = %entity.display(), "Entity part processed");
    }

    fn entity_processed(&self, operation: OperationId, entity: &Path) {
        info!(%operation, entity = %entity.display(), "Entity processed");
    }

    fn metadata_applied(&self, operation: OperationId, entity: &Path) {
        info!(%operation, entity = %entity.display(), "Entity metadata applied");
    }

    fn failure_encountered(&self, operation: OperationId, entity: Option<&Path>, failure: &Error) {
        match entity {
            Some(entity) => {
                warn!(%operation, entity = %entity.display(), %failure, "Failure encountered")
            }
            None => warn!(%operation, %failure, "Failure encountered"),
        }
    }

    fn completed(&self, operation: OperationId) {
        info!(%operation, "Operation completed");
    }
}
