//! Stage one: deciding which entities need recovering.

use tracing::debug;

use crate::error::Result;
use crate::model::TargetEntity;
use crate::ops::recovery::collector::RecoveryCollector;
use crate::ops::OperationId;
use crate::tracking::RecoveryTracker;

/// Examines all candidates and keeps those that differ from what is on disk.
pub async fn entities(
    operation: OperationId,
    collector: &dyn RecoveryCollector,
    track: &dyn RecoveryTracker,
) -> Result<Vec<TargetEntity>> {
    let candidates = collector.collect().await?;

    let mut collected = Vec::new();

    for entity in candidates {
        track.entity_examined(operation, &entity.path);

        if entity.has_changed() {
            track.entity_collected(operation, &entity.path);
            collected.push(entity);
        } else {
            debug!(entity = %entity.path.display(), "Entity unchanged; skipping");
        }
    }

    Ok(collected)
}
