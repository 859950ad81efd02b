//! Collection of recovery candidates from dataset metadata.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

use crate::analysis::{self, ChecksumAlgorithm};
use crate::api::ServerApiClient;
use crate::error::Result;
use crate::model::entity::EntityMetadata;
use crate::model::target::{Destination, TargetEntity};
use crate::ops::recovery::Descriptor;

/// Source of recovery candidates.
#[async_trait]
pub trait RecoveryCollector: Send + Sync {
    /// Produces all candidate entities, in the order they should be
    /// recovered.
    async fn collect(&self) -> Result<Vec<TargetEntity>>;
}

/// Collector walking the target entry's filesystem metadata.
///
/// Every known entity is resolved to its full captured metadata (following
/// `Existing` states to older entries), filtered by the descriptor's path
/// query and paired with whatever currently exists at its destination.
pub struct DefaultRecoveryCollector {
    descriptor: Arc<Descriptor>,
    api: Arc<dyn ServerApiClient>,
    checksum: ChecksumAlgorithm,
}

impl DefaultRecoveryCollector {
    pub fn new(
        descriptor: Arc<Descriptor>,
        api: Arc<dyn ServerApiClient>,
        checksum: ChecksumAlgorithm,
    ) -> Self {
        Self {
            descriptor,
            api,
            checksum,
        }
    }

    fn destination(&self) -> Destination {
        match &self.descriptor.destination {
            Some(directory) => Destination::Directory {
                path: directory.path.clone(),
                keep_structure: directory.keep_structure,
            },
            None => Destination::Default,
        }
    }
}

#[async_trait]
impl RecoveryCollector for DefaultRecoveryCollector {
    async fn collect(&self) -> Result<Vec<TargetEntity>> {
        let mut collected = Vec::new();

        for path in self.descriptor.target_metadata.filesystem.entities.keys() {
            if let Some(query) = &self.descriptor.query {
                if !query.matches(path) {
                    debug!(entity = %path.display(), "Entity skipped by query");
                    continue;
                }
            }

            let existing = self
                .descriptor
                .target_metadata
                .require(path, self.api.as_ref())
                .await?;

            let destination = self.destination();

            // pair with what is currently on disk at the destination, if
            // anything; the captured compression tag carries over because it
            // has no bearing on change detection
            let probe =
                TargetEntity::new(path.clone(), destination.clone(), existing.clone(), None)?;
            let destination_path = probe.destination_path();

            let current = if destination_path.exists() {
                let compression = match &existing {
                    EntityMetadata::File { compression, .. } => compression.as_str(),
                    EntityMetadata::Directory { .. } => "none",
                };
                Some(analysis::extract_entity_metadata(
                    &destination_path,
                    self.checksum,
                    compression,
                )?)
            } else {
                None
            };

            collected.push(TargetEntity::new(
                path.clone(),
                destination,
                existing,
                current,
            )?);
        }

        Ok(collected)
    }
}
