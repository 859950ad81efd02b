//! Recovery: reconstructing backed-up entities from encrypted remote crates.
//!
//! A recovery runs as three stages applied strictly sequentially per entity:
//! collection decides *what* to recover, processing reconstructs content,
//! metadata application restores permissions, ownership and timestamps.

pub mod collector;
pub mod stages;

#[cfg(test)]
pub(crate) mod support;

use chrono::{DateTime, Utc};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::analysis::ChecksumAlgorithm;
use crate::api::{CrateStoreClient, ServerApiClient};
use crate::error::{Error, Result};
use crate::model::{DatasetDefinitionId, DatasetEntryId, DatasetMetadata};
use crate::ops::{operation_id, OperationId};
use crate::secrets::DeviceSecret;
use crate::staging::Staging;
use crate::tracking::RecoveryTracker;

use collector::{DefaultRecoveryCollector, RecoveryCollector};

/// Remote service clients used by a recovery.
#[derive(Clone)]
pub struct Clients {
    pub api: Arc<dyn ServerApiClient>,
    pub core: Arc<dyn CrateStoreClient>,
}

/// Everything a recovery needs beyond its descriptor.
#[derive(Clone)]
pub struct Providers {
    pub clients: Clients,
    pub checksum: ChecksumAlgorithm,
    pub staging: Arc<dyn Staging>,
    pub track: Arc<dyn RecoveryTracker>,
}

/// Filter narrowing a recovery to matching entities.
///
/// Queries containing a path separator match against the absolute path;
/// anything else matches against the file name only.
#[derive(Debug, Clone)]
pub enum PathQuery {
    AbsolutePath(Regex),
    FileName(Regex),
}

impl PathQuery {
    pub fn new(query: &str) -> Result<Self> {
        let regex = Regex::new(query).map_err(|e| Error::InvalidConfiguration {
            reason: format!("Invalid path query [{}]: {}", query, e),
        })?;

        if query.contains('/') {
            Ok(Self::AbsolutePath(regex))
        } else {
            Ok(Self::FileName(regex))
        }
    }

    pub fn matches(&self, path: &Path) -> bool {
        match self {
            Self::AbsolutePath(regex) => regex.is_match(&path.to_string_lossy()),
            Self::FileName(regex) => path
                .file_name()
                .map(|name| regex.is_match(&name.to_string_lossy()))
                .unwrap_or(false),
        }
    }
}

/// Alternative directory to recover into.
#[derive(Debug, Clone)]
pub struct DestinationDirectory {
    pub path: PathBuf,
    /// Recreate the original directory layout below `path`; without it,
    /// entities are flattened into the directory itself.
    pub keep_structure: bool,
}

/// What to recover: the entry's metadata plus filtering, destination and the
/// secret chain root.
pub struct Descriptor {
    pub target_metadata: DatasetMetadata,
    pub query: Option<PathQuery>,
    pub destination: Option<DestinationDirectory>,
    pub device_secret: DeviceSecret,
}

impl Descriptor {
    /// Builds a descriptor for a specific dataset entry.
    pub async fn with_entry(
        entry: DatasetEntryId,
        query: Option<PathQuery>,
        destination: Option<DestinationDirectory>,
        device_secret: DeviceSecret,
        api: &dyn ServerApiClient,
    ) -> Result<Self> {
        let target_metadata = api.dataset_metadata(entry).await?;

        Ok(Self {
            target_metadata,
            query,
            destination,
            device_secret,
        })
    }

    /// Builds a descriptor for the latest entry of a definition, optionally
    /// bounded to entries created at or before `until`.
    pub async fn with_definition(
        definition: DatasetDefinitionId,
        until: Option<DateTime<Utc>>,
        query: Option<PathQuery>,
        destination: Option<DestinationDirectory>,
        device_secret: DeviceSecret,
        api: &dyn ServerApiClient,
    ) -> Result<Self> {
        let entry = api
            .latest_entry(definition, until)
            .await?
            .ok_or(Error::EntryNotFound { definition })?;

        Self::with_entry(entry.id, query, destination, device_secret, api).await
    }
}

/// A runnable recovery operation.
pub struct Recovery {
    id: OperationId,
    descriptor: Arc<Descriptor>,
    providers: Providers,
    collector: Arc<dyn RecoveryCollector>,
    cancel: CancellationToken,
}

impl Recovery {
    pub fn new(descriptor: Descriptor, providers: Providers) -> Self {
        let descriptor = Arc::new(descriptor);
        let collector = Arc::new(DefaultRecoveryCollector::new(
            Arc::clone(&descriptor),
            Arc::clone(&providers.clients.api),
            providers.checksum,
        ));

        Self {
            id: operation_id(),
            descriptor,
            providers,
            collector,
            cancel: CancellationToken::new(),
        }
    }

    /// Same as [`new`](Self::new) but with a custom entity collector.
    pub fn with_collector(
        descriptor: Descriptor,
        providers: Providers,
        collector: Arc<dyn RecoveryCollector>,
    ) -> Self {
        Self {
            id: operation_id(),
            descriptor: Arc::new(descriptor),
            providers,
            collector,
            cancel: CancellationToken::new(),
        }
    }

    pub fn id(&self) -> OperationId {
        self.id
    }

    /// Starts the recovery on `handle`.
    ///
    /// `on_complete` fires exactly once: with `None` on success or with the
    /// failure that stopped the run, including [`Error::Cancelled`] after
    /// [`stop`](Self::stop).
    pub fn start(&self, handle: &Handle, on_complete: impl FnOnce(Option<Error>) + Send + 'static) {
        let id = self.id;
        let descriptor = Arc::clone(&self.descriptor);
        let providers = self.providers.clone();
        let collector = Arc::clone(&self.collector);
        let cancel = self.cancel.clone();

        handle.spawn(async move {
            info!(operation = %id, "Recovery started");

            let result = tokio::select! {
                _ = cancel.cancelled() => Err(Error::Cancelled),
                result = run(id, &descriptor, &providers, collector.as_ref(), &cancel) => result,
            };

            match result {
                Ok(()) => {
                    providers.track.completed(id);
                    info!(operation = %id, "Recovery completed");
                    on_complete(None);
                }
                Err(e) => {
                    providers.track.failure_encountered(id, None, &e);
                    warn!(operation = %id, error = %e, "Recovery failed");
                    on_complete(Some(e));
                }
            }
        });
    }

    /// Requests cancellation; the run stops at the next checkpoint.
    pub fn stop(&self) {
        info!(operation = %self.id, "Recovery stop requested");
        self.cancel.cancel();
    }
}

async fn run(
    id: OperationId,
    descriptor: &Descriptor,
    providers: &Providers,
    collector: &dyn RecoveryCollector,
    cancel: &CancellationToken,
) -> Result<()> {
    let entities = stages::collection::entities(id, collector, providers.track.as_ref()).await?;

    info!(operation = %id, entities = entities.len(), "Entities collected for recovery");

    for entity in entities {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let processed =
            match stages::processing::process(id, &entity, descriptor, providers, cancel).await {
                Ok(processed) => processed,
                Err(e @ Error::CratePullFailed { .. }) => return Err(e),
                Err(e @ Error::Cancelled) => return Err(e),
                Err(e) => {
                    warn!(
                        operation = %id,
                        entity = %entity.path.display(),
                        error = %e,
                        "Failed to process entity"
                    );
                    providers.track.failure_encountered(id, Some(&entity.path), &e);
                    continue;
                }
            };

        if !processed {
            continue;
        }

        if let Err(e) = stages::metadata::apply(id, &entity, providers.track.as_ref()) {
            warn!(
                operation = %id,
                entity = %entity.path.display(),
                error = %e,
                "Failed to apply entity metadata"
            );
            providers.track.failure_encountered(id, Some(&entity.path), &e);
        }
    }

    Ok(())
}
