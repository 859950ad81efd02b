//! Mock collaborators for recovery tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::api::{CrateStoreClient, DatasetEntry, ServerApiClient};
use crate::error::{Error, Result};
use crate::model::{CrateId, DatasetDefinitionId, DatasetEntryId, DatasetMetadata, TargetEntity};
use crate::ops::recovery::collector::RecoveryCollector;
use crate::ops::OperationId;
use crate::tracking::RecoveryTracker;

pub(crate) struct MockCollector {
    entities: Vec<TargetEntity>,
    delay: Option<Duration>,
}

impl MockCollector {
    pub(crate) fn new(entities: Vec<TargetEntity>) -> Self {
        Self {
            entities,
            delay: None,
        }
    }

    pub(crate) fn delayed(delay: Duration) -> Self {
        Self {
            entities: Vec::new(),
            delay: Some(delay),
        }
    }
}

#[async_trait]
impl RecoveryCollector for MockCollector {
    async fn collect(&self) -> Result<Vec<TargetEntity>> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        Ok(self.entities.clone())
    }
}

#[derive(Default)]
pub(crate) struct MockCrateStore {
    crates: Mutex<HashMap<CrateId, Vec<u8>>>,
    pulls: AtomicUsize,
}

impl MockCrateStore {
    pub(crate) fn with_crates(crates: HashMap<CrateId, Vec<u8>>) -> Self {
        Self {
            crates: Mutex::new(crates),
            pulls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn pulls(&self) -> usize {
        self.pulls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CrateStoreClient for MockCrateStore {
    async fn pull(&self, crate_id: CrateId) -> Result<Option<Vec<u8>>> {
        self.pulls.fetch_add(1, Ordering::SeqCst);
        Ok(self.crates.lock().unwrap().get(&crate_id).cloned())
    }

    async fn push(&self, crate_id: CrateId, content: Vec<u8>) -> Result<()> {
        self.crates.lock().unwrap().insert(crate_id, content);
        Ok(())
    }
}

#[derive(Default)]
pub(crate) struct MockApi {
    pub(crate) metadata: HashMap<DatasetEntryId, DatasetMetadata>,
    pub(crate) entries: HashMap<DatasetEntryId, DatasetEntry>,
}

#[async_trait]
impl ServerApiClient for MockApi {
    async fn dataset_metadata(&self, entry: DatasetEntryId) -> Result<DatasetMetadata> {
        self.metadata
            .get(&entry)
            .cloned()
            .ok_or_else(|| Error::ApiFailure {
                reason: format!("No metadata for entry [{}]", entry),
            })
    }

    async fn dataset_entry(&self, entry: DatasetEntryId) -> Result<DatasetEntry> {
        self.entries
            .get(&entry)
            .cloned()
            .ok_or_else(|| Error::ApiFailure {
                reason: format!("No entry [{}]", entry),
            })
    }

    async fn latest_entry(
        &self,
        definition: DatasetDefinitionId,
        until: Option<DateTime<Utc>>,
    ) -> Result<Option<DatasetEntry>> {
        Ok(self
            .entries
            .values()
            .filter(|entry| entry.definition == definition)
            .filter(|entry| until.map(|until| entry.created <= until).unwrap_or(true))
            .max_by_key(|entry| entry.created)
            .cloned())
    }
}

#[derive(Default)]
pub(crate) struct MockTracker {
    examined: AtomicUsize,
    collected: AtomicUsize,
    processing_started: AtomicUsize,
    parts_processed: AtomicUsize,
    processed: AtomicUsize,
    metadata_applied: AtomicUsize,
    failures: AtomicUsize,
    completed: AtomicUsize,
}

impl MockTracker {
    pub(crate) fn examined(&self) -> usize {
        self.examined.load(Ordering::SeqCst)
    }

    pub(crate) fn collected(&self) -> usize {
        self.collected.load(Ordering::SeqCst)
    }

    pub(crate) fn processing_started(&self) -> usize {
        self.processing_started.load(Ordering::SeqCst)
    }

    pub(crate) fn parts_processed(&self) -> usize {
        self.parts_processed.load(Ordering::SeqCst)
    }

    pub(crate) fn processed(&self) -> usize {
        self.processed.load(Ordering::SeqCst)
    }

    pub(crate) fn metadata_applied(&self) -> usize {
        self.metadata_applied.load(Ordering::SeqCst)
    }

    pub(crate) fn failures(&self) -> usize {
        self.failures.load(Ordering::SeqCst)
    }

    pub(crate) fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }
}

impl RecoveryTracker for MockTracker {
    fn entity_examined(&self, _operation: OperationId, _entity: &Path) {
        self.examined.fetch_add(1, Ordering::SeqCst);
    }

    fn entity_collected(&self, _operation: OperationId, _entity: &Path) {
        self.collected.fetch_add(1, Ordering::SeqCst);
    }

    fn entity_processing_started(
        &self,
        _operation: OperationId,
        _entity: &Path,
        _expected_parts: usize,
    ) {
        self.processing_started.fetch_add(1, Ordering::SeqCst);
    }

    fn entity_part_processed(&self, _operation: OperationId, _entity: &Path) {
        self.parts_processed.fetch_add(1, Ordering::SeqCst);
    }

    fn entity_processed(&self, _operation: OperationId, _entity: &Path) {
        self.processed.fetch_add(1, Ordering::SeqCst);
    }

    fn metadata_applied(&self, _operation: OperationId, _entity: &Path) {
        self.metadata_applied.fetch_add(1, Ordering::SeqCst);
    }

    fn failure_encountered(&self, _operation: OperationId, _entity: Option<&Path>, _failure: &Error) {
        self.failures.fetch_add(1, Ordering::SeqCst);
    }

    fn completed(&self, _operation: OperationId) {
        self.completed.fetch_add(1, Ordering::SeqCst);
    }
}
