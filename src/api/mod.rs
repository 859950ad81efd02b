//! Client traits for the crate store and the metadata server.
//!
//! Transport is out of scope here; callers supply implementations backed by
//! whatever protocol their deployment speaks. Everything else in this crate
//! talks to remote services exclusively through these traits.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::error::Result;
use crate::model::DatasetMetadata;
use crate::model::{CrateId, DatasetDefinitionId, DatasetEntryId, DeviceId};

/// One immutable point-in-time backup captured under a definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetEntry {
    pub id: DatasetEntryId,
    pub definition: DatasetDefinitionId,
    pub device: DeviceId,
    /// Crates holding the entry's content.
    pub data: BTreeSet<CrateId>,
    /// Crate holding the entry's metadata.
    pub metadata: CrateId,
    pub created: DateTime<Utc>,
}

/// Access to content-addressed crate storage.
#[async_trait]
pub trait CrateStoreClient: Send + Sync {
    /// Fetches a crate's content; `None` when the store has no such crate.
    async fn pull(&self, crate_id: CrateId) -> Result<Option<Vec<u8>>>;

    /// Stores a crate's content.
    async fn push(&self, crate_id: CrateId, content: Vec<u8>) -> Result<()>;
}

/// Access to dataset definitions, entries and their metadata.
#[async_trait]
pub trait ServerApiClient: Send + Sync {
    /// Fetches the decoded metadata of an entry.
    async fn dataset_metadata(&self, entry: DatasetEntryId) -> Result<DatasetMetadata>;

    /// Fetches an entry by id.
    async fn dataset_entry(&self, entry: DatasetEntryId) -> Result<DatasetEntry>;

    /// Fetches the most recent entry of a definition, optionally bounded to
    /// entries created at or before `until`.
    async fn latest_entry(
        &self,
        definition: DatasetDefinitionId,
        until: Option<DateTime<Utc>>,
    ) -> Result<Option<DatasetEntry>>;
}
