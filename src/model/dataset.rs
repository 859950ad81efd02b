//! Metadata describing a single dataset entry and its captured entities.

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression as GzLevel;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::api::ServerApiClient;
use crate::error::{Error, Result};
use crate::model::entity::EntityMetadata;
use crate::model::filesystem::{EntityState, FilesystemMetadata};
use crate::secrets::derived::DeviceMetadataSecret;

/// Metadata produced by one backup run.
///
/// Entities whose content changed carry their full metadata in
/// `content_changed`; entities where only metadata changed (permissions,
/// ownership, timestamps) go in `metadata_changed`. Everything the run saw,
/// changed or not, appears in `filesystem`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetMetadata {
    pub content_changed: BTreeMap<PathBuf, EntityMetadata>,
    pub metadata_changed: BTreeMap<PathBuf, EntityMetadata>,
    pub filesystem: FilesystemMetadata,
}

impl DatasetMetadata {
    pub fn empty() -> Self {
        Self {
            content_changed: BTreeMap::new(),
            metadata_changed: BTreeMap::new(),
            filesystem: FilesystemMetadata::empty(),
        }
    }

    /// Total size of all entities with changed content.
    pub fn content_changed_bytes(&self) -> u64 {
        self.content_changed.values().map(|entity| entity.size()).sum()
    }

    /// Resolves the metadata of `entity`, following the filesystem state to
    /// the entry that last captured it.
    ///
    /// Entities captured by this entry must be present in one of the local
    /// maps; entities captured by an older entry are fetched through `api`.
    /// A path this entry never saw resolves to `None`.
    pub async fn collect(
        &self,
        entity: &Path,
        api: &dyn ServerApiClient,
    ) -> Result<Option<EntityMetadata>> {
        match self.filesystem.entities.get(entity) {
            Some(EntityState::New) | Some(EntityState::Updated) => {
                debug!(entity = %entity.display(), "Resolving metadata from current entry");
                let metadata = self
                    .content_changed
                    .get(entity)
                    .or_else(|| self.metadata_changed.get(entity))
                    .cloned()
                    .ok_or_else(|| Error::MetadataNotFound {
                        entity: entity.to_path_buf(),
                    })?;
                Ok(Some(metadata))
            }
            Some(EntityState::Existing { entry }) => {
                debug!(
                    entity = %entity.display(),
                    entry = %entry,
                    "Resolving metadata from existing entry"
                );
                let other = api.dataset_metadata(*entry).await?;
                let metadata = other
                    .content_changed
                    .get(entity)
                    .or_else(|| other.metadata_changed.get(entity))
                    .cloned()
                    .ok_or_else(|| Error::MetadataNotFoundInEntry {
                        entity: entity.to_path_buf(),
                        entry: *entry,
                    })?;
                Ok(Some(metadata))
            }
            None => Ok(None),
        }
    }

    /// Same as [`collect`](Self::collect) but treats an unknown path as an
    /// error.
    pub async fn require(
        &self,
        entity: &Path,
        api: &dyn ServerApiClient,
    ) -> Result<EntityMetadata> {
        self.collect(entity, api).await?.ok_or_else(|| Error::MetadataNotFound {
            entity: entity.to_path_buf(),
        })
    }

    /// Serializes the metadata to its compressed wire form.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let payload = serde_json::to_vec(self)?;

        let mut encoder = GzEncoder::new(Vec::new(), GzLevel::default());
        encoder.write_all(&payload)?;
        Ok(encoder.finish()?)
    }

    /// Deserializes metadata from its compressed wire form.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut decoder = GzDecoder::new(bytes);
        let mut payload = Vec::new();
        decoder.read_to_end(&mut payload)?;

        Ok(serde_json::from_slice(&payload)?)
    }

    /// Serializes and encrypts the metadata with the device metadata secret.
    pub fn encrypted(&self, secret: &DeviceMetadataSecret) -> Result<Vec<u8>> {
        secret.encrypt(&self.to_bytes()?)
    }

    /// Decrypts and deserializes metadata with the device metadata secret.
    pub fn decrypted(bytes: &[u8], secret: &DeviceMetadataSecret) -> Result<Self> {
        Self::from_bytes(&secret.decrypt(bytes)?)
    }
}
