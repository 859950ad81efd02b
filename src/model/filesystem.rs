//! State of a backed-up filesystem tree across dataset entries.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::model::DatasetEntryId;

/// Per-path state of a filesystem captured by a dataset entry.
///
/// Paths that appear for the first time are [`EntityState::New`]; paths that
/// were already present and did not change point back to the entry that last
/// captured them via [`EntityState::Existing`]; paths that were present but
/// changed are [`EntityState::Updated`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum EntityState {
    New,
    Existing { entry: DatasetEntryId },
    Updated,
}

/// Snapshot of all entity paths known to a dataset entry and their state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilesystemMetadata {
    pub entities: BTreeMap<PathBuf, EntityState>,
}

impl FilesystemMetadata {
    pub fn empty() -> Self {
        Self {
            entities: BTreeMap::new(),
        }
    }

    /// Creates metadata for a first entry where every path is new.
    pub fn new<I, P>(changes: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            entities: changes
                .into_iter()
                .map(|path| (path.into(), EntityState::New))
                .collect(),
        }
    }

    /// Produces the next snapshot given the paths that changed in the current
    /// run.
    ///
    /// Changed paths that were already known become [`EntityState::Updated`]
    /// and changed paths seen for the first time become [`EntityState::New`];
    /// all remaining paths collapse to [`EntityState::Existing`] pointing
    /// either at the entry that already held them or, for paths captured by
    /// the previous entry itself, at `latest_entry`.
    pub fn updated<'a, I>(&self, changes: I, latest_entry: DatasetEntryId) -> Self
    where
        I: IntoIterator<Item = &'a Path>,
    {
        let changed: Vec<&Path> = changes.into_iter().collect();

        let updated = changed.iter().map(|path| {
            let state = if self.entities.contains_key(*path) {
                EntityState::Updated
            } else {
                EntityState::New
            };
            (path.to_path_buf(), state)
        });

        let existing = self
            .entities
            .iter()
            .filter(|(path, _)| !changed.contains(&path.as_path()))
            .map(|(path, state)| {
                let state = match state {
                    EntityState::New | EntityState::Updated => EntityState::Existing {
                        entry: latest_entry,
                    },
                    EntityState::Existing { entry } => EntityState::Existing { entry: *entry },
                };
                (path.clone(), state)
            });

        Self {
            entities: existing.chain(updated).collect(),
        }
    }
}
