//! Temporary staging for files being reconstructed.
//!
//! Recovered content is written to a staged file first and only moved to its
//! destination once complete, so a failed or cancelled recovery never leaves
//! a half-written file behind.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::Result;

/// A file being assembled before destaging.
#[derive(Debug)]
pub struct StagedFile {
    file: NamedTempFile,
}

impl StagedFile {
    pub fn write_all(&mut self, content: &[u8]) -> Result<()> {
        self.file.write_all(content)?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }
}

/// Staging seam for the recovery pipeline.
pub trait Staging: Send + Sync {
    /// Creates a new empty staged file.
    fn stage_new(&self) -> Result<StagedFile>;

    /// Moves a completed staged file to `target`, creating parent
    /// directories as needed.
    fn destage(&self, staged: StagedFile, target: &Path) -> Result<()>;

    /// Drops a staged file without destaging it.
    fn discard(&self, staged: StagedFile) -> Result<()>;
}

/// Staging backed by `tempfile`, optionally rooted in a specific directory.
#[derive(Debug, Default)]
pub struct TempStaging {
    directory: Option<PathBuf>,
}

impl TempStaging {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn in_directory(directory: PathBuf) -> Self {
        Self {
            directory: Some(directory),
        }
    }
}

impl Staging for TempStaging {
    fn stage_new(&self) -> Result<StagedFile> {
        let file = match &self.directory {
            Some(directory) => NamedTempFile::new_in(directory)?,
            None => NamedTempFile::new()?,
        };

        debug!(staged = %file.path().display(), "Staged new file");
        Ok(StagedFile { file })
    }

    fn destage(&self, staged: StagedFile, target: &Path) -> Result<()> {
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }

        debug!(
            staged = %staged.file.path().display(),
            target = %target.display(),
            "Destaging file"
        );

        match staged.file.persist(target) {
            Ok(_) => Ok(()),
            Err(e) => {
                // staging and target may live on different filesystems where
                // a rename cannot work; fall back to a copy
                let staged = e.file;
                fs::copy(staged.path(), target)?;
                Ok(())
            }
        }
    }

    fn discard(&self, staged: StagedFile) -> Result<()> {
        debug!(staged = %staged.file.path().display(), "Discarding staged file");
        staged.file.close()?;
        Ok(())
    }
}
