//! Filesystem traversal behind the rule matcher.

use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;
use walkdir::WalkDir;

use crate::error::Result;

/// Everything a traversal produced: the paths it reached and, per path, the
/// error that stopped it from being read.
#[derive(Debug, Default)]
pub struct WalkResult {
    pub paths: Vec<PathBuf>,
    pub failures: Vec<(PathBuf, std::io::Error)>,
}

/// Traversal seam, so rule evaluation can run against fakes in tests.
pub trait Filesystem {
    /// Walks the tree rooted at `start`, returning all reachable paths
    /// (including `start` itself) and any per-path failures.
    fn walk(&self, start: &Path) -> Result<WalkResult>;
}

/// The real filesystem, traversed with `walkdir`.
#[derive(Debug, Default)]
pub struct OsFilesystem;

impl Filesystem for OsFilesystem {
    fn walk(&self, start: &Path) -> Result<WalkResult> {
        // surface a missing or unreadable root as a hard error instead of
        // an empty traversal
        let _ = fs::symlink_metadata(start)?;

        let mut result = WalkResult::default();

        for entry in WalkDir::new(start).follow_links(false) {
            match entry {
                Ok(entry) => result.paths.push(entry.into_path()),
                Err(e) => {
                    let path = e
                        .path()
                        .map(Path::to_path_buf)
                        .unwrap_or_else(|| start.to_path_buf());
                    warn!(path = %path.display(), error = %e, "Failed to traverse path");
                    result.failures.push((path, e.into()));
                }
            }
        }

        Ok(result)
    }
}
