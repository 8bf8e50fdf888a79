// # Directory Reconciler
//
// Removes every file under the snapshot directory that the current run did
// not write. Repository metadata (an entry named e.g. `.git`, at any depth)
// is skipped whole: never descended into, never deleted.
//
// Symlinks are inspected with `symlink_metadata` and removed as files; they
// are never followed.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::Error;

/// What a reconcile pass removed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PruneReport {
    /// Stale files (and symlinks) that were deleted
    pub removed_files: Vec<PathBuf>,
    /// Directories removed because pruning left them empty
    pub removed_dirs: Vec<PathBuf>,
}

impl PruneReport {
    /// Whether nothing was removed
    pub fn is_empty(&self) -> bool {
        self.removed_files.is_empty() && self.removed_dirs.is_empty()
    }
}

/// Delete every file under `root` that is not in `written`
///
/// `written` holds paths as returned by the snapshot writer (`root` joined
/// with a file name). Entries named `metadata_name` are left alone. When
/// `prune_empty_dirs` is set, directories emptied by this pass are removed
/// deepest first; `root` itself and directories holding metadata survive.
pub async fn reconcile(
    root: &Path,
    written: &HashSet<PathBuf>,
    metadata_name: &str,
    prune_empty_dirs: bool,
) -> Result<PruneReport, Error> {
    let mut report = PruneReport::default();
    let mut pending = vec![root.to_path_buf()];
    // Pre-order; reversed later for deepest-first directory removal
    let mut visited_dirs = Vec::new();

    while let Some(dir) = pending.pop() {
        let mut entries = fs::read_dir(&dir).await.map_err(|e| {
            Error::snapshot(format!("Failed to read directory {}: {}", dir.display(), e))
        })?;

        while let Some(entry) = entries.next_entry().await? {
            if entry.file_name() == metadata_name {
                tracing::trace!("Skipping metadata entry {}", entry.path().display());
                continue;
            }

            let path = entry.path();
            let metadata = fs::symlink_metadata(&path).await?;

            if metadata.is_dir() {
                pending.push(path.clone());
                visited_dirs.push(path);
            } else if !written.contains(&path) {
                fs::remove_file(&path).await.map_err(|e| {
                    Error::snapshot(format!("Failed to remove {}: {}", path.display(), e))
                })?;
                tracing::info!("Removed stale file {}", path.display());
                report.removed_files.push(path);
            }
        }
    }

    if prune_empty_dirs {
        for dir in visited_dirs.into_iter().rev() {
            if is_empty_dir(&dir).await? {
                fs::remove_dir(&dir).await.map_err(|e| {
                    Error::snapshot(format!(
                        "Failed to remove empty directory {}: {}",
                        dir.display(),
                        e
                    ))
                })?;
                tracing::info!("Removed empty directory {}", dir.display());
                report.removed_dirs.push(dir);
            }
        }
    }

    Ok(report)
}

async fn is_empty_dir(dir: &Path) -> Result<bool, Error> {
    let mut entries = fs::read_dir(dir).await?;
    Ok(entries.next_entry().await?.is_none())
}
