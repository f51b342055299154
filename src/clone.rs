//! # Clone and Reconstruction
//!
//! Rebuilds a repository's files from their commit records. For every file in
//! the repository index, all records of `(repo, file)` are fetched, sorted by
//! `CommitRecord::replay_order` and replayed starting from empty content.
//!
//! Reconstruction is deterministic: the record set alone decides the output,
//! so two clones of the same repository state are byte-identical.
//!
//! The whole repository is rebuilt in a `MemoryFS` first and written to disk
//! afterwards. Index entries come from a shared store, so each one must be a
//! safe repository-relative path. A file with an unsafe path, a malformed
//! record or a history that does not replay is skipped and reported; the
//! rest of the repository is still rebuilt.

use log::{debug, info, warn};

use crate::diff::{replay, Patch};
use crate::error::{Error, Result};
use crate::filesystem::MemoryFS;
use crate::index::IndexMerger;
use crate::record::{commit_partition, CommitRecord};
use crate::store::RemoteStore;
use crate::workspace::{normalize_file, LocalWorkspace, Workspace};

/// A tracked file that could not be rebuilt.
#[derive(Debug)]
pub struct SkippedFile {
    pub file: String,
    pub error: Error,
}

/// Result of rebuilding a repository: the files that replayed, plus the ones
/// left out, in index order.
#[derive(Debug, Default)]
pub struct Reconstruction {
    pub tree: MemoryFS,
    pub skipped: Vec<SkippedFile>,
}

impl Reconstruction {
    /// Whether every indexed file with records was rebuilt.
    pub fn is_complete(&self) -> bool {
        self.skipped.is_empty()
    }
}

/// Reads commit history out of a store.
pub struct Reconstructor<'a> {
    store: &'a dyn RemoteStore,
}

impl<'a> Reconstructor<'a> {
    pub fn new(store: &'a dyn RemoteStore) -> Self {
        Self { store }
    }

    /// All records of `file`, in replay order.
    pub fn history(&self, repo: &str, file: &str) -> Result<Vec<CommitRecord>> {
        let items = match self
            .store
            .query(repo, &commit_partition(file), i64::MIN..=i64::MAX)
        {
            Ok(items) => items,
            Err(Error::TableNotFound { .. }) => {
                return Err(Error::RepoNotFound {
                    repo: repo.to_string(),
                })
            }
            Err(e) => return Err(e),
        };

        let mut records = items
            .iter()
            .map(|(_, item)| CommitRecord::from_item(item))
            .collect::<Result<Vec<_>>>()?;
        records.sort_by(CommitRecord::replay_order);
        debug!("{} has {} records in {}", file, records.len(), repo);
        Ok(records)
    }

    /// Final content of `file`, or `None` if it has no records.
    pub fn reconstruct_file(&self, repo: &str, file: &str) -> Result<Option<String>> {
        let records = self.history(repo, file)?;
        if records.is_empty() {
            return Ok(None);
        }
        replay_records(file, &records).map(Some)
    }

    /// Rebuilds every tracked file of `repo` in memory.
    pub fn reconstruct(&self, repo: &str) -> Result<Reconstruction> {
        self.reconstruct_with(repo, |_, _| {})
    }

    /// Like `reconstruct`, calling `on_file(file, total)` after each file.
    ///
    /// Store and repository errors abort; per-file data errors only skip
    /// that file.
    pub fn reconstruct_with<F>(&self, repo: &str, mut on_file: F) -> Result<Reconstruction>
    where
        F: FnMut(&str, usize),
    {
        let index = IndexMerger::new(self.store).fetch(repo)?;
        let total = index.files.len();
        let mut result = Reconstruction::default();

        for file in &index.files {
            match self.rebuild_entry(repo, file) {
                Ok(Some((path, content))) => result.tree.add_file(&path, content),
                // Index got ahead of the records, e.g. a record write that
                // was never confirmed.
                Ok(None) => warn!("{} is indexed in {} but has no commit records", file, repo),
                Err(error @ (Error::MalformedItem { .. } | Error::ReplayFailed { .. })) => {
                    warn!("skipping {} in {}: {}", file, repo, error);
                    result.skipped.push(SkippedFile {
                        file: file.clone(),
                        error,
                    });
                }
                Err(e) => return Err(e),
            }
            on_file(file, total);
        }
        Ok(result)
    }

    /// Validates an index entry as a relative path, then replays it.
    fn rebuild_entry(&self, repo: &str, file: &str) -> Result<Option<(String, String)>> {
        let path = normalize_file(file).map_err(|e| Error::MalformedItem {
            message: format!("index entry '{}' is not a repository path: {}", file, e),
        })?;
        if path != file {
            return Err(Error::MalformedItem {
                message: format!("index entry '{}' is not in normalized form", file),
            });
        }
        Ok(self
            .reconstruct_file(repo, file)?
            .map(|content| (path, content)))
    }

    /// Reconstructs `repo` into `workspace` and seeds its staging area, so
    /// the new working copy can commit right away.
    pub fn clone_into(&self, repo: &str, workspace: &LocalWorkspace) -> Result<Reconstruction> {
        let result = self.reconstruct(repo)?;
        install(&result.tree, workspace)?;
        Ok(result)
    }
}

/// Writes a reconstructed tree into `workspace` and records every file as
/// synchronized.
pub fn install(tree: &MemoryFS, workspace: &LocalWorkspace) -> Result<()> {
    workspace.ensure_layout()?;
    tree.write_to(workspace.root())?;
    for (file, content) in tree.files() {
        workspace.mark_synced(file, content)?;
        info!("cloned {}", file);
    }
    Ok(())
}

/// Replays `records` (already in replay order) from empty content.
pub fn replay_records(file: &str, records: &[CommitRecord]) -> Result<String> {
    let patches = records
        .iter()
        .map(|record| {
            record.patch().map_err(|e| Error::MalformedItem {
                message: format!("{}@{} has an unreadable diff: {}", file, record.commit_date, e),
            })
        })
        .collect::<Result<Vec<Patch>>>()?;
    replay("", &patches).map_err(|e| Error::ReplayFailed {
        file: file.to_string(),
        message: e.to_string(),
    })
}
