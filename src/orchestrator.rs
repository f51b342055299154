//! # Commit Orchestrator
//!
//! Executes a `commit` over a list of files sharing one message. The files
//! form one logical operation but are committed independently; there is no
//! all-or-nothing guarantee across them.
//!
//! ## Per-file pipeline
//!
//! 1.  **Diff**: compare the working copy with the last synchronized content.
//!     Unchanged files are skipped, not reported as errors.
//! 2.  **Build**: wrap the patch in a `CommitRecord` with a fresh, strictly
//!     increasing `commit_date`.
//! 3.  **Write**: create the record under `(repo, commit#file, commit_date)`.
//!     The write never replaces an existing item. Finding the identical
//!     record already stored means an earlier attempt of the same write
//!     landed; finding a different one means another writer took the same
//!     identifier, and this file fails with `RemoteWriteFailed` so the caller
//!     can commit it again under a fresh identifier.
//! 4.  **Index**: union the file and commit id into the repository index, and
//!     mark the content as synchronized locally.
//!
//! A failure in steps 1-3 fails only that file: nothing is indexed and the
//! staging area keeps the previous content. A failure in step 4 leaves an
//! orphaned record, which is logged and reported but still counts as
//! committed, because the record is durable history.
//!
//! Records are built sequentially so identifiers follow file order; with
//! `parallel_writes` the store writes of step 3 then run concurrently.

use log::{debug, info, warn};
use rayon::prelude::*;
use std::collections::HashSet;

use crate::config::EngineConfig;
use crate::diff::DiffComputer;
use crate::error::{Error, Result};
use crate::index::IndexMerger;
use crate::record::{CommitClock, CommitRecord, RecordBuilder};
use crate::store::{PutOutcome, RemoteStore};
use crate::workspace::{normalize_file, Workspace};

/// A file whose record was written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommittedFile {
    pub file: String,
    pub commit_date: i64,
    /// The record is durable but the index update failed
    pub orphaned: bool,
}

/// A file that did not make it into history.
#[derive(Debug)]
pub struct FailedFile {
    pub file: String,
    pub error: Error,
}

/// Partial result of a multi-file commit, each list in processing order.
#[derive(Debug, Default)]
pub struct CommitReport {
    pub committed: Vec<CommittedFile>,
    pub unchanged: Vec<String>,
    pub failed: Vec<FailedFile>,
}

impl CommitReport {
    /// Whether every requested file was either committed or unchanged.
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn orphaned(&self) -> impl Iterator<Item = &CommittedFile> {
        self.committed.iter().filter(|c| c.orphaned)
    }
}

/// A record ready to be written, with the content it synchronizes.
struct Pending {
    record: CommitRecord,
    content: String,
}

/// Coordinates diffing, record building, store writes and index merges.
pub struct CommitOrchestrator<'a> {
    store: &'a dyn RemoteStore,
    workspace: &'a dyn Workspace,
    config: EngineConfig,
    clock: CommitClock,
}

impl<'a> CommitOrchestrator<'a> {
    pub fn new(store: &'a dyn RemoteStore, workspace: &'a dyn Workspace, config: EngineConfig) -> Self {
        Self::with_clock(store, workspace, config, CommitClock::system())
    }

    /// Uses a specific clock, mainly for deterministic tests.
    pub fn with_clock(
        store: &'a dyn RemoteStore,
        workspace: &'a dyn Workspace,
        config: EngineConfig,
        clock: CommitClock,
    ) -> Self {
        Self {
            store,
            workspace,
            config,
            clock,
        }
    }

    /// Commits `files` to `repo`.
    ///
    /// Returns `Err` only for repository-level failures (repository missing,
    /// store unreachable); everything per file lands in the report.
    pub fn commit(
        &mut self,
        repo: &str,
        files: &[String],
        message: &str,
        author: &str,
    ) -> Result<CommitReport> {
        self.check_repository(repo)?;

        let mut report = CommitReport::default();
        let pending = self.prepare(repo, files, message, author, &mut report);
        let writes = self.write(repo, &pending);
        self.finish(repo, pending, writes, &mut report);

        info!(
            "commit to {}: {} committed, {} unchanged, {} failed",
            repo,
            report.committed.len(),
            report.unchanged.len(),
            report.failed.len()
        );
        Ok(report)
    }

    fn check_repository(&self, repo: &str) -> Result<()> {
        IndexMerger::new(self.store).fetch(repo)?;
        if self.store.describe_table(repo)?.is_none() {
            return Err(Error::RepoNotFound {
                repo: repo.to_string(),
            });
        }
        Ok(())
    }

    /// Steps 1 and 2 for every file, in order.
    fn prepare(
        &mut self,
        repo: &str,
        files: &[String],
        message: &str,
        author: &str,
        report: &mut CommitReport,
    ) -> Vec<Pending> {
        let computer = DiffComputer::new(self.config.diff_format);
        let workspace = self.workspace;
        let mut builder = RecordBuilder::new(repo, author, message, &mut self.clock);
        let mut seen = HashSet::new();
        let mut pending = Vec::new();

        for requested in files {
            let file = match normalize_file(requested) {
                Ok(file) => file,
                Err(error) => {
                    report.failed.push(FailedFile {
                        file: requested.clone(),
                        error,
                    });
                    continue;
                }
            };
            // A second diff against the same synced base would not replay.
            if !seen.insert(file.clone()) {
                continue;
            }

            let prepared = workspace.read_current(&file).and_then(|bytes| {
                let last = workspace.last_synced(&file)?;
                let patch = computer.compute_bytes(&file, last.as_deref(), &bytes)?;
                match patch {
                    None => Ok(None),
                    Some(patch) => {
                        let record = builder.build(&file, &patch)?;
                        // compute_bytes already validated UTF-8
                        let content = String::from_utf8_lossy(&bytes).into_owned();
                        Ok(Some(Pending { record, content }))
                    }
                }
            });

            match prepared {
                Ok(Some(p)) => pending.push(p),
                Ok(None) => {
                    debug!("{} is unchanged, skipping", file);
                    report.unchanged.push(file);
                }
                Err(error) => report.failed.push(FailedFile { file, error }),
            }
        }
        pending
    }

    /// Step 3. Results are in the same order as `pending`.
    fn write(&self, repo: &str, pending: &[Pending]) -> Vec<Result<()>> {
        let store = self.store;
        let create = |p: &Pending| create_record(store, repo, &p.record);
        if self.config.parallel_writes {
            pending.par_iter().map(create).collect()
        } else {
            pending.iter().map(create).collect()
        }
    }

    /// Step 4, in file order.
    fn finish(
        &self,
        repo: &str,
        pending: Vec<Pending>,
        writes: Vec<Result<()>>,
        report: &mut CommitReport,
    ) {
        let merger = IndexMerger::new(self.store);

        for (Pending { record, content }, written) in pending.into_iter().zip(writes) {
            if let Err(error) = written {
                warn!("{} was not committed: {}", record.file, error);
                report.failed.push(FailedFile {
                    file: record.file,
                    error,
                });
                continue;
            }

            if let Err(e) = self.workspace.mark_synced(&record.file, &content) {
                warn!(
                    "{}@{} is committed but the staging area was not updated: {}",
                    record.file, record.commit_date, e
                );
            }

            let orphaned = match merger.merge_commit(repo, &record.file, record.commit_date) {
                Ok(()) => false,
                Err(e) => {
                    let orphan = Error::OrphanedRecord {
                        repo: repo.to_string(),
                        file: record.file.clone(),
                        commit_date: record.commit_date,
                        message: e.to_string(),
                    };
                    warn!("{}", orphan);
                    true
                }
            };

            info!("committed {}@{}", record.file, record.commit_date);
            report.committed.push(CommittedFile {
                file: record.file,
                commit_date: record.commit_date,
                orphaned,
            });
        }
    }
}

/// Writes `record` only if its key is still free.
fn create_record(store: &dyn RemoteStore, repo: &str, record: &CommitRecord) -> Result<()> {
    let key = record.key();
    let item = record.to_item();
    match store.conditional_put_item(repo, &key, &item)? {
        PutOutcome::Created => Ok(()),
        PutOutcome::AlreadyExists => match store.get_item(repo, &key)? {
            Some(existing) if existing == item => {
                debug!("{} is already stored, write confirmed", key);
                Ok(())
            }
            _ => Err(Error::RemoteWriteFailed {
                key: key.to_string(),
                message: "commit identifier already taken by another record".to_string(),
            }),
        },
    }
}
