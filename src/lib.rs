//! # dynasync
//!
//! A minimal distributed version-control engine. Changes to tracked files are
//! captured as diffs and pushed as immutable commit records to a shared store,
//! so collaborators or a fresh clone can rebuild every file by replaying its
//! history.
//!
//! ## Quick Example
//!
//! ```
//! use dynasync::clone::Reconstructor;
//! use dynasync::config::EngineConfig;
//! use dynasync::index::init_repo;
//! use dynasync::orchestrator::CommitOrchestrator;
//! use dynasync::store::MemoryStore;
//! use dynasync::workspace::LocalWorkspace;
//!
//! let dir = tempfile::tempdir().unwrap();
//! std::fs::write(dir.path().join("a.txt"), "hello").unwrap();
//!
//! let store = MemoryStore::new();
//! init_repo(&store, "repo-proj", "alice", 0).unwrap();
//!
//! let workspace = LocalWorkspace::new(dir.path());
//! let mut orchestrator = CommitOrchestrator::new(&store, &workspace, EngineConfig::default());
//! let report = orchestrator
//!     .commit("repo-proj", &["a.txt".to_string()], "first", "alice")
//!     .unwrap();
//! assert_eq!(report.committed.len(), 1);
//!
//! let rebuilt = Reconstructor::new(&store).reconstruct("repo-proj").unwrap();
//! assert_eq!(rebuilt.tree.get_file("a.txt"), Some("hello"));
//! ```
//!
//! ## Core Concepts
//!
//! - **Store (`store`)**: the only shared mutable resource. A `RemoteStore`
//!   offers put, conditional put, set-union update, get and ordered query.
//!   `MemoryStore` and the directory-backed `FileStore` implement it.
//! - **Diffs (`diff`)**: `DiffComputer` turns last-synchronized and current
//!   content into a `Patch`; `replay` folds ordered patches back into content.
//! - **Records (`record`)**: immutable `CommitRecord`s, identified per file by
//!   a strictly increasing `commit_date`.
//! - **Index (`index`)**: the `RepoIndex`, a union-merged set of files and
//!   commit ids per repository, plus atomic repository creation.
//! - **Commit (`orchestrator`)**: diff, build, write and index each file,
//!   isolating per-file failures in a `CommitReport`.
//! - **Clone (`clone`)**: rebuild all files of a repository from their
//!   records.
//! - **Tags (`tag`)**: sets of labels on tracked files.
//!
//! The binary adds configuration files (`config`), a local staging area
//! (`workspace`) and the command-line front end.

pub mod clone;
pub mod config;
pub mod defaults;
pub mod diff;
pub mod error;
pub mod filesystem;
pub mod index;
pub mod orchestrator;
pub mod output;
pub mod record;
pub mod store;
pub mod suggestions;
pub mod tag;
pub mod workspace;

#[cfg(test)]
mod sync_proptest;
