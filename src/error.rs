//! # Error Handling
//!
//! This module defines the centralized error type for `dynasync`. It uses the
//! `thiserror` library to build a single `Error` enum covering every failure
//! mode of the commit/synchronization engine, with messages that carry enough
//! context (repository, file, store key) to act on.
//!
//! ## Taxonomy
//!
//! The engine distinguishes per-file failures from repository-level ones:
//!
//! - **Per-file, non-fatal**: `DiffComputationFailed` and `RemoteWriteFailed`
//!   are collected into a commit report and never abort a multi-file commit.
//! - **Benign**: `RepoAlreadyExists` is the losing side of a concurrent
//!   `init` race and collapses into the "repository found" path.
//! - **Fatal for the operation**: `RepoNotFound`, `StoreUnavailable` and
//!   `TableNotFound` abort the whole command.
//! - **Rejected requests**: `UnknownFile` for tags on untracked files.
//! - **Warnings**: `OrphanedRecord` is logged, never returned to the user as a
//!   failure; the record is durable and a reconciliation scan can re-index it.
//!
//! `Result<T>` is the crate-wide alias for `std::result::Result<T, Error>`.

use thiserror::Error;

/// Main error type for dynasync operations
#[derive(Error, Debug)]
pub enum Error {
    /// A diff could not be computed for a local file.
    ///
    /// Raised when the file cannot be read, is not valid UTF-8, or its path
    /// does not resolve inside the repository root.
    #[error("Diff computation failed for {path}: {message}")]
    DiffComputationFailed { path: String, message: String },

    /// The remote store rejected a write or could not be reached while writing.
    ///
    /// Retrying is always safe: commit records are never overwritten with
    /// different content and index updates are set unions.
    #[error("Remote write failed for {key}: {message}")]
    RemoteWriteFailed { key: String, message: String },

    /// The remote store could not serve a read.
    #[error("Remote read failed for {key}: {message}")]
    RemoteReadFailed { key: String, message: String },

    /// The remote store itself is not usable (missing root, permissions).
    #[error("Remote store unavailable at {location}: {message}")]
    StoreUnavailable { location: String, message: String },

    /// A table was addressed before it was provisioned.
    #[error("Table not found: {table}")]
    TableNotFound { table: String },

    /// Another client created the repository first.
    #[error("Repository already exists: {repo}")]
    RepoAlreadyExists { repo: String },

    /// The repository has no index in the remote store.
    #[error("Repository not found: {repo}")]
    RepoNotFound { repo: String },

    /// A file is referenced that the repository has never tracked.
    #[error("Unknown file '{file}' in repository {repo}")]
    UnknownFile { repo: String, file: String },

    /// A commit record was written but the repository index was not updated.
    #[error("Orphaned record {repo}/{file}@{commit_date}: {message}")]
    OrphanedRecord {
        repo: String,
        file: String,
        commit_date: i64,
        message: String,
    },

    /// A stored diff could not be applied to the content reconstructed so far.
    #[error("Replay failed for {file}: {message}")]
    ReplayFailed { file: String, message: String },

    /// A stored item is missing an attribute or has the wrong attribute type.
    #[error("Malformed item: {message}")]
    MalformedItem { message: String },

    /// A configuration file could not be parsed or is inconsistent.
    #[error("Configuration parsing error: {message}{}", hint.as_ref().map(|h| format!("\n  hint: {}", h)).unwrap_or_default())]
    ConfigParse {
        message: String,
        /// Optional hint for how to fix the configuration issue
        hint: Option<String>,
    },

    /// No `.sync/` directory was found in the start directory or its parents.
    #[error("Repository configuration not found from {path}")]
    ConfigNotFound { path: String },

    /// An error occurred while materializing files on disk.
    #[error("Filesystem operation error: {message}")]
    Filesystem { message: String },

    /// An error indicating that a mutex has been poisoned.
    #[error("Lock poisoned: {context}")]
    LockPoisoned { context: String },

    /// An I/O error, wrapped from `std::io::Error`.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A YAML parsing error, wrapped from `serde_yaml::Error`.
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A JSON encoding error, wrapped from `serde_json::Error`.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Whether the error aborts a whole operation instead of a single file.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::RepoNotFound { .. } | Error::StoreUnavailable { .. } | Error::TableNotFound { .. }
        )
    }
}

/// A convenient type alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;
