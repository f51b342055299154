//! # Local Workspace
//!
//! The engine needs exactly two things from the local side: the current
//! content of a file, and the content that was last synchronized for it. The
//! `Workspace` trait captures that contract so the orchestrator can be tested
//! against mock workspaces.
//!
//! `LocalWorkspace` is the on-disk implementation. Synchronized content is
//! kept in a staging area under `<root>/.sync/diff/`, mirroring the
//! repository's relative paths.

use std::fs;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use crate::error::{Error, Result};

/// Name of the per-repository metadata directory.
pub const SYNC_DIR: &str = ".sync";
/// Staging directory below `SYNC_DIR`.
pub const STAGING_DIR: &str = "diff";

/// Trait for local file access - allows mocking in tests
pub trait Workspace: Send + Sync {
    /// Current content of `file` in the working copy.
    fn read_current(&self, file: &str) -> Result<Vec<u8>>;

    /// Content recorded at the last successful synchronization, if any.
    fn last_synced(&self, file: &str) -> Result<Option<String>>;

    /// Records `content` as the synchronized state of `file`.
    fn mark_synced(&self, file: &str, content: &str) -> Result<()>;
}

/// A working directory on disk with its `.sync/diff/` staging area.
#[derive(Debug, Clone)]
pub struct LocalWorkspace {
    root: PathBuf,
}

impl LocalWorkspace {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn sync_dir(&self) -> PathBuf {
        self.root.join(SYNC_DIR)
    }

    pub fn staging_dir(&self) -> PathBuf {
        self.sync_dir().join(STAGING_DIR)
    }

    /// Creates the `.sync/diff/` directories.
    pub fn ensure_layout(&self) -> Result<()> {
        fs::create_dir_all(self.staging_dir())?;
        Ok(())
    }

    /// Path of `file` in the working copy.
    pub fn working_path(&self, file: &str) -> PathBuf {
        self.root.join(file)
    }

    fn staged_path(&self, file: &str) -> PathBuf {
        self.staging_dir().join(file)
    }

    /// Converts a user supplied path (absolute, or relative to `cwd`) into a
    /// `/`-separated path relative to the workspace root.
    pub fn relative_path(&self, cwd: &Path, path: &Path) -> Result<String> {
        let joined = if path.is_absolute() {
            path.to_path_buf()
        } else {
            cwd.join(path)
        };
        let root = lexical_normalize(&self.root);
        let full = lexical_normalize(&joined);
        let relative = full.strip_prefix(&root).map_err(|_| Error::DiffComputationFailed {
            path: path.display().to_string(),
            message: format!("outside of repository root {}", self.root.display()),
        })?;
        normalize_file(&relative.to_string_lossy())
    }
}

/// Removes `.` components and folds `..` without touching the filesystem.
fn lexical_normalize(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

/// Validates a repository-relative file path and normalizes it to `/`
/// separators.
///
/// Rejects empty paths, absolute paths, `..` components and anything inside
/// the `.sync` directory.
pub fn normalize_file(file: &str) -> Result<String> {
    let reject = |message: &str| Error::DiffComputationFailed {
        path: file.to_string(),
        message: message.to_string(),
    };

    let mut parts = Vec::new();
    for component in Path::new(&file.replace('\\', "/")).components() {
        match component {
            Component::Normal(part) => parts.push(part.to_string_lossy().into_owned()),
            Component::CurDir => {}
            Component::ParentDir => return Err(reject("parent directory components are not allowed")),
            Component::RootDir | Component::Prefix(_) => {
                return Err(reject("path must be relative to the repository root"))
            }
        }
    }

    if parts.is_empty() {
        return Err(reject("empty path"));
    }
    if parts[0] == SYNC_DIR {
        return Err(reject("files inside .sync are not tracked"));
    }
    Ok(parts.join("/"))
}

impl Workspace for LocalWorkspace {
    fn read_current(&self, file: &str) -> Result<Vec<u8>> {
        let path = self.working_path(file);
        fs::read(&path).map_err(|e| Error::DiffComputationFailed {
            path: file.to_string(),
            message: format!("cannot read {}: {}", path.display(), e),
        })
    }

    fn last_synced(&self, file: &str) -> Result<Option<String>> {
        match fs::read(self.staged_path(file)) {
            Ok(bytes) => String::from_utf8(bytes)
                .map(Some)
                .map_err(|e| Error::DiffComputationFailed {
                    path: file.to_string(),
                    message: format!("staged content is not UTF-8: {}", e),
                }),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn mark_synced(&self, file: &str, content: &str) -> Result<()> {
        let path = self.staged_path(file);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| Error::Filesystem {
                message: format!("Failed to create directory '{}': {}", parent.display(), e),
            })?;
        }
        fs::write(&path, content).map_err(|e| Error::Filesystem {
            message: format!("Failed to write staged file '{}': {}", path.display(), e),
        })
    }
}
