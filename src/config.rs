//! # Configuration
//!
//! Three layers of configuration, none of them process-wide mutable state:
//!
//! - **`EngineConfig`**: the settings the commit engine needs, passed
//!   explicitly into `CommitOrchestrator::new`.
//! - **`RepoConfig`**: per working copy, stored in `.sync/repo.yaml`. Names the
//!   repository and the store it syncs with.
//! - **`GlobalConfig`**: per user, stored in `<config dir>/dynasync/global.yaml`.
//!   Provides defaults for the store location and the author identity.
//!
//! Both files are YAML and parsed with `serde_yaml`. Missing optional fields
//! fall back to defaults so older files keep loading.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::diff::DiffFormat;
use crate::error::{Error, Result};
use crate::workspace::SYNC_DIR;

/// File name of the repository configuration inside `.sync/`.
pub const REPO_CONFIG_FILE: &str = "repo.yaml";
/// Prefix of every repository name.
pub const REPO_PREFIX: &str = "repo-";

/// Settings of the commit engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineConfig {
    /// Encoding of diffs for files that already have history
    pub diff_format: DiffFormat,
    /// Write commit records of one commit concurrently
    pub parallel_writes: bool,
}

/// Contents of `.sync/repo.yaml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoConfig {
    /// Repository name, always starting with `repo-`
    pub name: String,
    /// Location of the shared store
    pub store: PathBuf,
    #[serde(default)]
    pub diff_format: DiffFormat,
    #[serde(default)]
    pub parallel_writes: bool,
}

impl RepoConfig {
    pub fn new(name: &str, store: PathBuf) -> Self {
        Self {
            name: name.to_string(),
            store,
            diff_format: DiffFormat::default(),
            parallel_writes: false,
        }
    }

    pub fn engine(&self) -> EngineConfig {
        EngineConfig {
            diff_format: self.diff_format,
            parallel_writes: self.parallel_writes,
        }
    }

    /// Path of the config file for the working copy rooted at `root`.
    pub fn path(root: &Path) -> PathBuf {
        root.join(SYNC_DIR).join(REPO_CONFIG_FILE)
    }

    pub fn parse(yaml_content: &str) -> Result<Self> {
        serde_yaml::from_str(yaml_content).map_err(|e| Error::ConfigParse {
            message: e.to_string(),
            hint: Some(format!(
                "Check {}/{} or run 'dynasync init' again",
                SYNC_DIR, REPO_CONFIG_FILE
            )),
        })
    }

    pub fn load(root: &Path) -> Result<Self> {
        let content = fs::read_to_string(Self::path(root)).map_err(Error::Io)?;
        Self::parse(&content)
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        let path = Self::path(root);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, serde_yaml::to_string(self)?)?;
        Ok(())
    }
}

/// Contents of the per-user `global.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub store: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
}

impl GlobalConfig {
    /// Loads the file at `path`; a missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        match fs::read_to_string(path) {
            Ok(content) => serde_yaml::from_str(&content).map_err(|e| Error::ConfigParse {
                message: format!("{}: {}", path.display(), e),
                hint: None,
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e.into()),
        }
    }

    /// Writes the file only if it does not exist yet. Returns `true` if written.
    pub fn save_if_absent(&self, path: &Path) -> Result<bool> {
        if path.exists() {
            return Ok(false);
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_yaml::to_string(self)?)?;
        Ok(true)
    }
}

/// Finds the root of the working copy containing `start`: the closest
/// ancestor (or `start` itself) with a `.sync/` directory.
pub fn find_repo_root(start: &Path) -> Result<PathBuf> {
    start
        .ancestors()
        .find(|dir| dir.join(SYNC_DIR).is_dir())
        .map(Path::to_path_buf)
        .ok_or_else(|| Error::ConfigNotFound {
            path: start.display().to_string(),
        })
}

/// Repository name for `init`: `repo-<name>`, or `repo-<basename of dir>`
/// when no name is given.
pub fn repo_name(name: Option<&str>, dir: &Path) -> Result<String> {
    let base = match name {
        Some(name) => name.trim().to_string(),
        None => dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default(),
    };
    if base.is_empty() || base == REPO_PREFIX {
        return Err(Error::ConfigParse {
            message: "repository name is empty".to_string(),
            hint: Some("Pass a name: dynasync init <NAME>".to_string()),
        });
    }
    if base.starts_with(REPO_PREFIX) {
        Ok(base)
    } else {
        Ok(format!("{}{}", REPO_PREFIX, base))
    }
}
