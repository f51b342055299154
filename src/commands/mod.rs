//! # CLI Command Implementations
//!
//! Each subcommand lives in its own file with an `Args` struct derived with
//! `clap` and an `execute` function calling into the `dynasync` library.
//!
//! This module holds what several commands share: resolving the store and
//! author from flags and config files, and opening the working copy.

pub mod clone;
pub mod commit;
pub mod completions;
pub mod init;
pub mod log;
pub mod tag;

use anyhow::Result;
use std::env;
use std::path::{Path, PathBuf};

use dynasync::config::{find_repo_root, GlobalConfig, RepoConfig};
use dynasync::defaults;
use dynasync::error::Error;
use dynasync::output::OutputConfig;
use dynasync::store::{FileStore, RemoteStore};
use dynasync::suggestions;
use dynasync::workspace::LocalWorkspace;

/// Options accepted by every subcommand.
#[derive(Debug, Clone, Default)]
pub struct GlobalOptions {
    /// `--store` / `DYNASYNC_STORE`
    pub store: Option<PathBuf>,
    /// `--color`
    pub color: String,
}

impl GlobalOptions {
    pub fn output(&self) -> OutputConfig {
        OutputConfig::from_env_and_flag(&self.color)
    }
}

/// Store location: flag or env, then repo config, then global config, then
/// the platform default.
pub fn resolve_store(
    flag: Option<&Path>,
    repo: Option<&RepoConfig>,
    global: &GlobalConfig,
) -> PathBuf {
    flag.map(Path::to_path_buf)
        .or_else(|| repo.map(|r| r.store.clone()))
        .or_else(|| global.store.clone())
        .unwrap_or_else(defaults::default_store_root)
}

/// Author: flag or env, then global config, then the login name.
pub fn resolve_author(flag: Option<&str>, global: &GlobalConfig) -> String {
    flag.map(str::to_string)
        .filter(|a| !a.trim().is_empty())
        .or_else(|| global.author.clone())
        .unwrap_or_else(defaults::default_author)
}

pub fn load_global() -> Result<GlobalConfig> {
    Ok(GlobalConfig::load(&defaults::global_config_path())?)
}

/// Turns library errors into user-facing ones where a hint helps.
pub fn explain(error: Error, store: &dyn RemoteStore) -> anyhow::Error {
    match error {
        Error::RepoNotFound { repo } => suggestions::repo_not_found(&repo, &store.location()),
        other => other.into(),
    }
}

/// An initialized working copy and the store it syncs with.
pub struct WorkingCopy {
    pub cwd: PathBuf,
    pub workspace: LocalWorkspace,
    pub config: RepoConfig,
    pub global: GlobalConfig,
    pub store: FileStore,
}

impl WorkingCopy {
    /// Finds the working copy containing the current directory.
    pub fn open(globals: &GlobalOptions) -> Result<Self> {
        let cwd = env::current_dir()?;
        let root = match find_repo_root(&cwd) {
            Ok(root) => root,
            Err(Error::ConfigNotFound { .. }) => return Err(suggestions::not_a_working_copy(&cwd)),
            Err(e) => return Err(e.into()),
        };
        let config = RepoConfig::load(&root)?;
        let global = load_global()?;
        let store_path = resolve_store(globals.store.as_deref(), Some(&config), &global);
        let store = FileStore::open(&store_path)?;

        Ok(Self {
            cwd,
            workspace: LocalWorkspace::new(root),
            config,
            global,
            store,
        })
    }

    /// Repository-relative form of a path given on the command line.
    pub fn relative(&self, path: &Path) -> dynasync::error::Result<String> {
        self.workspace.relative_path(&self.cwd, path)
    }
}
