//! # Init Command Implementation
//!
//! Starts tracking the current directory. The repository is created in the
//! store if it does not exist yet; if another client created it first (even
//! concurrently) the existing repository is used instead.
//!
//! Writes `.sync/repo.yaml`, creates the `.sync/diff/` staging area, and
//! writes the per-user `global.yaml` on first use.

use anyhow::Result;
use clap::Args;
use std::env;
use std::path::Path;

use dynasync::config::{repo_name, GlobalConfig, RepoConfig};
use dynasync::defaults;
use dynasync::diff::DiffFormat;
use dynasync::index::{init_repo, InitOutcome};
use dynasync::record::CommitClock;
use dynasync::store::FileStore;
use dynasync::workspace::LocalWorkspace;

use super::{resolve_author, resolve_store, GlobalOptions};

/// Track the current directory as a repository
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Repository name, prefixed with `repo-` (defaults to the directory name)
    #[arg(value_name = "NAME")]
    pub name: Option<String>,

    /// Diff format for later commits (lines, snapshot)
    #[arg(long, value_name = "FORMAT")]
    pub diff_format: Option<String>,

    /// Write the records of one commit concurrently
    #[arg(long)]
    pub parallel_writes: bool,

    /// Owner recorded when the repository is created
    #[arg(long, value_name = "NAME", env = "DYNASYNC_AUTHOR")]
    pub author: Option<String>,
}

/// Execute the `init` command.
pub fn execute(args: InitArgs, globals: &GlobalOptions) -> Result<()> {
    let cwd = env::current_dir()?;
    run(args, globals, &cwd, &defaults::global_config_path())
}

fn run(args: InitArgs, globals: &GlobalOptions, dir: &Path, global_path: &Path) -> Result<()> {
    let diff_format = args
        .diff_format
        .as_deref()
        .map(str::parse::<DiffFormat>)
        .transpose()?;
    let existing = RepoConfig::path(dir)
        .exists()
        .then(|| RepoConfig::load(dir))
        .transpose()?;
    let name = repo_name(args.name.as_deref(), dir)?;
    let global = GlobalConfig::load(global_path)?;
    let store_path = resolve_store(globals.store.as_deref(), existing.as_ref(), &global);
    let owner = resolve_author(args.author.as_deref(), &global);

    let store = FileStore::open(&store_path)?;
    let outcome = init_repo(&store, &name, &owner, CommitClock::system().now())?;

    let workspace = LocalWorkspace::new(dir);
    workspace.ensure_layout()?;

    let mut config = existing.unwrap_or_else(|| RepoConfig::new(&name, store_path.clone()));
    config.name = name.clone();
    config.store = store_path.clone();
    if let Some(format) = diff_format {
        config.diff_format = format;
    }
    if args.parallel_writes {
        config.parallel_writes = true;
    }
    config.save(dir)?;

    let written = GlobalConfig {
        store: Some(store_path.clone()),
        author: Some(owner),
    }
    .save_if_absent(global_path)?;
    if written {
        log::info!("wrote {}", global_path.display());
    }

    match outcome {
        InitOutcome::Created => println!("Created repository {} in {}", name, store_path.display()),
        InitOutcome::Found => println!(
            "Found existing repository {} in {}",
            name,
            store_path.display()
        ),
    }
    Ok(())
}
