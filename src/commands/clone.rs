//! # Clone Command Implementation
//!
//! Rebuilds a repository from the store into a new directory: every tracked
//! file is replayed from its commit records, written out, and recorded in
//! the staging area. The new directory is a working copy that can commit
//! right away.

use anyhow::Result;
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use std::env;
use std::path::PathBuf;

use dynasync::clone::{install, Reconstructor};
use dynasync::config::{RepoConfig, REPO_PREFIX};
use dynasync::output::FileStatus;
use dynasync::store::FileStore;
use dynasync::suggestions;
use dynasync::workspace::LocalWorkspace;

use super::{explain, load_global, resolve_store, GlobalOptions};

/// Rebuild a repository into a new directory
#[derive(Args, Debug)]
pub struct CloneArgs {
    /// Repository name
    #[arg(value_name = "REPO")]
    pub repo: String,

    /// Destination directory (defaults to the name without its `repo-` prefix)
    #[arg(value_name = "DIR")]
    pub dir: Option<PathBuf>,
}

/// Execute the `clone` command.
pub fn execute(args: CloneArgs, globals: &GlobalOptions) -> Result<()> {
    let repo = if args.repo.starts_with(REPO_PREFIX) {
        args.repo.clone()
    } else {
        format!("{}{}", REPO_PREFIX, args.repo)
    };
    let dest = match args.dir {
        Some(dir) => dir,
        None => env::current_dir()?.join(repo.trim_start_matches(REPO_PREFIX)),
    };
    if RepoConfig::path(&dest).exists() {
        return Err(suggestions::clone_destination_in_use(&dest));
    }

    let global = load_global()?;
    let store_path = resolve_store(globals.store.as_deref(), None, &global);
    let store = FileStore::open(&store_path)?;

    let bar = ProgressBar::new(0);
    bar.set_style(
        ProgressStyle::with_template("{bar:30} {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );
    let result = Reconstructor::new(&store)
        .reconstruct_with(&repo, |file, total| {
            bar.set_length(total as u64);
            bar.set_message(file.to_string());
            bar.inc(1);
        })
        .map_err(|e| explain(e, &store))?;
    bar.finish_and_clear();

    let workspace = LocalWorkspace::new(&dest);
    install(&result.tree, &workspace)?;
    RepoConfig::new(&repo, store_path).save(&dest)?;

    let output = globals.output();
    for skipped in &result.skipped {
        println!("{}", output.status_line(FileStatus::Failed, &skipped.file));
        eprintln!("  {}", skipped.error);
    }
    println!(
        "Cloned {} ({} files) into {}",
        repo,
        result.tree.len(),
        dest.display()
    );
    if !result.is_complete() {
        anyhow::bail!(
            "{} of {} files in {} could not be reconstructed",
            result.skipped.len(),
            result.skipped.len() + result.tree.len(),
            repo
        );
    }
    Ok(())
}
