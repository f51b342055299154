//! # Commit Command Implementation
//!
//! Commits the named files (or, with `--all`, every file in the working
//! copy) with one shared message. Each file is committed independently: the
//! command prints one status line per file and exits non-zero if any file
//! failed, after the others have been committed.

use anyhow::Result;
use clap::Args;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use dynasync::orchestrator::CommitOrchestrator;
use dynasync::output::FileStatus;
use dynasync::suggestions;
use dynasync::workspace::SYNC_DIR;

use super::{explain, resolve_author, GlobalOptions, WorkingCopy};

/// Commit changed files to the shared store
#[derive(Args, Debug)]
pub struct CommitArgs {
    /// Commit message shared by all files
    #[arg(short, long, value_name = "MSG")]
    pub message: String,

    /// Files to commit
    #[arg(value_name = "FILES")]
    pub files: Vec<PathBuf>,

    /// Commit every file in the working copy
    #[arg(short, long, conflicts_with = "files")]
    pub all: bool,

    /// Author recorded on the commit
    #[arg(long, value_name = "NAME", env = "DYNASYNC_AUTHOR")]
    pub author: Option<String>,
}

/// Every regular file below `root`, outside `.sync/`, in a stable order.
fn all_files(root: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let walker = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| entry.depth() != 1 || entry.file_name() != SYNC_DIR);
    for entry in walker {
        let entry = entry?;
        if entry.file_type().is_file() {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

/// Execute the `commit` command.
pub fn execute(args: CommitArgs, globals: &GlobalOptions) -> Result<()> {
    let copy = WorkingCopy::open(globals)?;
    let output = globals.output();
    let author = resolve_author(args.author.as_deref(), &copy.global);

    let paths = if args.all {
        all_files(copy.workspace.root())?
    } else {
        args.files
    };
    if paths.is_empty() {
        return Err(suggestions::nothing_to_commit());
    }

    let mut rejected = 0;
    let mut files = Vec::new();
    for path in &paths {
        match copy.relative(path) {
            Ok(file) => files.push(file),
            Err(e) => {
                println!("{}", output.status_line(FileStatus::Failed, &path.display().to_string()));
                eprintln!("  {}", e);
                rejected += 1;
            }
        }
    }

    let repo = copy.config.name.clone();
    let mut orchestrator =
        CommitOrchestrator::new(&copy.store, &copy.workspace, copy.config.engine());
    let report = orchestrator
        .commit(&repo, &files, &args.message, &author)
        .map_err(|e| explain(e, &copy.store))?;

    for committed in &report.committed {
        let status = if committed.orphaned {
            FileStatus::Orphaned
        } else {
            FileStatus::Committed
        };
        println!("{}", output.status_line(status, &committed.file));
    }
    for file in &report.unchanged {
        println!("{}", output.status_line(FileStatus::Unchanged, file));
    }
    for failed in &report.failed {
        println!("{}", output.status_line(FileStatus::Failed, &failed.file));
        eprintln!("  {}", failed.error);
    }

    let failures = rejected + report.failed.len();
    if failures > 0 {
        anyhow::bail!(
            "{} of {} files failed to commit to {}",
            failures,
            paths.len(),
            repo
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_all_files_skips_sync_dir() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::create_dir_all(root.join(".sync/diff")).unwrap();
        fs::create_dir_all(root.join("src/nested")).unwrap();
        fs::write(root.join(".sync/repo.yaml"), "name: repo-x").unwrap();
        fs::write(root.join(".sync/diff/a.txt"), "old").unwrap();
        fs::write(root.join("a.txt"), "a").unwrap();
        fs::write(root.join("src/nested/b.rs"), "b").unwrap();

        let files: Vec<PathBuf> = all_files(root)
            .unwrap()
            .into_iter()
            .map(|p| p.strip_prefix(root).unwrap().to_path_buf())
            .collect();
        assert_eq!(
            files,
            vec![PathBuf::from("a.txt"), PathBuf::from("src/nested/b.rs")]
        );
    }
}
