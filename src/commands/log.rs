//! # Log Command Implementation
//!
//! Prints commit history in replay order: for one file, or for every file the
//! repository tracks. Tags are shown next to each file.

use anyhow::Result;
use clap::Args;
use std::path::PathBuf;

use dynasync::clone::Reconstructor;
use dynasync::index::IndexMerger;
use dynasync::record::CommitRecord;
use dynasync::tag::TagManager;

use super::{explain, GlobalOptions, WorkingCopy};

/// Show commit history
#[derive(Args, Debug)]
pub struct LogArgs {
    /// Only show this file
    #[arg(value_name = "FILE")]
    pub file: Option<PathBuf>,
}

fn format_record(record: &CommitRecord) -> String {
    format!(
        "  {}  {:<12} {}",
        record.commit_date, record.author, record.message
    )
}

/// Execute the `log` command.
pub fn execute(args: LogArgs, globals: &GlobalOptions) -> Result<()> {
    let copy = WorkingCopy::open(globals)?;
    let repo = &copy.config.name;

    let files: Vec<String> = match &args.file {
        Some(path) => vec![copy.relative(path)?],
        None => IndexMerger::new(&copy.store)
            .fetch(repo)
            .map_err(|e| explain(e, &copy.store))?
            .files
            .into_iter()
            .collect(),
    };

    let reconstructor = Reconstructor::new(&copy.store);
    let tags = TagManager::new(&copy.store);
    for file in &files {
        let history = reconstructor
            .history(repo, file)
            .map_err(|e| explain(e, &copy.store))?;
        let labels = tags.tags(repo, file)?;
        if labels.is_empty() {
            println!("{}", file);
        } else {
            let labels: Vec<&str> = labels.iter().map(String::as_str).collect();
            println!("{} [{}]", file, labels.join(", "));
        }
        for record in &history {
            println!("{}", format_record(record));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use dynasync::diff::PatchKind;

    #[test]
    fn test_format_record() {
        let record = CommitRecord {
            repo: "repo-x".to_string(),
            commit_date: 1700000000000,
            file: "a.txt".to_string(),
            author: "alice".to_string(),
            diff: "hello".to_string(),
            kind: PatchKind::Full,
            message: "first".to_string(),
        };
        assert_eq!(
            format_record(&record),
            "  1700000000000  alice        first"
        );
    }
}
