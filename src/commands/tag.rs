//! # Tag Command Implementation
//!
//! Adds a label to tracked files. Without file arguments, every file the
//! repository tracks is labeled. Tags accumulate: a file keeps all labels it
//! was ever given.

use anyhow::Result;
use clap::Args;
use std::path::PathBuf;

use dynasync::error::Error;
use dynasync::index::IndexMerger;
use dynasync::output::FileStatus;
use dynasync::suggestions;
use dynasync::tag::TagManager;

use super::{explain, GlobalOptions, WorkingCopy};

/// Label tracked files
#[derive(Args, Debug)]
pub struct TagArgs {
    /// The label
    #[arg(value_name = "TEXT")]
    pub text: String,

    /// Files to label (defaults to every tracked file)
    #[arg(value_name = "FILES")]
    pub files: Vec<PathBuf>,
}

/// Execute the `tag` command.
pub fn execute(args: TagArgs, globals: &GlobalOptions) -> Result<()> {
    let copy = WorkingCopy::open(globals)?;
    let output = globals.output();
    let repo = &copy.config.name;
    let manager = TagManager::new(&copy.store);

    let tags = if args.files.is_empty() {
        manager
            .tag_all(repo, &args.text)
            .map_err(|e| explain(e, &copy.store))?
    } else {
        let mut tags = Vec::new();
        for path in &args.files {
            let file = copy.relative(path)?;
            match manager.tag(repo, &file, &args.text) {
                Ok(tag) => tags.push(tag),
                Err(Error::UnknownFile { repo, file }) => {
                    let index = IndexMerger::new(&copy.store).fetch(&repo)?;
                    return Err(suggestions::unknown_file(&repo, &file, &index.files));
                }
                Err(e) => return Err(explain(e, &copy.store)),
            }
        }
        tags
    };

    for tag in &tags {
        println!("{} ({})", output.status_line(FileStatus::Tagged, &tag.file), tag.text);
    }
    if tags.is_empty() {
        println!("No tracked files to tag in {}", repo);
    }
    Ok(())
}
