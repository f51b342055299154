//! # Error Suggestions
//!
//! User-facing errors that say what went wrong and how to fix it. Commands
//! return these instead of bare library errors when the situation has an
//! obvious next step.

use std::path::Path;

/// No `.sync/` directory was found above `start`.
pub fn not_a_working_copy(start: &Path) -> anyhow::Error {
    anyhow::anyhow!(
        "Not inside a dynasync working copy: {path}\n\n\
         hint: Run 'dynasync init' to start tracking this directory\n\
         hint: Run 'dynasync clone <REPO>' to check out an existing repository",
        path = start.display()
    )
}

/// The repository has no index in the store.
pub fn repo_not_found(repo: &str, store: &str) -> anyhow::Error {
    anyhow::anyhow!(
        "Repository not found: {repo} (store: {store})\n\n\
         hint: Check the name, repositories are always named 'repo-<name>'\n\
         hint: Use --store or DYNASYNC_STORE to point at another store"
    )
}

/// A command named a file the repository does not track.
///
/// Suggests the closest tracked path when one is near.
pub fn unknown_file<'a, I>(repo: &str, file: &str, tracked: I) -> anyhow::Error
where
    I: IntoIterator<Item = &'a String>,
{
    let candidates: Vec<&str> = tracked.into_iter().map(String::as_str).collect();
    let did_you_mean = find_similar(file, &candidates)
        .map(|s| format!("\nhint: Did you mean '{s}'?"))
        .unwrap_or_default();

    anyhow::anyhow!(
        "File '{file}' is not tracked by {repo}{did_you_mean}\n\n\
         hint: Commit the file first with 'dynasync commit -m <MSG> {file}'"
    )
}

/// `clone` would overwrite an existing working copy.
pub fn clone_destination_in_use(dest: &Path) -> anyhow::Error {
    anyhow::anyhow!(
        "Destination is already a working copy: {path}\n\n\
         hint: Choose an empty directory, e.g. 'dynasync clone <REPO> <DIR>'",
        path = dest.display()
    )
}

/// `commit` was called without files and without `--all`.
pub fn nothing_to_commit() -> anyhow::Error {
    anyhow::anyhow!(
        "No files given to commit\n\n\
         hint: Name the files to commit, or use --all to commit every file"
    )
}

/// Closest candidate within an edit distance of 2, if any.
fn find_similar<'a>(input: &str, candidates: &[&'a str]) -> Option<&'a str> {
    candidates
        .iter()
        .map(|&candidate| (candidate, edit_distance(input, candidate)))
        .filter(|&(_, distance)| distance <= 2 && distance < input.len())
        .min_by_key(|&(_, distance)| distance)
        .map(|(candidate, _)| candidate)
}

/// Levenshtein distance, two rows at a time.
fn edit_distance(a: &str, b: &str) -> usize {
    let b_chars: Vec<char> = b.chars().collect();
    let mut previous: Vec<usize> = (0..=b_chars.len()).collect();
    let mut current = vec![0usize; b_chars.len() + 1];

    for (i, a_char) in a.chars().enumerate() {
        current[0] = i + 1;
        for (j, b_char) in b_chars.iter().enumerate() {
            let cost = usize::from(a_char != *b_char);
            current[j + 1] = (previous[j + 1] + 1)
                .min(current[j] + 1)
                .min(previous[j] + cost);
        }
        std::mem::swap(&mut previous, &mut current);
    }

    previous[b_chars.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_a_working_copy_includes_hints() {
        let message = not_a_working_copy(Path::new("/work/elsewhere")).to_string();
        assert!(message.contains("/work/elsewhere"));
        assert!(message.contains("dynasync init"));
        assert!(message.contains("dynasync clone"));
    }

    #[test]
    fn test_repo_not_found_mentions_store() {
        let message = repo_not_found("repo-x", "/srv/store").to_string();
        assert!(message.contains("repo-x"));
        assert!(message.contains("/srv/store"));
        assert!(message.contains("DYNASYNC_STORE"));
    }

    #[test]
    fn test_unknown_file_suggests_similar() {
        let tracked = vec!["README.md".to_string(), "src/lib.rs".to_string()];
        let message = unknown_file("repo-x", "src/lib.r", &tracked).to_string();
        assert!(message.contains("not tracked by repo-x"));
        assert!(message.contains("Did you mean 'src/lib.rs'?"));
    }

    #[test]
    fn test_unknown_file_no_suggestion_for_very_different() {
        let tracked = vec!["README.md".to_string()];
        let message = unknown_file("repo-x", "notes.txt", &tracked).to_string();
        assert!(!message.contains("Did you mean"));
    }

    #[test]
    fn test_edit_distance() {
        assert_eq!(edit_distance("a.txt", "a.txt"), 0);
        assert_eq!(edit_distance("a.tx", "a.txt"), 1);
        assert_eq!(edit_distance("b.txt", "a.txt"), 1);
        assert_eq!(edit_distance("", "abc"), 3);
        assert_eq!(edit_distance("kitten", "sitting"), 3);
    }
}
