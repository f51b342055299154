//! # Tags
//!
//! Labels attached to a file's current state. Tags are not versioned and play
//! no part in replay.
//!
//! Each file accumulates a set of labels stored with the store's set-union
//! update in the repository table under `(tag#<file>, 0)`. Concurrent taggers
//! therefore never overwrite each other, and tagging a file twice with the
//! same text changes nothing.

use log::info;
use std::collections::BTreeSet;

use crate::error::{Error, Result};
use crate::index::{IndexMerger, RepoIndex};
use crate::store::{get_string_set, AttributeValue, Item, ItemKey, RemoteStore};

/// Partition prefix of tag sets inside a repository table.
pub const TAG_PARTITION_PREFIX: &str = "tag#";
const TAGS_ATTRIBUTE: &str = "tags";

fn tag_key(file: &str) -> ItemKey {
    ItemKey::new(format!("{}{}", TAG_PARTITION_PREFIX, file), 0)
}

/// A label on a file.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Tag {
    pub file: String,
    pub text: String,
}

/// Attaches and reads tags.
pub struct TagManager<'a> {
    store: &'a dyn RemoteStore,
}

impl<'a> TagManager<'a> {
    pub fn new(store: &'a dyn RemoteStore) -> Self {
        Self { store }
    }

    /// Tags one file. The file must be tracked by the repository.
    pub fn tag(&self, repo: &str, file: &str, text: &str) -> Result<Tag> {
        let index = IndexMerger::new(self.store).fetch(repo)?;
        self.tag_tracked(&index, file, text)
    }

    /// Tags every file tracked by the repository.
    pub fn tag_all(&self, repo: &str, text: &str) -> Result<Vec<Tag>> {
        let index = IndexMerger::new(self.store).fetch(repo)?;
        index
            .files
            .iter()
            .map(|file| self.tag_tracked(&index, file, text))
            .collect()
    }

    /// Labels currently attached to `file`.
    pub fn tags(&self, repo: &str, file: &str) -> Result<BTreeSet<String>> {
        let item = match self.store.get_item(repo, &tag_key(file)) {
            Ok(item) => item,
            Err(Error::TableNotFound { .. }) => {
                return Err(Error::RepoNotFound {
                    repo: repo.to_string(),
                })
            }
            Err(e) => return Err(e),
        };
        match item {
            Some(item) => get_string_set(&item, TAGS_ATTRIBUTE),
            None => Ok(BTreeSet::new()),
        }
    }

    fn tag_tracked(&self, index: &RepoIndex, file: &str, text: &str) -> Result<Tag> {
        if !index.is_tracked(file) {
            return Err(Error::UnknownFile {
                repo: index.repo.clone(),
                file: file.to_string(),
            });
        }

        let mut additions = Item::new();
        additions.insert(
            TAGS_ATTRIBUTE.to_string(),
            AttributeValue::SS(BTreeSet::from([text.to_string()])),
        );
        self.store
            .update_item_union(&index.repo, &tag_key(file), &additions)?;

        info!("tagged {} in {} with '{}'", file, index.repo, text);
        Ok(Tag {
            file: file.to_string(),
            text: text.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::init_repo;
    use crate::store::MemoryStore;

    fn repo_with(files: &[&str]) -> MemoryStore {
        let store = MemoryStore::new();
        init_repo(&store, "repo-x", "alice", 1).unwrap();
        let merger = IndexMerger::new(&store);
        for (i, file) in files.iter().enumerate() {
            merger.merge_commit("repo-x", file, i as i64 + 1).unwrap();
        }
        store
    }

    #[test]
    fn test_tags_accumulate() {
        let store = repo_with(&["a.txt"]);
        let manager = TagManager::new(&store);

        manager.tag("repo-x", "a.txt", "v1").unwrap();
        manager.tag("repo-x", "a.txt", "reviewed").unwrap();
        manager.tag("repo-x", "a.txt", "v1").unwrap();

        let tags = manager.tags("repo-x", "a.txt").unwrap();
        assert_eq!(
            tags,
            BTreeSet::from(["reviewed".to_string(), "v1".to_string()])
        );
    }

    #[test]
    fn test_untracked_file_is_rejected() {
        let store = repo_with(&["a.txt"]);
        let manager = TagManager::new(&store);
        let result = manager.tag("repo-x", "b.txt", "v1");
        assert!(matches!(result, Err(Error::UnknownFile { .. })));
        assert!(manager.tags("repo-x", "b.txt").unwrap().is_empty());
    }

    #[test]
    fn test_missing_repository() {
        let store = MemoryStore::new();
        let manager = TagManager::new(&store);
        assert!(matches!(
            manager.tag("repo-none", "a.txt", "v1"),
            Err(Error::RepoNotFound { .. })
        ));
        assert!(matches!(
            manager.tags("repo-none", "a.txt"),
            Err(Error::RepoNotFound { .. })
        ));
    }

    #[test]
    fn test_tag_all_labels_every_tracked_file() {
        let store = repo_with(&["a.txt", "dir/b.txt"]);
        let manager = TagManager::new(&store);

        let tags = manager.tag_all("repo-x", "release").unwrap();
        assert_eq!(tags.len(), 2);
        for file in ["a.txt", "dir/b.txt"] {
            assert!(manager.tags("repo-x", file).unwrap().contains("release"));
        }
    }

    #[test]
    fn test_tags_do_not_affect_history() {
        let store = repo_with(&["a.txt"]);
        let before = store.item_count().unwrap();
        TagManager::new(&store).tag("repo-x", "a.txt", "v1").unwrap();
        assert_eq!(store.item_count().unwrap(), before + 1);

        let history = crate::clone::Reconstructor::new(&store)
            .history("repo-x", "a.txt")
            .unwrap();
        assert!(history.is_empty());
    }
}
