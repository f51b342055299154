//! # Repository Index
//!
//! The `RepoIndex` is the converging view of a repository's membership: the
//! set of files ever committed and the set of commit identifiers ever issued.
//! Both sets only grow, so merging is a plain set union, which is
//! commutative, associative and idempotent. Any number of uncoordinated
//! writers can merge into the same index in any order and still converge.
//!
//! The index is derived data. Commit records are the source of truth for
//! history; an index that missed an update (an orphaned record) can always be
//! rebuilt from the records.
//!
//! All indexes live in the shared `dynasync-repositories` table, keyed by
//! repository name. Creating a repository is a single create-if-absent write,
//! so of two racing `init` calls exactly one creates it and the other sees
//! `RepoAlreadyExists`.

use log::{debug, info};
use std::collections::BTreeSet;

use crate::error::{Error, Result};
use crate::store::{
    get_number, get_number_set, get_string, get_string_set, AttributeValue, Item, ItemKey,
    PutOutcome, RemoteStore,
};

/// Table holding the index of every repository.
pub const REPOSITORIES_TABLE: &str = "dynasync-repositories";

/// Mergeable membership aggregate of one repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoIndex {
    pub repo: String,
    pub files: BTreeSet<String>,
    pub commits: BTreeSet<i64>,
    pub creation_date: i64,
    pub owner: String,
}

impl RepoIndex {
    /// A fresh, empty index.
    pub fn new(repo: &str, owner: &str, creation_date: i64) -> Self {
        Self {
            repo: repo.to_string(),
            files: BTreeSet::new(),
            commits: BTreeSet::new(),
            creation_date,
            owner: owner.to_string(),
        }
    }

    pub fn key(repo: &str) -> ItemKey {
        ItemKey::new(repo, 0)
    }

    /// Adds one committed `(file, commit id)` pair.
    pub fn record(&mut self, file: &str, commit: i64) {
        self.files.insert(file.to_string());
        self.commits.insert(commit);
    }

    /// Union-merges `other` into `self`.
    ///
    /// `creation_date` and `owner` are immutable once set; when two views
    /// disagree, the earliest creation wins so the result does not depend on
    /// merge order.
    pub fn merge(&mut self, other: &RepoIndex) {
        self.files.extend(other.files.iter().cloned());
        self.commits.extend(other.commits.iter().copied());
        let other_first = (other.creation_date, &other.owner) < (self.creation_date, &self.owner);
        if other_first {
            self.creation_date = other.creation_date;
            self.owner = other.owner.clone();
        }
    }

    pub fn is_tracked(&self, file: &str) -> bool {
        self.files.contains(file)
    }

    pub fn to_item(&self) -> Item {
        let mut item = Item::new();
        item.insert("repo".to_string(), AttributeValue::S(self.repo.clone()));
        item.insert("files".to_string(), AttributeValue::SS(self.files.clone()));
        item.insert("commits".to_string(), AttributeValue::NS(self.commits.clone()));
        item.insert(
            "creationDate".to_string(),
            AttributeValue::N(self.creation_date),
        );
        item.insert("owner".to_string(), AttributeValue::S(self.owner.clone()));
        item
    }

    pub fn from_item(item: &Item) -> Result<Self> {
        Ok(Self {
            repo: get_string(item, "repo")?,
            files: get_string_set(item, "files")?,
            commits: get_number_set(item, "commits")?,
            creation_date: get_number(item, "creationDate")?,
            owner: get_string(item, "owner")?,
        })
    }
}

/// Delta item unioning one `(file, commit id)` pair into an index.
fn membership_delta(file: &str, commit: i64) -> Item {
    let mut additions = Item::new();
    additions.insert(
        "files".to_string(),
        AttributeValue::SS(BTreeSet::from([file.to_string()])),
    );
    additions.insert(
        "commits".to_string(),
        AttributeValue::NS(BTreeSet::from([commit])),
    );
    additions
}

/// Result of `init_repo`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitOutcome {
    /// This call created the repository
    Created,
    /// The repository already existed (possibly created concurrently)
    Found,
}

/// Read-merge-write access to repository indexes in a store.
pub struct IndexMerger<'a> {
    store: &'a dyn RemoteStore,
}

impl<'a> IndexMerger<'a> {
    pub fn new(store: &'a dyn RemoteStore) -> Self {
        Self { store }
    }

    /// Creates the index only if no index exists for the repository.
    pub fn create(&self, index: &RepoIndex) -> Result<()> {
        self.ensure_table()?;
        match self.store.conditional_put_item(
            REPOSITORIES_TABLE,
            &RepoIndex::key(&index.repo),
            &index.to_item(),
        )? {
            PutOutcome::Created => Ok(()),
            PutOutcome::AlreadyExists => Err(Error::RepoAlreadyExists {
                repo: index.repo.clone(),
            }),
        }
    }

    /// Fetches the index, failing with `RepoNotFound` if it is absent.
    pub fn fetch(&self, repo: &str) -> Result<RepoIndex> {
        let not_found = || Error::RepoNotFound {
            repo: repo.to_string(),
        };
        let item = match self.store.get_item(REPOSITORIES_TABLE, &RepoIndex::key(repo)) {
            Ok(item) => item,
            Err(Error::TableNotFound { .. }) => return Err(not_found()),
            Err(e) => return Err(e),
        };
        item.ok_or_else(not_found)
            .and_then(|item| RepoIndex::from_item(&item))
    }

    pub fn exists(&self, repo: &str) -> Result<bool> {
        match self.fetch(repo) {
            Ok(_) => Ok(true),
            Err(Error::RepoNotFound { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Unions `file` into `files` and `commit` into `commits`.
    ///
    /// Needs no prior read: the store's set-union update absorbs concurrent
    /// writers, and repeating the call changes nothing.
    pub fn merge_commit(&self, repo: &str, file: &str, commit: i64) -> Result<()> {
        debug!("merging {}@{} into index of {}", file, commit, repo);
        self.store.update_item_union(
            REPOSITORIES_TABLE,
            &RepoIndex::key(repo),
            &membership_delta(file, commit),
        )
    }

    fn ensure_table(&self) -> Result<()> {
        if self.store.describe_table(REPOSITORIES_TABLE)?.is_none() {
            self.store.create_table(REPOSITORIES_TABLE)?;
        }
        Ok(())
    }
}

/// Creates a repository, or finds it if it already exists.
///
/// Losing a creation race is not an error: `RepoAlreadyExists` collapses into
/// `InitOutcome::Found`. Both paths make sure the repository's own table is
/// provisioned, so a creator that died between the two steps is repaired by
/// the next `init`.
pub fn init_repo(
    store: &dyn RemoteStore,
    repo: &str,
    owner: &str,
    creation_date: i64,
) -> Result<InitOutcome> {
    let merger = IndexMerger::new(store);
    let outcome = match merger.create(&RepoIndex::new(repo, owner, creation_date)) {
        Ok(()) => {
            info!("created repository {} in {}", repo, store.location());
            InitOutcome::Created
        }
        Err(Error::RepoAlreadyExists { .. }) => {
            info!("found repository {} in {}", repo, store.location());
            InitOutcome::Found
        }
        Err(e) => return Err(e),
    };

    if store.describe_table(repo)?.is_none() && store.create_table(repo)? {
        debug!("provisioned table {}", repo);
    }
    Ok(outcome)
}
