//! # Commit Records
//!
//! A `CommitRecord` is the immutable unit of history: one diff for one file at
//! one point in time. Its `commit_date` is both its timestamp and its
//! identifier within a `(repo, file)` pair, so it is drawn from a
//! `CommitClock` that never hands out the same value twice.
//!
//! Records are stored in the repository's own table under the partition
//! `commit#<file>` with `commit_date` as sort key, which makes "all records of
//! a file in replay order" a single ordered query.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::diff::{Patch, PatchKind};
use crate::error::Result;
use crate::store::{get_number, get_string, AttributeValue, Item, ItemKey};

/// Partition prefix of commit records inside a repository table.
pub const COMMIT_PARTITION_PREFIX: &str = "commit#";

/// Partition key holding every commit record of `file`.
pub fn commit_partition(file: &str) -> String {
    format!("{}{}", COMMIT_PARTITION_PREFIX, file)
}

/// One diff for one file, with its metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitRecord {
    pub repo: String,
    #[serde(rename = "commitDate")]
    pub commit_date: i64,
    #[serde(rename = "filePath")]
    pub file: String,
    pub author: String,
    pub diff: String,
    pub kind: PatchKind,
    pub message: String,
}

impl CommitRecord {
    /// Store key: `(commit#<file>, commit_date)`.
    pub fn key(&self) -> ItemKey {
        ItemKey::new(commit_partition(&self.file), self.commit_date)
    }

    /// Decodes the stored diff.
    pub fn patch(&self) -> Result<Patch> {
        Patch::decode(self.kind, &self.diff)
    }

    pub fn to_item(&self) -> Item {
        let mut item = Item::new();
        item.insert("repo".to_string(), AttributeValue::S(self.repo.clone()));
        item.insert("commitDate".to_string(), AttributeValue::N(self.commit_date));
        item.insert("filePath".to_string(), AttributeValue::S(self.file.clone()));
        item.insert("author".to_string(), AttributeValue::S(self.author.clone()));
        item.insert("diff".to_string(), AttributeValue::S(self.diff.clone()));
        item.insert(
            "kind".to_string(),
            AttributeValue::S(self.kind.as_str().to_string()),
        );
        item.insert("message".to_string(), AttributeValue::S(self.message.clone()));
        item
    }

    pub fn from_item(item: &Item) -> Result<Self> {
        Ok(Self {
            repo: get_string(item, "repo")?,
            commit_date: get_number(item, "commitDate")?,
            file: get_string(item, "filePath")?,
            author: get_string(item, "author")?,
            diff: get_string(item, "diff")?,
            kind: get_string(item, "kind")?.parse()?,
            message: get_string(item, "message")?,
        })
    }

    /// Total replay order: `commit_date` first, then author, message and diff
    /// so that colliding dates from uncoordinated writers still sort the same
    /// way on every clone.
    pub fn replay_order(a: &CommitRecord, b: &CommitRecord) -> Ordering {
        a.commit_date
            .cmp(&b.commit_date)
            .then_with(|| a.author.cmp(&b.author))
            .then_with(|| a.message.cmp(&b.message))
            .then_with(|| a.diff.cmp(&b.diff))
    }
}

/// Source of wall-clock time in milliseconds. Allows deterministic clocks in
/// tests.
pub trait TimeSource: Send + Sync {
    fn now_millis(&self) -> i64;
}

/// The system wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    fn now_millis(&self) -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as i64)
            .unwrap_or_default()
    }
}

/// Strictly increasing commit identifiers.
///
/// Issues the wall-clock time unless that would not be greater than the last
/// issued value, in which case it issues `last + 1`. Values from one clock are
/// therefore strictly increasing even when several commits land in the same
/// millisecond or the wall clock steps backwards.
pub struct CommitClock {
    source: Box<dyn TimeSource>,
    last: Option<i64>,
}

impl CommitClock {
    pub fn new(source: Box<dyn TimeSource>) -> Self {
        Self { source, last: None }
    }

    pub fn system() -> Self {
        Self::new(Box::new(SystemTimeSource))
    }

    /// Current wall-clock reading, without issuing an identifier.
    pub fn now(&self) -> i64 {
        self.source.now_millis()
    }

    pub fn next(&mut self) -> i64 {
        let now = self.source.now_millis();
        let issued = match self.last {
            Some(last) if now <= last => last + 1,
            _ => now,
        };
        self.last = Some(issued);
        issued
    }
}

impl std::fmt::Debug for CommitClock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommitClock").field("last", &self.last).finish()
    }
}

/// Packages patches into commit records sharing repository, author and
/// message. Never touches the store.
#[derive(Debug)]
pub struct RecordBuilder<'c> {
    repo: String,
    author: String,
    message: String,
    clock: &'c mut CommitClock,
}

impl<'c> RecordBuilder<'c> {
    pub fn new(repo: &str, author: &str, message: &str, clock: &'c mut CommitClock) -> Self {
        Self {
            repo: repo.to_string(),
            author: author.to_string(),
            message: message.to_string(),
            clock,
        }
    }

    pub fn build(&mut self, file: &str, patch: &Patch) -> Result<CommitRecord> {
        Ok(CommitRecord {
            repo: self.repo.clone(),
            commit_date: self.clock.next(),
            file: file.to_string(),
            author: self.author.clone(),
            diff: patch.encode()?,
            kind: patch.kind(),
            message: self.message.clone(),
        })
    }
}
