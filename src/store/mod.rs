//! # Remote Store Client
//!
//! This module is the sole point of contact between the engine and the
//! external durable store. The engine never talks to a backend directly; it
//! goes through the `RemoteStore` trait, which mirrors the primitives of a
//! key/value store with native set types:
//!
//! - **`put_item`**: unconditional create/overwrite (commit records).
//! - **`conditional_put_item`**: create only if the key is absent (repository
//!   creation).
//! - **`update_item_union`**: additive set-union of set-valued attributes
//!   (repository index membership, tags).
//! - **`get_item`** / **`query`**: point reads and ordered range scans over one
//!   partition.
//! - **`describe_table`** / **`create_table`**: provisioning, used only while
//!   creating a repository.
//!
//! Two backends are provided. `MemoryStore` keeps everything in process and is
//! what the unit tests run against. `FileStore` persists items as JSON files
//! under a directory that several processes (or users on a shared mount) can
//! point at.

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::ops::RangeInclusive;

/// A single attribute value, modelled on the scalar and set types of a
/// document store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttributeValue {
    /// String
    S(String),
    /// Integer number
    N(i64),
    /// String set
    SS(BTreeSet<String>),
    /// Number set
    NS(BTreeSet<i64>),
}

impl AttributeValue {
    /// Set-union `other` into `self`.
    ///
    /// Only set attributes can be unioned, and only with a set of the same
    /// element type.
    pub fn union_with(&mut self, other: &AttributeValue) -> Result<()> {
        match (self, other) {
            (AttributeValue::SS(current), AttributeValue::SS(added)) => {
                current.extend(added.iter().cloned());
                Ok(())
            }
            (AttributeValue::NS(current), AttributeValue::NS(added)) => {
                current.extend(added.iter().copied());
                Ok(())
            }
            (current, added) => Err(Error::MalformedItem {
                message: format!(
                    "cannot union {} into {}",
                    added.type_name(),
                    current.type_name()
                ),
            }),
        }
    }

    fn type_name(&self) -> &'static str {
        match self {
            AttributeValue::S(_) => "S",
            AttributeValue::N(_) => "N",
            AttributeValue::SS(_) => "SS",
            AttributeValue::NS(_) => "NS",
        }
    }
}

/// A stored item: attribute name to value.
pub type Item = BTreeMap<String, AttributeValue>;

/// Primary key of an item inside a table.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ItemKey {
    pub partition: String,
    pub sort: i64,
}

impl ItemKey {
    pub fn new(partition: impl Into<String>, sort: i64) -> Self {
        Self {
            partition: partition.into(),
            sort,
        }
    }
}

impl fmt::Display for ItemKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.partition, self.sort)
    }
}

/// Outcome of a create-if-absent write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PutOutcome {
    Created,
    AlreadyExists,
}

/// Summary returned by `describe_table`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDescription {
    pub name: String,
    pub partition_count: usize,
}

/// Union the attributes of `additions` into `item`, inserting missing ones.
pub fn union_into(item: &mut Item, additions: &Item) -> Result<()> {
    for (name, value) in additions {
        match item.get_mut(name) {
            Some(existing) => existing.union_with(value)?,
            None => {
                if !matches!(value, AttributeValue::SS(_) | AttributeValue::NS(_)) {
                    return Err(Error::MalformedItem {
                        message: format!("attribute '{}' is not a set", name),
                    });
                }
                item.insert(name.clone(), value.clone());
            }
        }
    }
    Ok(())
}

/// Trait for the remote store primitives - allows swapping backends and
/// mocking in tests.
pub trait RemoteStore: Send + Sync {
    /// Human readable location of the store, used in messages.
    fn location(&self) -> String;

    /// Returns the table description, or `None` if the table does not exist.
    fn describe_table(&self, table: &str) -> Result<Option<TableDescription>>;

    /// Creates a table if it is absent. Returns `true` if this call created it.
    fn create_table(&self, table: &str) -> Result<bool>;

    /// Unconditionally writes an item, replacing any previous value.
    fn put_item(&self, table: &str, key: &ItemKey, item: &Item) -> Result<()>;

    /// Writes an item only if no item exists under `key`.
    fn conditional_put_item(&self, table: &str, key: &ItemKey, item: &Item)
        -> Result<PutOutcome>;

    /// Unions every set attribute in `additions` into the stored item,
    /// creating the item if it does not exist yet.
    fn update_item_union(&self, table: &str, key: &ItemKey, additions: &Item) -> Result<()>;

    /// Reads a single item.
    fn get_item(&self, table: &str, key: &ItemKey) -> Result<Option<Item>>;

    /// Returns all items of one partition whose sort key lies in `range`,
    /// ordered by ascending sort key.
    fn query(
        &self,
        table: &str,
        partition: &str,
        range: RangeInclusive<i64>,
    ) -> Result<Vec<(ItemKey, Item)>>;
}

/// Reads a string attribute.
pub fn get_string(item: &Item, name: &str) -> Result<String> {
    match item.get(name) {
        Some(AttributeValue::S(value)) => Ok(value.clone()),
        Some(other) => Err(Error::MalformedItem {
            message: format!("attribute '{}' is {}, expected S", name, other.type_name()),
        }),
        None => Err(Error::MalformedItem {
            message: format!("missing attribute '{}'", name),
        }),
    }
}

/// Reads a number attribute.
pub fn get_number(item: &Item, name: &str) -> Result<i64> {
    match item.get(name) {
        Some(AttributeValue::N(value)) => Ok(*value),
        Some(other) => Err(Error::MalformedItem {
            message: format!("attribute '{}' is {}, expected N", name, other.type_name()),
        }),
        None => Err(Error::MalformedItem {
            message: format!("missing attribute '{}'", name),
        }),
    }
}

/// Reads a string set attribute; an absent set is empty.
pub fn get_string_set(item: &Item, name: &str) -> Result<BTreeSet<String>> {
    match item.get(name) {
        Some(AttributeValue::SS(values)) => Ok(values.clone()),
        Some(other) => Err(Error::MalformedItem {
            message: format!("attribute '{}' is {}, expected SS", name, other.type_name()),
        }),
        None => Ok(BTreeSet::new()),
    }
}

/// Reads a number set attribute; an absent set is empty.
pub fn get_number_set(item: &Item, name: &str) -> Result<BTreeSet<i64>> {
    match item.get(name) {
        Some(AttributeValue::NS(values)) => Ok(values.clone()),
        Some(other) => Err(Error::MalformedItem {
            message: format!("attribute '{}' is {}, expected NS", name, other.type_name()),
        }),
        None => Ok(BTreeSet::new()),
    }
}
