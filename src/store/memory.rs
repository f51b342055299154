//! In-process store backend

use std::collections::{BTreeMap, HashMap};
use std::ops::RangeInclusive;
use std::sync::{Arc, Mutex, MutexGuard};

use super::{union_into, Item, ItemKey, PutOutcome, RemoteStore, TableDescription};
use crate::error::{Error, Result};

type Table = BTreeMap<(String, i64), Item>;

/// In-memory store. Clones share the same tables, so several "clients" in one
/// process can be simulated by cloning a handle.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<HashMap<String, Table>>>,
}

impl MemoryStore {
    /// Create a new empty store
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, Table>>> {
        self.tables.lock().map_err(|_| Error::LockPoisoned {
            context: "memory store tables".to_string(),
        })
    }

    /// Total number of items across all tables
    pub fn item_count(&self) -> Result<usize> {
        Ok(self.lock()?.values().map(|table| table.len()).sum())
    }
}

fn missing_table(table: &str) -> Error {
    Error::TableNotFound {
        table: table.to_string(),
    }
}

fn slot(key: &ItemKey) -> (String, i64) {
    (key.partition.clone(), key.sort)
}

impl RemoteStore for MemoryStore {
    fn location(&self) -> String {
        "memory".to_string()
    }

    fn describe_table(&self, table: &str) -> Result<Option<TableDescription>> {
        let tables = self.lock()?;
        Ok(tables.get(table).map(|items| {
            let mut partitions: Vec<&String> = items.keys().map(|(p, _)| p).collect();
            partitions.dedup();
            TableDescription {
                name: table.to_string(),
                partition_count: partitions.len(),
            }
        }))
    }

    fn create_table(&self, table: &str) -> Result<bool> {
        let mut tables = self.lock()?;
        if tables.contains_key(table) {
            return Ok(false);
        }
        tables.insert(table.to_string(), Table::new());
        Ok(true)
    }

    fn put_item(&self, table: &str, key: &ItemKey, item: &Item) -> Result<()> {
        let mut tables = self.lock()?;
        let items = tables.get_mut(table).ok_or_else(|| missing_table(table))?;
        items.insert(slot(key), item.clone());
        Ok(())
    }

    fn conditional_put_item(
        &self,
        table: &str,
        key: &ItemKey,
        item: &Item,
    ) -> Result<PutOutcome> {
        let mut tables = self.lock()?;
        let items = tables.get_mut(table).ok_or_else(|| missing_table(table))?;
        let slot = slot(key);
        if items.contains_key(&slot) {
            return Ok(PutOutcome::AlreadyExists);
        }
        items.insert(slot, item.clone());
        Ok(PutOutcome::Created)
    }

    fn update_item_union(&self, table: &str, key: &ItemKey, additions: &Item) -> Result<()> {
        let mut tables = self.lock()?;
        let items = tables.get_mut(table).ok_or_else(|| missing_table(table))?;
        let item = items.entry(slot(key)).or_default();
        union_into(item, additions)
    }

    fn get_item(&self, table: &str, key: &ItemKey) -> Result<Option<Item>> {
        let tables = self.lock()?;
        let items = tables.get(table).ok_or_else(|| missing_table(table))?;
        Ok(items.get(&slot(key)).cloned())
    }

    fn query(
        &self,
        table: &str,
        partition: &str,
        range: RangeInclusive<i64>,
    ) -> Result<Vec<(ItemKey, Item)>> {
        let tables = self.lock()?;
        let items = tables.get(table).ok_or_else(|| missing_table(table))?;
        if range.is_empty() {
            return Ok(Vec::new());
        }
        let start = (partition.to_string(), *range.start());
        let end = (partition.to_string(), *range.end());
        Ok(items
            .range(start..=end)
            .map(|((p, s), item)| (ItemKey::new(p.clone(), *s), item.clone()))
            .collect())
    }
}
