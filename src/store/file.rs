//! Directory-backed store backend
//!
//! Layout under the store root:
//!
//! ```text
//! <root>/
//!   .tmp/                         staging area for atomic writes
//!   <table>/                      one directory per table
//!     <partition>/                one directory per partition key
//!       <sort>.json               the item written by put / conditional put
//!       <sort>.union/<id>.json    set-union deltas, folded in on read
//! ```
//!
//! Every write lands in `.tmp/` first and is then moved into place, so readers
//! never observe a half-written item. Set unions never rewrite an existing file:
//! each one adds a new delta, which is what keeps concurrent writers from
//! losing each other's elements without any locking.

use std::collections::BTreeSet;
use std::fs;
use std::io::{ErrorKind, Write};
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use log::debug;

use super::{union_into, Item, ItemKey, PutOutcome, RemoteStore, TableDescription};
use crate::error::{Error, Result};

const TMP_DIR: &str = ".tmp";
const ITEM_EXT: &str = "json";
const UNION_EXT: &str = "union";

static SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Store persisted as JSON files below a root directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Opens (and if needed creates) a store rooted at `root`.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(root.join(TMP_DIR)).map_err(|e| Error::StoreUnavailable {
            location: root.display().to_string(),
            message: e.to_string(),
        })?;
        Ok(Self { root })
    }

    /// Root directory of the store
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn table_dir(&self, table: &str) -> PathBuf {
        self.root.join(encode_component(table))
    }

    fn existing_table_dir(&self, table: &str) -> Result<PathBuf> {
        let dir = self.table_dir(table);
        if dir.is_dir() {
            Ok(dir)
        } else {
            Err(Error::TableNotFound {
                table: table.to_string(),
            })
        }
    }

    fn item_path(partition_dir: &Path, sort: i64) -> PathBuf {
        partition_dir.join(format!("{}.{}", sort, ITEM_EXT))
    }

    fn union_dir(partition_dir: &Path, sort: i64) -> PathBuf {
        partition_dir.join(format!("{}.{}", sort, UNION_EXT))
    }

    /// Serializes `item` into a fresh file under `.tmp/`.
    fn write_temp(&self, item: &Item) -> std::io::Result<PathBuf> {
        let path = self.root.join(TMP_DIR).join(unique_name());
        let bytes = serde_json::to_vec(item)?;
        let mut file = fs::File::create(&path)?;
        file.write_all(&bytes)?;
        file.sync_all()?;
        Ok(path)
    }

    fn read_item(&self, partition_dir: &Path, sort: i64) -> std::io::Result<Option<Item>> {
        let base = match fs::read(Self::item_path(partition_dir, sort)) {
            Ok(bytes) => Some(serde_json::from_slice::<Item>(&bytes)?),
            Err(e) if e.kind() == ErrorKind::NotFound => None,
            Err(e) => return Err(e),
        };

        let deltas = list_json_files(&Self::union_dir(partition_dir, sort))?;
        if base.is_none() && deltas.is_empty() {
            return Ok(None);
        }

        let mut item = base.unwrap_or_default();
        for delta in deltas {
            let additions: Item = serde_json::from_slice(&fs::read(&delta)?)?;
            union_into(&mut item, &additions)
                .map_err(|e| std::io::Error::new(ErrorKind::InvalidData, e.to_string()))?;
        }
        Ok(Some(item))
    }
}

fn write_error(table: &str, key: &ItemKey, e: impl ToString) -> Error {
    Error::RemoteWriteFailed {
        key: format!("{}/{}", table, key),
        message: e.to_string(),
    }
}

fn read_error(table: &str, key: impl std::fmt::Display, e: impl ToString) -> Error {
    Error::RemoteReadFailed {
        key: format!("{}/{}", table, key),
        message: e.to_string(),
    }
}

/// Encodes a table or partition name as a single, filesystem-safe path
/// component. The mapping is injective: distinct names never share a directory.
pub fn encode_component(name: &str) -> String {
    if name.is_empty() {
        return "%".to_string();
    }
    let mut encoded = String::with_capacity(name.len());
    for (i, byte) in name.bytes().enumerate() {
        match byte {
            b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'-' | b'_' => encoded.push(byte as char),
            b'.' if i > 0 => encoded.push('.'),
            _ => encoded.push_str(&format!("%{:02X}", byte)),
        }
    }
    encoded
}

fn unique_name() -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    format!(
        "{}-{}-{}.{}",
        nanos,
        std::process::id(),
        SEQUENCE.fetch_add(1, Ordering::Relaxed),
        ITEM_EXT
    )
}

fn list_json_files(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e),
    };
    let mut files = Vec::new();
    for entry in entries {
        let path = entry?.path();
        if path.extension().is_some_and(|ext| ext == ITEM_EXT) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Sort keys present in a partition directory, from items and from deltas.
fn list_sort_keys(partition_dir: &Path) -> std::io::Result<BTreeSet<i64>> {
    let entries = match fs::read_dir(partition_dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(BTreeSet::new()),
        Err(e) => return Err(e),
    };
    let mut keys = BTreeSet::new();
    for entry in entries {
        let path = entry?.path();
        let is_entry = path
            .extension()
            .is_some_and(|ext| ext == ITEM_EXT || ext == UNION_EXT);
        if !is_entry {
            continue;
        }
        if let Some(sort) = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .and_then(|stem| stem.parse::<i64>().ok())
        {
            keys.insert(sort);
        }
    }
    Ok(keys)
}

impl RemoteStore for FileStore {
    fn location(&self) -> String {
        self.root.display().to_string()
    }

    fn describe_table(&self, table: &str) -> Result<Option<TableDescription>> {
        let dir = self.table_dir(table);
        if !dir.is_dir() {
            return Ok(None);
        }
        let partition_count = fs::read_dir(&dir)
            .map_err(|e| read_error(table, "*", e))?
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.path().is_dir())
            .count();
        Ok(Some(TableDescription {
            name: table.to_string(),
            partition_count,
        }))
    }

    fn create_table(&self, table: &str) -> Result<bool> {
        match fs::create_dir(self.table_dir(table)) {
            Ok(()) => {
                debug!("created table {} in {}", table, self.root.display());
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(false),
            Err(e) => Err(Error::RemoteWriteFailed {
                key: table.to_string(),
                message: e.to_string(),
            }),
        }
    }

    fn put_item(&self, table: &str, key: &ItemKey, item: &Item) -> Result<()> {
        let partition_dir = self.existing_table_dir(table)?.join(encode_component(&key.partition));
        fs::create_dir_all(&partition_dir).map_err(|e| write_error(table, key, e))?;
        let temp = self.write_temp(item).map_err(|e| write_error(table, key, e))?;
        fs::rename(&temp, Self::item_path(&partition_dir, key.sort)).map_err(|e| {
            let _ = fs::remove_file(&temp);
            write_error(table, key, e)
        })
    }

    fn conditional_put_item(
        &self,
        table: &str,
        key: &ItemKey,
        item: &Item,
    ) -> Result<PutOutcome> {
        let partition_dir = self.existing_table_dir(table)?.join(encode_component(&key.partition));
        fs::create_dir_all(&partition_dir).map_err(|e| write_error(table, key, e))?;
        let temp = self.write_temp(item).map_err(|e| write_error(table, key, e))?;

        // hard_link refuses to replace an existing file, which makes it an
        // atomic create-if-absent for fully written content.
        let linked = fs::hard_link(&temp, Self::item_path(&partition_dir, key.sort));
        let _ = fs::remove_file(&temp);
        match linked {
            Ok(()) => Ok(PutOutcome::Created),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(PutOutcome::AlreadyExists),
            Err(e) => Err(write_error(table, key, e)),
        }
    }

    fn update_item_union(&self, table: &str, key: &ItemKey, additions: &Item) -> Result<()> {
        // Validate the delta up front so a bad update never reaches disk.
        union_into(&mut Item::new(), additions)?;

        let partition_dir = self.existing_table_dir(table)?.join(encode_component(&key.partition));
        let union_dir = Self::union_dir(&partition_dir, key.sort);
        fs::create_dir_all(&union_dir).map_err(|e| write_error(table, key, e))?;
        let temp = self.write_temp(additions).map_err(|e| write_error(table, key, e))?;

        loop {
            match fs::hard_link(&temp, union_dir.join(unique_name())) {
                Ok(()) => break,
                Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
                Err(e) => {
                    let _ = fs::remove_file(&temp);
                    return Err(write_error(table, key, e));
                }
            }
        }
        let _ = fs::remove_file(&temp);
        Ok(())
    }

    fn get_item(&self, table: &str, key: &ItemKey) -> Result<Option<Item>> {
        let partition_dir = self.existing_table_dir(table)?.join(encode_component(&key.partition));
        self.read_item(&partition_dir, key.sort)
            .map_err(|e| read_error(table, key, e))
    }

    fn query(
        &self,
        table: &str,
        partition: &str,
        range: RangeInclusive<i64>,
    ) -> Result<Vec<(ItemKey, Item)>> {
        let partition_dir = self.existing_table_dir(table)?.join(encode_component(partition));
        let keys = list_sort_keys(&partition_dir).map_err(|e| read_error(table, partition, e))?;

        let mut results = Vec::new();
        for sort in keys.into_iter().filter(|sort| range.contains(sort)) {
            let key = ItemKey::new(partition, sort);
            if let Some(item) = self
                .read_item(&partition_dir, sort)
                .map_err(|e| read_error(table, &key, e))?
            {
                results.push((key, item));
            }
        }
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::AttributeValue;
    use std::collections::BTreeSet;
    use std::sync::Arc;
    use std::thread;
    use tempfile::TempDir;

    fn item(value: &str) -> Item {
        let mut item = Item::new();
        item.insert("v".to_string(), AttributeValue::S(value.to_string()));
        item
    }

    fn string_set(values: &[&str]) -> Item {
        let mut item = Item::new();
        item.insert(
            "files".to_string(),
            AttributeValue::SS(values.iter().map(|v| v.to_string()).collect()),
        );
        item
    }

    #[test]
    fn test_encode_component_is_filesystem_safe() {
        assert_eq!(encode_component("repo-proj"), "repo-proj");
        assert_eq!(encode_component("commit#src/a.txt"), "commit%23src%2Fa.txt");
        assert_eq!(encode_component(".."), "%2E.");
        assert_eq!(encode_component(""), "%");
        assert_ne!(encode_component("a/b"), encode_component("a%2Fb"));
    }

    #[test]
    fn test_open_creates_root() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().join("nested").join("store");
        let store = FileStore::open(&root).unwrap();
        assert!(store.root().join(TMP_DIR).is_dir());
    }

    #[test]
    fn test_put_and_get_roundtrip_survives_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::open(temp_dir.path()).unwrap();
        store.create_table("repo-x").unwrap();
        let key = ItemKey::new("commit#a.txt", 100);
        store.put_item("repo-x", &key, &item("hello")).unwrap();

        let reopened = FileStore::open(temp_dir.path()).unwrap();
        assert_eq!(reopened.get_item("repo-x", &key).unwrap(), Some(item("hello")));
    }

    #[test]
    fn test_missing_table() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::open(temp_dir.path()).unwrap();
        let result = store.get_item("absent", &ItemKey::new("p", 0));
        assert!(matches!(result, Err(Error::TableNotFound { .. })));
        assert!(store.describe_table("absent").unwrap().is_none());
    }

    #[test]
    fn test_conditional_put() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::open(temp_dir.path()).unwrap();
        store.create_table("t").unwrap();
        let key = ItemKey::new("p", 0);

        assert_eq!(
            store.conditional_put_item("t", &key, &item("a")).unwrap(),
            PutOutcome::Created
        );
        assert_eq!(
            store.conditional_put_item("t", &key, &item("b")).unwrap(),
            PutOutcome::AlreadyExists
        );
        assert_eq!(store.get_item("t", &key).unwrap(), Some(item("a")));
    }

    #[test]
    fn test_union_deltas_fold_on_read() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::open(temp_dir.path()).unwrap();
        store.create_table("t").unwrap();
        let key = ItemKey::new("p", 0);

        store.put_item("t", &key, &item("base")).unwrap();
        store.update_item_union("t", &key, &string_set(&["a"])).unwrap();
        store.update_item_union("t", &key, &string_set(&["b", "a"])).unwrap();

        let stored = store.get_item("t", &key).unwrap().unwrap();
        assert_eq!(stored.get("v"), Some(&AttributeValue::S("base".to_string())));
        assert_eq!(
            stored.get("files"),
            Some(&AttributeValue::SS(BTreeSet::from([
                "a".to_string(),
                "b".to_string()
            ])))
        );
    }

    #[test]
    fn test_query_orders_by_sort_key() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::open(temp_dir.path()).unwrap();
        store.create_table("t").unwrap();
        for sort in [30, -2, 10] {
            store
                .put_item("t", &ItemKey::new("p", sort), &item(&sort.to_string()))
                .unwrap();
        }
        store.put_item("t", &ItemKey::new("q", 5), &item("q")).unwrap();

        let sorts: Vec<i64> = store
            .query("t", "p", i64::MIN..=i64::MAX)
            .unwrap()
            .into_iter()
            .map(|(key, _)| key.sort)
            .collect();
        assert_eq!(sorts, vec![-2, 10, 30]);
        assert!(store.query("t", "none", 0..=10).unwrap().is_empty());
        assert_eq!(store.describe_table("t").unwrap().unwrap().partition_count, 2);
    }

    #[test]
    fn test_concurrent_unions_lose_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let store = Arc::new(FileStore::open(temp_dir.path()).unwrap());
        store.create_table("t").unwrap();
        let key = ItemKey::new("p", 0);

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = Arc::clone(&store);
                let key = key.clone();
                thread::spawn(move || {
                    let name = format!("file-{}", i);
                    store
                        .update_item_union("t", &key, &string_set(&[name.as_str()]))
                        .unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let stored = store.get_item("t", &key).unwrap().unwrap();
        match stored.get("files") {
            Some(AttributeValue::SS(files)) => assert_eq!(files.len(), 8),
            other => panic!("unexpected files attribute: {:?}", other),
        }
    }
}
