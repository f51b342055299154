//! In-memory file tree produced by reconstruction
//!
//! A clone is first rebuilt entirely in memory and only written to disk once
//! reconstruction is over. Keys are repository-relative paths; `write_to`
//! refuses any key that would land outside the output directory.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::error::{Error, Result};
use crate::workspace::normalize_file;

/// Reconstructed files keyed by repository-relative path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryFS {
    files: BTreeMap<String, String>,
}

impl MemoryFS {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a file
    pub fn add_file(&mut self, path: &str, content: String) {
        self.files.insert(path.to_string(), content);
    }

    pub fn get_file(&self, path: &str) -> Option<&str> {
        self.files.get(path).map(String::as_str)
    }

    pub fn exists(&self, path: &str) -> bool {
        self.files.contains_key(path)
    }

    /// Paths in lexicographic order
    pub fn list_files(&self) -> Vec<&str> {
        self.files.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Iterate over all files as (path, content) pairs
    pub fn files(&self) -> impl Iterator<Item = (&str, &str)> {
        self.files.iter().map(|(p, c)| (p.as_str(), c.as_str()))
    }

    /// Writes every file below `output_path`, creating parent directories.
    ///
    /// Nothing is written if any key is absolute or climbs out of
    /// `output_path`.
    pub fn write_to(&self, output_path: &Path) -> Result<()> {
        for relative_path in self.files.keys() {
            normalize_file(relative_path).map_err(|e| Error::Filesystem {
                message: format!("Refusing to write '{}': {}", relative_path, e),
            })?;
        }

        for (relative_path, content) in self.files() {
            let full_path = output_path.join(relative_path);

            if let Some(parent) = full_path.parent() {
                fs::create_dir_all(parent).map_err(|e| Error::Filesystem {
                    message: format!("Failed to create directory '{}': {}", parent.display(), e),
                })?;
            }

            fs::write(&full_path, content).map_err(|e| Error::Filesystem {
                message: format!("Failed to write file '{}': {}", full_path.display(), e),
            })?;
        }
        Ok(())
    }
}
