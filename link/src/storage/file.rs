//! File-backed page storage.
//!
//! Persists the page-local tier to a TOML file so hosts without a browser
//! keep their view state across restarts:
//!
//! ```toml
//! [items]
//! "gstate-/" = '{"version":1,"path":"/", ...}'
//! last_currency = "EUR"
//! ```

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use super::PageStorage;
use crate::error::{LinkError, Result};

/// Top-level TOML structure
#[derive(Debug, Default, Serialize, Deserialize)]
struct StorageFile {
    #[serde(default)]
    items: BTreeMap<String, String>,
}

/// Page storage that writes through to a TOML file on every mutation.
#[derive(Debug)]
pub struct FilePageStorage {
    file_path: PathBuf,
    cache: Mutex<BTreeMap<String, String>>,
}

impl FilePageStorage {
    /// Open (or lazily create) a storage file at `file_path`.
    pub fn with_path(file_path: impl Into<PathBuf>) -> Result<Self> {
        let file_path = file_path.into();
        let items = Self::load_from_disk(&file_path)?;
        Ok(Self {
            file_path,
            cache: Mutex::new(items),
        })
    }

    fn load_from_disk(file_path: &Path) -> Result<BTreeMap<String, String>> {
        if !file_path.exists() {
            return Ok(BTreeMap::new());
        }

        let contents = fs::read_to_string(file_path).map_err(|e| {
            LinkError::StorageError(format!(
                "Cannot read storage file '{}': {}",
                file_path.display(),
                e
            ))
        })?;

        let file: StorageFile = toml::from_str(&contents).map_err(|e| {
            LinkError::StorageError(format!(
                "Corrupted storage file '{}': {}",
                file_path.display(),
                e
            ))
        })?;

        Ok(file.items)
    }

    fn save_to_disk(&self, items: &BTreeMap<String, String>) -> Result<()> {
        let file = StorageFile {
            items: items.clone(),
        };

        let contents = toml::to_string_pretty(&file).map_err(|e| {
            LinkError::StorageError(format!("Failed to serialize storage: {}", e))
        })?;

        if let Some(parent) = self.file_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| {
                    LinkError::StorageError(format!(
                        "Failed to create storage directory '{}': {}",
                        parent.display(),
                        e
                    ))
                })?;
            }
        }

        fs::write(&self.file_path, contents).map_err(|e| {
            LinkError::StorageError(format!(
                "Failed to write storage file '{}': {}",
                self.file_path.display(),
                e
            ))
        })
    }

    /// Get the file path used by this storage
    pub fn path(&self) -> &Path {
        &self.file_path
    }
}

impl PageStorage for FilePageStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        Ok(self.cache.lock().get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        let mut cache = self.cache.lock();
        let previous = cache.insert(key.to_string(), value.to_string());
        if let Err(e) = self.save_to_disk(&cache) {
            // Keep memory consistent with disk.
            match previous {
                Some(old) => cache.insert(key.to_string(), old),
                None => cache.remove(key),
            };
            return Err(e);
        }
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        let mut cache = self.cache.lock();
        if cache.remove(key).is_some() {
            self.save_to_disk(&cache)?;
        }
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>> {
        Ok(self.cache.lock().keys().cloned().collect())
    }
}
