use parking_lot::RwLock;
use std::collections::BTreeMap;

use super::PageStorage;
use crate::error::Result;

/// In-memory page storage for tests and temporary use.
///
/// Does NOT persist across restarts.
///
/// # Example
///
/// ```rust
/// use instances_link::{MemoryPageStorage, PageStorage};
///
/// let storage = MemoryPageStorage::new();
/// storage.set_item("last_currency", "EUR").unwrap();
/// assert_eq!(storage.get_item("last_currency").unwrap().as_deref(), Some("EUR"));
/// ```
#[derive(Debug, Default)]
pub struct MemoryPageStorage {
    items: RwLock<BTreeMap<String, String>>,
}

impl MemoryPageStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a storage with existing items.
    pub fn with_items<I, K, V>(items: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            items: RwLock::new(items.into_iter().map(|(k, v)| (k.into(), v.into())).collect()),
        }
    }

    pub fn len(&self) -> usize {
        self.items.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.read().is_empty()
    }
}

impl PageStorage for MemoryPageStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        Ok(self.items.read().get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        self.items.write().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        self.items.write().remove(key);
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>> {
        Ok(self.items.read().keys().cloned().collect())
    }
}
