//! Page-local storage abstraction.
//!
//! The page-local tier is a flat string key/value namespace, the same shape
//! as a browser's `localStorage`. Current-schema records live under
//! `<prefix><path>`, the sticky currency under one fixed key, and legacy
//! keys sit alongside them until migration consumes them.
//!
//! Backends:
//! - [`MemoryPageStorage`]: process-local, for tests and short-lived hosts
//! - [`FilePageStorage`]: TOML file on disk, for CLI and desktop hosts

mod file;
mod memory;

pub use file::FilePageStorage;
pub use memory::MemoryPageStorage;

use crate::config::LinkConfig;
use crate::error::Result;
use crate::models::StateDump;

/// Trait for page-local storage backends.
///
/// All methods take `&self`; implementations provide their own interior
/// locking because the store calls into storage from timer tasks as well as
/// from the caller's thread.
///
/// # Example Implementation
///
/// ```rust,ignore
/// use instances_link::storage::PageStorage;
///
/// struct BrowserStorage;
///
/// impl PageStorage for BrowserStorage {
///     fn get_item(&self, key: &str) -> Result<Option<String>> { Ok(None) }
///     fn set_item(&self, key: &str, value: &str) -> Result<()> { Ok(()) }
///     fn remove_item(&self, key: &str) -> Result<()> { Ok(()) }
///     fn keys(&self) -> Result<Vec<String>> { Ok(vec![]) }
/// }
/// ```
pub trait PageStorage: Send + Sync {
    /// Returns `Ok(None)` if the key is absent.
    fn get_item(&self, key: &str) -> Result<Option<String>>;

    /// Store `value` under `key`, overwriting any previous value.
    fn set_item(&self, key: &str, value: &str) -> Result<()>;

    /// Returns `Ok(())` even if the key was absent.
    fn remove_item(&self, key: &str) -> Result<()>;

    /// Every key currently stored, in no particular order.
    fn keys(&self) -> Result<Vec<String>>;

    fn contains_key(&self, key: &str) -> Result<bool> {
        Ok(self.get_item(key)?.is_some())
    }
}

/// Load the current-schema record for `path`, if any.
pub fn load_state(
    storage: &dyn PageStorage,
    config: &LinkConfig,
    path: &str,
) -> Result<Option<StateDump>> {
    match storage.get_item(&config.state_key(path))? {
        Some(text) if !text.is_empty() => Ok(Some(serde_json::from_str(&text)?)),
        _ => Ok(None),
    }
}

/// Persist `dump` for `path` with the currency stripped.
pub fn save_state(
    storage: &dyn PageStorage,
    config: &LinkConfig,
    path: &str,
    dump: &StateDump,
) -> Result<()> {
    let text = serde_json::to_string(&dump.to_local_snapshot())?;
    storage.set_item(&config.state_key(path), &text)
}
