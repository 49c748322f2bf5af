//! Remote key/value mirror.
//!
//! Snapshots are immutable once written: every upload returns a fresh opaque
//! id and the most recent upload simply wins. There are no retries, no
//! timeouts and no authentication at this layer.

mod kv_client;
mod memory;

pub use kv_client::KvClient;
pub use memory::MemoryRemoteStore;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{RemoteSnapshot, StateDump};

/// Remote snapshot store.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Upload `dump` (currency included) and return its opaque id.
    ///
    /// Non-2xx responses fail with
    /// [`LinkError::RemoteWriteFailed`](crate::LinkError::RemoteWriteFailed).
    async fn write(&self, dump: &StateDump) -> Result<String>;

    /// Fetch the snapshot stored under `id`.
    ///
    /// Non-2xx responses fail with
    /// [`LinkError::RemoteReadFailed`](crate::LinkError::RemoteReadFailed).
    async fn read(&self, id: &str) -> Result<RemoteSnapshot>;
}
