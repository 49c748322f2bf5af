use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use super::RemoteStore;
use crate::error::{LinkError, Result};
use crate::models::{RemoteSnapshot, StateDump};

/// In-process remote store.
///
/// Ids are `"<prefix><n>"` with a monotonically increasing `n`. Every upload
/// is also recorded in order so callers can assert on what was sent.
#[derive(Debug)]
pub struct MemoryRemoteStore {
    id_prefix: String,
    next_id: AtomicU64,
    records: DashMap<String, String>,
    writes: Mutex<Vec<StateDump>>,
    failing_status: Mutex<Option<u16>>,
}

impl Default for MemoryRemoteStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryRemoteStore {
    pub fn new() -> Self {
        Self::with_id_prefix("kv-")
    }

    pub fn with_id_prefix(prefix: impl Into<String>) -> Self {
        Self {
            id_prefix: prefix.into(),
            next_id: AtomicU64::new(1),
            records: DashMap::new(),
            writes: Mutex::new(Vec::new()),
            failing_status: Mutex::new(None),
        }
    }

    /// Store a raw JSON record under a chosen id.
    pub fn insert_raw(&self, id: impl Into<String>, json: impl Into<String>) {
        self.records.insert(id.into(), json.into());
    }

    /// Make every subsequent request fail with `status` (`None` to recover).
    pub fn set_failing_status(&self, status: Option<u16>) {
        *self.failing_status.lock() = status;
    }

    pub fn write_count(&self) -> usize {
        self.writes.lock().len()
    }

    /// Every uploaded record, oldest first.
    pub fn writes(&self) -> Vec<StateDump> {
        self.writes.lock().clone()
    }

    pub fn last_write(&self) -> Option<StateDump> {
        self.writes.lock().last().cloned()
    }
}

#[async_trait]
impl RemoteStore for MemoryRemoteStore {
    async fn write(&self, dump: &StateDump) -> Result<String> {
        if let Some(status) = *self.failing_status.lock() {
            return Err(LinkError::RemoteWriteFailed {
                status,
                body: "injected failure".to_string(),
            });
        }

        let json = serde_json::to_string(dump)?;
        let id = format!("{}{}", self.id_prefix, self.next_id.fetch_add(1, Ordering::SeqCst));
        self.records.insert(id.clone(), json);
        self.writes.lock().push(dump.clone());
        Ok(id)
    }

    async fn read(&self, id: &str) -> Result<RemoteSnapshot> {
        if let Some(status) = *self.failing_status.lock() {
            return Err(LinkError::RemoteReadFailed {
                id: id.to_string(),
                status,
                body: "injected failure".to_string(),
            });
        }

        let json = self
            .records
            .get(id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| LinkError::RemoteReadFailed {
                id: id.to_string(),
                status: 404,
                body: "Not Found".to_string(),
            })?;
        RemoteSnapshot::from_json(serde_json::from_str(&json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_round_trip_moves_currency_out_of_band() {
        let remote = MemoryRemoteStore::new();
        let mut dump = StateDump::blank("/");
        dump.filter = "m5".to_string();

        let id = remote.write(&dump.with_currency("EUR")).await.unwrap();
        assert_eq!(id, "kv-1");

        let snapshot = remote.read(&id).await.unwrap();
        assert_eq!(snapshot.dump, dump);
        assert_eq!(snapshot.currency.as_deref(), Some("EUR"));
        assert_eq!(remote.write_count(), 1);
    }

    #[tokio::test]
    async fn test_missing_id_and_injected_failures() {
        let remote = MemoryRemoteStore::new();

        let err = remote.read("nope").await.unwrap_err();
        assert!(matches!(err, LinkError::RemoteReadFailed { status: 404, .. }));

        remote.set_failing_status(Some(503));
        let err = remote.write(&StateDump::blank("/")).await.unwrap_err();
        assert!(matches!(err, LinkError::RemoteWriteFailed { status: 503, .. }));
        assert_eq!(remote.write_count(), 0);

        remote.set_failing_status(None);
        assert_eq!(remote.write(&StateDump::blank("/")).await.unwrap(), "kv-1");
    }
}
