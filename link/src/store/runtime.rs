//! In-memory record for one page path.

use parking_lot::Mutex;
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::models::{StateDump, StateField};

pub(crate) type FieldCallback = Arc<dyn Fn(&JsonValue) + Send + Sync>;
pub(crate) type CurrencyCallback = Arc<dyn Fn(&str) + Send + Sync>;

/// A batch of callbacks with the value each should receive, collected under
/// the path lock and invoked after it is released.
pub(crate) type Notifications = Vec<(FieldCallback, JsonValue)>;

pub(crate) struct PathState {
    pub dump: StateDump,
    pub subscribers: BTreeMap<StateField, Vec<(u64, FieldCallback)>>,
    /// Debounce timer; `None` when no remote write is scheduled.
    pub pending_write: Option<JoinHandle<()>>,
    /// Bumped on every local edit. A timer or a hydration read only acts if
    /// the value it captured is still current.
    pub edit_seq: u64,
    /// Token of the most recently issued remote write. Completions carrying
    /// an older token are stale.
    pub write_seq: u64,
}

impl PathState {
    pub fn field_notifications(&self, field: StateField) -> Notifications {
        let Some(callbacks) = self.subscribers.get(&field) else {
            return Vec::new();
        };
        let value = self.dump.field_value(field);
        callbacks
            .iter()
            .map(|(_, cb)| (cb.clone(), value.clone()))
            .collect()
    }

    pub fn all_notifications(&self) -> Notifications {
        self.subscribers
            .keys()
            .flat_map(|field| self.field_notifications(*field))
            .collect()
    }

    pub fn cancel_pending_write(&mut self) {
        if let Some(handle) = self.pending_write.take() {
            handle.abort();
        }
    }
}

pub(crate) struct PathRuntime {
    pub path: String,
    pub state: Mutex<PathState>,
    hydrated: watch::Sender<bool>,
}

impl PathRuntime {
    pub fn new(path: impl Into<String>, dump: StateDump) -> Self {
        let (hydrated, _) = watch::channel(false);
        Self {
            path: path.into(),
            state: Mutex::new(PathState {
                dump,
                subscribers: BTreeMap::new(),
                pending_write: None,
                edit_seq: 0,
                write_seq: 0,
            }),
            hydrated,
        }
    }

    pub fn mark_hydrated(&self) {
        self.hydrated.send_replace(true);
    }

    pub fn is_hydrated(&self) -> bool {
        *self.hydrated.borrow()
    }

    pub async fn wait_hydrated(&self) {
        let mut rx = self.hydrated.subscribe();
        // The sender lives as long as `self`, so this only ends once hydrated.
        let _ = rx.wait_for(|done| *done).await;
    }
}

pub(crate) fn notify(notifications: Notifications) {
    for (callback, value) in notifications {
        callback(&value);
    }
}
