//! Per-path observable state store.
//!
//! One [`StateStore`] per session holds a live [`StateDump`] per page path.
//! Every edit is applied in memory, written through to page-local storage,
//! delivered to that field's subscribers and then mirrored to the remote
//! key/value store after a trailing-edge debounce. Completed uploads rewrite
//! the address bar's share id, one at a time, and only while the user is
//! still on the page that produced them.
//!
//! The first touch of a path loads its local record (running the one-shot
//! legacy migration first) and starts a background hydration: legacy query
//! parameters are migrated if present, otherwise a shared snapshot named by
//! the address bar's `id` is fetched and merged.
//!
//! # Example
//!
//! ```rust
//! use instances_link::{MemoryLocation, MemoryRemoteStore, StateField, StateStore};
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> instances_link::Result<()> {
//! let store = StateStore::builder()
//!     .remote(Arc::new(MemoryRemoteStore::new()))
//!     .location(Arc::new(MemoryLocation::new("https://instances.vantage.sh/rds")?))
//!     .build()?;
//!
//! let _sub = store.subscribe("/rds", StateField::Filter, |value| {
//!     println!("filter is now {}", value);
//! });
//! store.set("/rds", StateField::Filter, json!("db.r6g"))?;
//! assert_eq!(store.read("/rds", StateField::Filter, None), json!("db.r6g"));
//! # Ok(())
//! # }
//! ```

mod currency;
mod hydration;
mod path_context;
mod runtime;
mod subscription;
mod writer;

pub use path_context::PathContext;
pub use subscription::Subscription;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use log::{debug, warn};
use parking_lot::Mutex;
use serde_json::Value as JsonValue;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use self::runtime::{notify, CurrencyCallback, FieldCallback, PathRuntime};
use crate::config::LinkConfig;
use crate::error::{LinkError, Result};
use crate::event_handlers::{EventHandlers, SyncError, SyncErrorKind};
use crate::location::{remove_query_params, Location, MemoryLocation, SHARE_ID_PARAM};
use crate::migration::migrate_local_storage;
use crate::models::{res_or_default, StateDump, StateField};
use crate::remote::{KvClient, RemoteStore};
use crate::storage::{load_state, save_state, MemoryPageStorage, PageStorage};

pub(crate) struct StoreInner {
    pub config: LinkConfig,
    pub storage: Arc<dyn PageStorage>,
    pub remote: Arc<dyn RemoteStore>,
    pub location: Arc<dyn Location>,
    pub handlers: EventHandlers,
    pub paths: DashMap<String, Arc<PathRuntime>>,
    pub currency: Mutex<Option<String>>,
    pub currency_subscribers: Mutex<Vec<(u64, CurrencyCallback)>>,
    next_subscriber_id: AtomicU64,
    migrated: AtomicBool,
    /// Serializes upload completions so only one rewrites the address at a time.
    pub completion: tokio::sync::Mutex<()>,
}

/// Session-wide view-state store. Cheap to clone.
#[derive(Clone)]
pub struct StateStore {
    inner: Arc<StoreInner>,
}

impl std::fmt::Debug for StateStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateStore")
            .field("config", &self.inner.config)
            .field("paths", &self.inner.paths.len())
            .field("handlers", &self.inner.handlers)
            .finish()
    }
}

impl StateStore {
    pub fn builder() -> StateStoreBuilder {
        StateStoreBuilder::new()
    }

    pub fn config(&self) -> &LinkConfig {
        &self.inner.config
    }

    /// Typed accessor bound to one page path.
    pub fn path(&self, path: impl Into<String>) -> PathContext {
        PathContext::new(self.clone(), path.into())
    }

    /// Current value of `field` on `path`.
    ///
    /// `default` (or the blank record's value when `None`) is returned when
    /// the stored value is a falsy scalar (`false`, `0`, `""`). Arrays and
    /// objects are returned as stored, even when empty.
    pub fn read(&self, path: &str, field: StateField, default: Option<JsonValue>) -> JsonValue {
        let runtime = self.runtime(path);
        let value = runtime.state.lock().dump.field_value(field);
        let default = default.unwrap_or_else(|| StateDump::blank(path).field_value(field));
        res_or_default(value, default)
    }

    /// Read `field` and subscribe to its changes in one step.
    pub fn watch(
        &self,
        path: &str,
        field: StateField,
        default: Option<JsonValue>,
        callback: impl Fn(&JsonValue) + Send + Sync + 'static,
    ) -> (JsonValue, Subscription) {
        let subscription = self.subscribe(path, field, callback);
        (self.read(path, field, default), subscription)
    }

    /// Register `callback` for changes to `field` on `path`.
    ///
    /// The callback receives the raw stored value, without default fallback.
    pub fn subscribe(
        &self,
        path: &str,
        field: StateField,
        callback: impl Fn(&JsonValue) + Send + Sync + 'static,
    ) -> Subscription {
        let runtime = self.runtime(path);
        let id = self.next_subscriber_id();
        let callback: FieldCallback = Arc::new(callback);
        runtime
            .state
            .lock()
            .subscribers
            .entry(field)
            .or_default()
            .push((id, callback));
        Subscription::field(Arc::downgrade(&self.inner), path, field, id)
    }

    /// Replace `field` on `path`.
    ///
    /// The record is persisted to page-local storage immediately, the field's
    /// subscribers are notified and a remote write is (re)scheduled. Only a
    /// malformed value is reported as an error; storage failures are logged
    /// and forwarded to the `on_error` handler after the path is unlocked, so
    /// the handler may read the store.
    pub fn set(&self, path: &str, field: StateField, value: JsonValue) -> Result<()> {
        let runtime = self.runtime(path);
        let (notifications, storage_error) = {
            let mut state = runtime.state.lock();
            state.dump.set_field_value(field, value)?;
            state.edit_seq += 1;
            let storage_error = self.persist_local(path, &state.dump);
            self.schedule_write(&runtime, &mut state);
            (state.field_notifications(field), storage_error)
        };
        debug!("[STATE_STORE] Set path={} field={}", path, field);
        if let Some(error) = storage_error {
            self.report_error(error);
        }
        notify(notifications);
        Ok(())
    }

    /// Replace `field` with `updater(previous)`.
    pub fn update<F>(&self, path: &str, field: StateField, updater: F) -> Result<()>
    where
        F: FnOnce(&JsonValue) -> JsonValue,
    {
        let previous = self.runtime(path).state.lock().dump.field_value(field);
        self.set(path, field, updater(&previous))
    }

    /// Copy of the full record for `path` (never carries currency).
    pub fn snapshot(&self, path: &str) -> StateDump {
        self.runtime(path).state.lock().dump.clone()
    }

    /// Clear `path` back to defaults.
    ///
    /// Removes the page-local record and the address bar's share id, drops any
    /// scheduled or in-flight upload for the path and notifies every
    /// subscriber.
    pub fn reset(&self, path: &str) -> Result<()> {
        self.inner
            .storage
            .remove_item(&self.inner.config.state_key(path))?;

        let href = self.inner.location.href();
        if href.query_pairs().any(|(key, _)| key == SHARE_ID_PARAM) {
            self.inner
                .location
                .replace(remove_query_params(&href, &[SHARE_ID_PARAM]));
        }

        let Some(runtime) = self.inner.paths.get(path).map(|r| r.value().clone()) else {
            return Ok(());
        };
        let notifications = {
            let mut state = runtime.state.lock();
            state.cancel_pending_write();
            state.dump = StateDump::blank(path);
            state.edit_seq += 1;
            state.write_seq += 1;
            state.all_notifications()
        };
        debug!("[STATE_STORE] Reset path={}", path);
        notify(notifications);
        Ok(())
    }

    /// Wait until the initial hydration of `path` has finished (or been skipped).
    pub async fn wait_for_hydration(&self, path: &str) {
        let runtime = self.runtime(path);
        runtime.wait_hydrated().await;
    }

    /// Whether the initial hydration of `path` has finished.
    pub fn is_hydrated(&self, path: &str) -> bool {
        self.inner
            .paths
            .get(path)
            .map(|r| r.is_hydrated())
            .unwrap_or(false)
    }

    fn next_subscriber_id(&self) -> u64 {
        self.inner.next_subscriber_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Runtime record for `path`, created on first touch.
    pub(crate) fn runtime(&self, path: &str) -> Arc<PathRuntime> {
        if let Some(existing) = self.inner.paths.get(path) {
            return existing.value().clone();
        }

        self.migrate_once();
        let dump = self.load_local(path);

        let (runtime, created) = match self.inner.paths.entry(path.to_string()) {
            Entry::Occupied(entry) => (entry.get().clone(), false),
            Entry::Vacant(entry) => {
                let runtime = Arc::new(PathRuntime::new(path, dump));
                entry.insert(runtime.clone());
                (runtime, true)
            }
        };
        if created {
            debug!("[STATE_STORE] Created runtime for path={}", path);
            self.spawn_hydration(runtime.clone());
        }
        runtime
    }

    fn migrate_once(&self) {
        if self.inner.migrated.swap(true, Ordering::SeqCst) {
            return;
        }
        match migrate_local_storage(self.inner.storage.as_ref(), &self.inner.config) {
            Ok(report) => {
                for failure in report.failures {
                    self.report_error(SyncError::new(
                        SyncErrorKind::Migration,
                        failure.path,
                        format!("{}: {}", failure.key, failure.reason),
                    ));
                }
            }
            Err(e) => {
                warn!("[STATE_STORE] Local storage migration failed: {}", e);
                self.report_error(SyncError::new(SyncErrorKind::Migration, "", e.to_string()));
            }
        }
    }

    fn load_local(&self, path: &str) -> StateDump {
        match load_state(self.inner.storage.as_ref(), &self.inner.config, path) {
            Ok(Some(mut dump)) => {
                if dump.path.is_empty() {
                    dump.path = path.to_string();
                }
                dump.currency = None;
                dump
            }
            Ok(None) => StateDump::blank(path),
            Err(e) => {
                warn!("[STATE_STORE] Discarding unreadable record for path={}: {}", path, e);
                self.report_error(SyncError::new(SyncErrorKind::Storage, path, e.to_string()));
                StateDump::blank(path)
            }
        }
    }

    /// Save `dump` to page-local storage. A failure is logged and handed back
    /// so the caller can report it once the path lock is released.
    pub(crate) fn persist_local(&self, path: &str, dump: &StateDump) -> Option<SyncError> {
        let e = save_state(self.inner.storage.as_ref(), &self.inner.config, path, dump).err()?;
        warn!("[STATE_STORE] Failed to persist path={}: {}", path, e);
        Some(SyncError::new(SyncErrorKind::Storage, path, e.to_string()))
    }

    pub(crate) fn report_error(&self, error: SyncError) {
        self.inner.handlers.emit_error(error);
    }
}

/// Builder for [`StateStore`].
///
/// Every collaborator has a default: [`LinkConfig::default`], in-memory page
/// storage, a [`KvClient`] for `config.kv_url` and an in-memory address at
/// `config.asset_base_url`.
#[derive(Default)]
pub struct StateStoreBuilder {
    config: Option<LinkConfig>,
    storage: Option<Arc<dyn PageStorage>>,
    remote: Option<Arc<dyn RemoteStore>>,
    location: Option<Arc<dyn Location>>,
    handlers: EventHandlers,
}

impl StateStoreBuilder {
    fn new() -> Self {
        Self::default()
    }

    pub fn config(mut self, config: LinkConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn storage(mut self, storage: Arc<dyn PageStorage>) -> Self {
        self.storage = Some(storage);
        self
    }

    pub fn remote(mut self, remote: Arc<dyn RemoteStore>) -> Self {
        self.remote = Some(remote);
        self
    }

    pub fn location(mut self, location: Arc<dyn Location>) -> Self {
        self.location = Some(location);
        self
    }

    pub fn event_handlers(mut self, handlers: EventHandlers) -> Self {
        self.handlers = handlers;
        self
    }

    pub fn build(self) -> Result<StateStore> {
        let config = self.config.unwrap_or_default();
        config.validate()?;

        let remote: Arc<dyn RemoteStore> = match self.remote {
            Some(remote) => remote,
            None => Arc::new(KvClient::from_config(&config)?),
        };
        let location: Arc<dyn Location> = match self.location {
            Some(location) => location,
            None => Arc::new(MemoryLocation::new(&config.asset_base_url).map_err(|e| {
                LinkError::ConfigurationError(format!("Invalid asset_base_url: {}", e))
            })?),
        };
        let storage = self
            .storage
            .unwrap_or_else(|| Arc::new(MemoryPageStorage::new()));

        Ok(StateStore {
            inner: Arc::new(StoreInner {
                config,
                storage,
                remote,
                location,
                handlers: self.handlers,
                paths: DashMap::new(),
                currency: Mutex::new(None),
                currency_subscribers: Mutex::new(Vec::new()),
                next_subscriber_id: AtomicU64::new(1),
                migrated: AtomicBool::new(false),
                completion: tokio::sync::Mutex::new(()),
            }),
        })
    }
}
