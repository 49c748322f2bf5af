//! Parallel shard loading for the instance tables.
//!
//! A catalog page renders from a small inline dataset, then widens it as the
//! remaining rows arrive in compressed shards. [`DatasetPipeline::load`]
//! starts one task per shard; each task fetches and decodes its shard and
//! fills the matching slot of the returned [`DatasetHandle`]. The published
//! dataset is always rebuilt in shard order, whatever order the shards land in.
//!
//! ```rust,no_run
//! use instances_link::{DatasetPipeline, LinkConfig};
//! use serde_json::json;
//!
//! # async fn example() -> instances_link::Result<()> {
//! let pipeline = DatasetPipeline::from_config(&LinkConfig::default())?;
//! let handle = pipeline.load("/remaining-instances-p{}.msgpack.xz", vec![json!({"id": "m5.large"})])?;
//!
//! let _sub = handle.subscribe(|rows| println!("{} rows loaded", rows.len()));
//! handle.settled().await;
//! println!("complete: {}", handle.is_complete());
//! # Ok(())
//! # }
//! ```

mod decode;
mod fetcher;
pub mod rainbow;
mod slots;

pub use decode::{decode_shard, decompress_xz, is_xz};
pub use fetcher::{HttpShardFetcher, ShardFetcher};
pub use slots::ShardSlots;

use log::{debug, warn};
use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tokio::runtime::Handle;
use tokio::sync::watch;
use url::Url;

use crate::config::LinkConfig;
use crate::error::{LinkError, Result};

/// One decoded dataset row.
pub type Row = serde_json::Value;

/// Placeholder replaced by the shard index in a path template.
pub const SHARD_PLACEHOLDER: &str = "{}";

type ChangeCallback = Arc<dyn Fn(&Arc<Vec<Row>>) + Send + Sync>;

/// Starts shard loads.
#[derive(Clone)]
pub struct DatasetPipeline {
    fetcher: Arc<dyn ShardFetcher>,
    base_url: Url,
    shard_count: usize,
}

impl fmt::Debug for DatasetPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatasetPipeline")
            .field("base_url", &self.base_url.as_str())
            .field("shard_count", &self.shard_count)
            .finish()
    }
}

impl DatasetPipeline {
    pub fn new(fetcher: Arc<dyn ShardFetcher>, config: &LinkConfig) -> Result<Self> {
        if config.shard_count == 0 {
            return Err(LinkError::ConfigurationError(
                "shard_count must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            fetcher,
            base_url: Url::parse(&config.asset_base_url)?,
            shard_count: config.shard_count,
        })
    }

    /// Pipeline fetching over HTTP.
    pub fn from_config(config: &LinkConfig) -> Result<Self> {
        Self::new(Arc::new(HttpShardFetcher::new()), config)
    }

    pub fn shard_count(&self) -> usize {
        self.shard_count
    }

    /// Absolute shard URLs for `template`.
    ///
    /// With a `{}` placeholder there is one URL per shard index; without one
    /// the template names a single resource.
    pub fn shard_urls(&self, template: &str) -> Result<Vec<Url>> {
        if !template.contains(SHARD_PLACEHOLDER) {
            return Ok(vec![self.base_url.join(template)?]);
        }
        (0..self.shard_count)
            .map(|i| -> Result<Url> {
                let path = template.replace(SHARD_PLACEHOLDER, &i.to_string());
                Ok(self.base_url.join(&path)?)
            })
            .collect()
    }

    /// Start loading every shard of `template` on top of `initial`.
    ///
    /// Outside a tokio runtime the handle stays at `initial` and never
    /// notifies.
    pub fn load(&self, template: &str, initial: Vec<Row>) -> Result<DatasetHandle> {
        let urls = self.shard_urls(template)?;

        let Ok(runtime) = Handle::try_current() else {
            debug!("[PIPELINE] No async runtime, serving {} inline rows", initial.len());
            return Ok(DatasetHandle::fixed(initial));
        };

        let handle = DatasetHandle::new(initial, urls.len());
        debug!("[PIPELINE] Loading {} shard(s) for {}", urls.len(), template);
        for (index, url) in urls.into_iter().enumerate() {
            let fetcher = self.fetcher.clone();
            let handle = handle.clone();
            runtime.spawn(async move {
                let result = fetcher.fetch(&url).await;
                if let Err(e) = &result {
                    warn!("[PIPELINE] Shard {} ({}) failed: {}", index, url, e);
                }
                handle.settle(index, result);
            });
        }
        Ok(handle)
    }
}

struct HandleInner {
    slots: Mutex<ShardSlots>,
    value: watch::Sender<Arc<Vec<Row>>>,
    settled: watch::Sender<bool>,
    callbacks: Mutex<Vec<(u64, ChangeCallback)>>,
    next_callback_id: AtomicU64,
}

/// Progressively growing dataset returned by [`DatasetPipeline::load`].
#[derive(Clone)]
pub struct DatasetHandle {
    inner: Arc<HandleInner>,
}

impl fmt::Debug for DatasetHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let slots = self.inner.slots.lock();
        f.debug_struct("DatasetHandle")
            .field("rows", &self.inner.value.borrow().len())
            .field("shards", &slots.len())
            .field("filled", &slots.filled_count())
            .finish()
    }
}

impl DatasetHandle {
    fn new(initial: Vec<Row>, shards: usize) -> Self {
        let slots = ShardSlots::new(initial, shards);
        let value = Arc::new(slots.merged());
        let settled = slots.is_settled();
        Self {
            inner: Arc::new(HandleInner {
                slots: Mutex::new(slots),
                value: watch::channel(value).0,
                settled: watch::channel(settled).0,
                callbacks: Mutex::new(Vec::new()),
                next_callback_id: AtomicU64::new(1),
            }),
        }
    }

    /// Handle that only ever holds `rows`.
    pub fn fixed(rows: Vec<Row>) -> Self {
        Self::new(rows, 0)
    }

    /// Current merged dataset.
    pub fn value(&self) -> Arc<Vec<Row>> {
        self.inner.value.borrow().clone()
    }

    /// Receiver that observes every published dataset.
    pub fn changes(&self) -> watch::Receiver<Arc<Vec<Row>>> {
        self.inner.value.subscribe()
    }

    /// Register `callback` for every newly published dataset.
    pub fn subscribe(
        &self,
        callback: impl Fn(&Arc<Vec<Row>>) + Send + Sync + 'static,
    ) -> DatasetSubscription {
        let id = self.inner.next_callback_id.fetch_add(1, Ordering::Relaxed);
        self.inner.callbacks.lock().push((id, Arc::new(callback)));
        DatasetSubscription {
            handle: Arc::downgrade(&self.inner),
            id,
        }
    }

    pub fn shard_count(&self) -> usize {
        self.inner.slots.lock().len()
    }

    /// Every shard delivered rows.
    pub fn is_complete(&self) -> bool {
        self.inner.slots.lock().is_complete()
    }

    /// No shard is still loading.
    pub fn is_settled(&self) -> bool {
        *self.inner.settled.borrow()
    }

    /// Wait until no shard is still loading.
    pub async fn settled(&self) {
        let mut rx = self.inner.settled.subscribe();
        // The sender lives in `self`, so this only returns once settled.
        let _ = rx.wait_for(|settled| *settled).await;
    }

    fn settle(&self, index: usize, result: Result<Vec<Row>>) {
        let (merged, settled) = {
            let mut slots = self.inner.slots.lock();
            let previous_len = self.inner.value.borrow().len();
            let publish = match result {
                Ok(rows) => slots.fill(index, rows),
                Err(_) => slots.fail(index) && slots.merged().len() != previous_len,
            };
            let merged = publish.then(|| Arc::new(slots.merged()));
            (merged, slots.is_settled())
        };

        if let Some(merged) = merged {
            self.inner.value.send_replace(merged.clone());
            let callbacks: Vec<ChangeCallback> = self
                .inner
                .callbacks
                .lock()
                .iter()
                .map(|(_, cb)| cb.clone())
                .collect();
            debug!(
                "[PIPELINE] Shard {} settled, publishing {} rows to {} subscriber(s)",
                index,
                merged.len(),
                callbacks.len()
            );
            for callback in callbacks {
                callback(&merged);
            }
        }
        if settled {
            self.inner.settled.send_replace(true);
        }
    }
}

/// Keeps a [`DatasetHandle::subscribe`] callback registered until dropped.
#[must_use = "dropping a DatasetSubscription unregisters its callback"]
pub struct DatasetSubscription {
    handle: Weak<HandleInner>,
    id: u64,
}

impl Drop for DatasetSubscription {
    fn drop(&mut self) {
        if let Some(inner) = self.handle.upgrade() {
            inner.callbacks.lock().retain(|(id, _)| *id != self.id);
        }
    }
}

impl fmt::Debug for DatasetSubscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatasetSubscription").field("id", &self.id).finish()
    }
}
