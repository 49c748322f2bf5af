//! # instances-link: view-state synchronization for the instances catalog
//!
//! Keeps each catalog page's view configuration (filters, sort order, visible
//! columns, selected rows, pricing assumptions and a cross-page currency) in
//! step across three tiers:
//!
//! - **Memory**: one observable record per page path with field-level subscriptions
//! - **Page-local storage**: a synchronous snapshot written on every edit
//! - **Remote key/value mirror**: debounced uploads addressed by opaque share ids
//!
//! Older persisted formats (settings blobs, positional column arrays, named
//! visibility maps and legacy URL parameters) are migrated exactly once.
//!
//! The crate also ships the dataset pipeline that reassembles sharded,
//! compressed instance tables fetched in parallel.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use instances_link::{
//!     KvClient, LinkConfig, MemoryLocation, MemoryPageStorage, StateStore,
//! };
//! use std::sync::Arc;
//!
//! # async fn example() -> instances_link::Result<()> {
//! let config = LinkConfig::default();
//! let store = StateStore::builder()
//!     .config(config.clone())
//!     .storage(Arc::new(MemoryPageStorage::new()))
//!     .remote(Arc::new(KvClient::from_config(&config)?))
//!     .location(Arc::new(MemoryLocation::new("https://instances.vantage.sh/azure")?))
//!     .build()?;
//!
//! let page = store.path("/azure");
//! page.set_region("westeurope")?;
//! assert_eq!(page.region(), "westeurope");
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod event_handlers;
pub mod location;
pub mod migration;
pub mod models;
pub mod pipeline;
pub mod remote;
pub mod storage;
pub mod store;

pub use config::{LinkConfig, LinkConfigBuilder};
pub use error::{LinkError, Result};
pub use event_handlers::{EventHandlers, SyncError, SyncErrorKind};
pub use location::{Location, MemoryLocation};
pub use migration::{migrate_local_storage, MigrationReport};
pub use models::{ColumnFilter, RemoteSnapshot, SortRule, StateDump, StateField};
pub use pipeline::{
    DatasetHandle, DatasetPipeline, DatasetSubscription, HttpShardFetcher, Row, ShardFetcher,
};
pub use remote::{KvClient, MemoryRemoteStore, RemoteStore};
pub use storage::{FilePageStorage, MemoryPageStorage, PageStorage};
pub use store::{PathContext, StateStore, StateStoreBuilder, Subscription};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
