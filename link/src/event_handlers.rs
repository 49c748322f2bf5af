//! Synchronization event hooks for the state store.
//!
//! Failures in the background tiers (debounced uploads, share-link reads,
//! legacy migrations) never propagate to callers. They are logged and, when a
//! handler is registered, reported here:
//!
//! - [`on_share_id`](EventHandlers::on_share_id): Fired after a completed upload rewrote the address bar
//! - [`on_error`](EventHandlers::on_error): Fired for every swallowed failure
//!
//! # Example
//!
//! ```rust
//! use instances_link::EventHandlers;
//!
//! let handlers = EventHandlers::new()
//!     .on_share_id(|path, id| println!("{} is now shared as {}", path, id))
//!     .on_error(|error| eprintln!("sync error: {}", error));
//! assert!(handlers.has_any());
//! ```

use std::fmt;
use std::sync::Arc;

/// Which background tier produced a [`SyncError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncErrorKind {
    /// Uploading a snapshot to the key/value mirror failed.
    RemoteWrite,
    /// Fetching a shared snapshot failed.
    RemoteRead,
    /// A legacy record could not be parsed or a migrated record could not be stored.
    Migration,
    /// A fetched snapshot belonged to a different page path.
    PathMismatch,
    /// Page-local storage rejected a read or write.
    Storage,
}

impl fmt::Display for SyncErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncErrorKind::RemoteWrite => write!(f, "remote_write"),
            SyncErrorKind::RemoteRead => write!(f, "remote_read"),
            SyncErrorKind::Migration => write!(f, "migration"),
            SyncErrorKind::PathMismatch => write!(f, "path_mismatch"),
            SyncErrorKind::Storage => write!(f, "storage"),
        }
    }
}

/// Error information passed to the `on_error` handler.
#[derive(Debug, Clone)]
pub struct SyncError {
    pub kind: SyncErrorKind,
    /// Page path the failure relates to.
    pub path: String,
    pub message: String,
}

impl SyncError {
    pub fn new(kind: SyncErrorKind, path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            path: path.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for SyncError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.kind, self.path, self.message)
    }
}

/// Type alias for the on_share_id callback.
pub type OnShareIdCallback = Arc<dyn Fn(&str, &str) + Send + Sync>;

/// Type alias for the on_error callback.
pub type OnErrorCallback = Arc<dyn Fn(SyncError) + Send + Sync>;

/// Synchronization event handlers.
///
/// All handlers are optional and must be `Send + Sync`: uploads complete on
/// the tokio runtime, not on the thread that issued the edit.
#[derive(Clone, Default)]
pub struct EventHandlers {
    pub(crate) on_share_id: Option<OnShareIdCallback>,
    pub(crate) on_error: Option<OnErrorCallback>,
}

impl fmt::Debug for EventHandlers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventHandlers")
            .field("on_share_id", &self.on_share_id.is_some())
            .field("on_error", &self.on_error.is_some())
            .finish()
    }
}

impl EventHandlers {
    /// Create a new empty `EventHandlers` (no callbacks registered).
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callback invoked with `(path, id)` whenever an upload
    /// completion rewrote the address bar's share id.
    pub fn on_share_id(mut self, f: impl Fn(&str, &str) + Send + Sync + 'static) -> Self {
        self.on_share_id = Some(Arc::new(f));
        self
    }

    /// Register a callback invoked for every failure the store swallowed.
    pub fn on_error(mut self, f: impl Fn(SyncError) + Send + Sync + 'static) -> Self {
        self.on_error = Some(Arc::new(f));
        self
    }

    /// Returns `true` if any handler is registered.
    pub fn has_any(&self) -> bool {
        self.on_share_id.is_some() || self.on_error.is_some()
    }

    pub(crate) fn emit_share_id(&self, path: &str, id: &str) {
        if let Some(cb) = &self.on_share_id {
            cb(path, id);
        }
    }

    pub(crate) fn emit_error(&self, error: SyncError) {
        if let Some(cb) = &self.on_error {
            cb(error);
        }
    }
}
