//! One-shot initial load of a path: legacy query parameters, then a shared
//! snapshot named by the address bar.

use log::{debug, info, warn};
use std::sync::Arc;
use tokio::runtime::Handle;

use super::runtime::{notify, PathRuntime};
use super::StateStore;
use crate::error::LinkError;
use crate::event_handlers::{SyncError, SyncErrorKind};
use crate::migration::plan_url_migration;

impl StateStore {
    pub(crate) fn spawn_hydration(&self, runtime: Arc<PathRuntime>) {
        let Ok(handle) = Handle::try_current() else {
            debug!(
                "[STATE_STORE] No async runtime, skipping hydration for path={}",
                runtime.path
            );
            runtime.mark_hydrated();
            return;
        };

        let store = self.clone();
        handle.spawn(async move {
            store.hydrate(&runtime).await;
            runtime.mark_hydrated();
        });
    }

    async fn hydrate(&self, runtime: &Arc<PathRuntime>) {
        if self.migrate_url(runtime).await {
            return;
        }
        if let Some(id) = self.inner.location.share_id() {
            self.hydrate_from_share(runtime, &id).await;
        }
    }

    /// Apply legacy query parameters to the path and upload the result.
    ///
    /// Only runs while the address shows this path. Returns `true` when the
    /// parameters changed the record.
    async fn migrate_url(&self, runtime: &Arc<PathRuntime>) -> bool {
        let path = runtime.path.as_str();
        let href = self.inner.location.href();
        if href.path() != path {
            return false;
        }

        let migrated = {
            let mut state = runtime.state.lock();
            match plan_url_migration(&href, &state.dump) {
                Some(plan) => {
                    state.cancel_pending_write();
                    state.dump = plan.state.clone();
                    state.edit_seq += 1;
                    state.write_seq += 1;
                    let storage_error = self.persist_local(path, &state.dump);
                    Some((
                        plan,
                        state.write_seq,
                        state.dump.clone(),
                        state.all_notifications(),
                        storage_error,
                    ))
                }
                None => None,
            }
        };
        let Some((plan, token, dump, notifications, storage_error)) = migrated else {
            return false;
        };
        if let Some(error) = storage_error {
            self.report_error(error);
        }

        info!(
            "[MIGRATION] Migrated legacy query parameters {:?} for path={}",
            plan.consumed_params, path
        );
        notify(notifications);

        let dump = dump.with_currency(self.currency());
        self.upload(runtime, token, dump, Some(&plan)).await;
        true
    }

    /// Fetch the shared snapshot `id` and merge it into the path's record.
    ///
    /// The fetched record is discarded when it names another path or when the
    /// path was edited while the read was in flight.
    async fn hydrate_from_share(&self, runtime: &Arc<PathRuntime>, id: &str) {
        let path = runtime.path.as_str();
        let edit_seq = runtime.state.lock().edit_seq;

        let snapshot = match self.inner.remote.read(id).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!("[STATE_STORE] Failed to read shared state id={} for path={}: {}", id, path, e);
                self.report_error(SyncError::new(SyncErrorKind::RemoteRead, path, e.to_string()));
                return;
            }
        };

        if snapshot.embedded_path() != Some(path) {
            let mismatch = LinkError::PathMismatch {
                expected: path.to_string(),
                found: snapshot.embedded_path().unwrap_or_default().to_string(),
            };
            warn!("[STATE_STORE] Ignoring shared state id={}: {}", id, mismatch);
            self.report_error(SyncError::new(
                SyncErrorKind::PathMismatch,
                path,
                mismatch.to_string(),
            ));
            return;
        }

        let notifications = {
            let mut state = runtime.state.lock();
            if state.edit_seq != edit_seq {
                debug!(
                    "[STATE_STORE] Shared state id={} superseded by local edits on path={}",
                    id, path
                );
                return;
            }
            if let Err(e) = state.dump.merge_json(&snapshot.raw) {
                warn!("[STATE_STORE] Shared state id={} is malformed: {}", id, e);
                drop(state);
                self.report_error(SyncError::new(SyncErrorKind::RemoteRead, path, e.to_string()));
                return;
            }
            state.all_notifications()
        };

        if let Some(code) = snapshot.currency {
            self.set_currency(code);
        }
        debug!("[STATE_STORE] Hydrated path={} from id={}", path, id);
        notify(notifications);
    }
}
