//! Debounced, order-guarded remote writes.

use log::{debug, warn};
use std::sync::Arc;
use std::time::Instant;
use tokio::runtime::Handle;

use super::runtime::{PathRuntime, PathState};
use super::StateStore;
use crate::event_handlers::{SyncError, SyncErrorKind};
use crate::location::{set_query_param, SHARE_ID_PARAM};
use crate::migration::UrlMigrationPlan;
use crate::models::StateDump;

impl StateStore {
    /// (Re)start the trailing-edge debounce timer for a path.
    ///
    /// Called with the path lock held, right after `edit_seq` was bumped.
    /// Without a tokio runtime the edit stays local.
    pub(crate) fn schedule_write(&self, runtime: &Arc<PathRuntime>, state: &mut PathState) {
        state.cancel_pending_write();

        let Ok(handle) = Handle::try_current() else {
            debug!(
                "[STATE_STORE] No async runtime, keeping edit local for path={}",
                runtime.path
            );
            return;
        };

        let store = self.clone();
        let runtime = runtime.clone();
        let edit_seq = state.edit_seq;
        let delay = self.inner.config.write_debounce();
        state.pending_write = Some(handle.spawn(async move {
            tokio::time::sleep(delay).await;
            store.fire_write(&runtime, edit_seq).await;
        }));
    }

    /// Debounce expiry: upload the record as it is now.
    async fn fire_write(&self, runtime: &Arc<PathRuntime>, edit_seq: u64) {
        let (dump, token) = {
            let mut state = runtime.state.lock();
            if state.edit_seq != edit_seq {
                return;
            }
            // Detach from the timer slot so later edits no longer abort this upload.
            state.pending_write = None;
            state.write_seq += 1;
            (state.dump.clone(), state.write_seq)
        };
        let dump = dump.with_currency(self.currency());
        self.upload(runtime, token, dump, None).await;
    }

    /// Write `dump` remotely and, if still current, publish the new share id.
    ///
    /// The completion is applied only while holding the session-wide
    /// completion lock, only if `token` is still the latest write issued for
    /// the path and only if the address still shows that path. With a `plan`,
    /// the consumed legacy parameters are removed in the same rewrite.
    pub(crate) async fn upload(
        &self,
        runtime: &PathRuntime,
        token: u64,
        dump: StateDump,
        plan: Option<&UrlMigrationPlan>,
    ) {
        let path = runtime.path.as_str();
        let start = Instant::now();

        let id = match self.inner.remote.write(&dump).await {
            Ok(id) => id,
            Err(e) => {
                warn!("[STATE_STORE] Remote write failed for path={}: {}", path, e);
                self.report_error(SyncError::new(SyncErrorKind::RemoteWrite, path, e.to_string()));
                return;
            }
        };

        let _completion = self.inner.completion.lock().await;

        let latest = runtime.state.lock().write_seq;
        if latest != token {
            debug!(
                "[STATE_STORE] Dropping stale completion id={} for path={} (token {} < {})",
                id, path, token, latest
            );
            return;
        }

        let href = self.inner.location.href();
        if href.path() != path {
            debug!(
                "[STATE_STORE] Dropping completion id={} for path={}, address is now {}",
                id,
                path,
                href.path()
            );
            return;
        }

        let next = match plan {
            Some(plan) => plan.rewrite(&href, &id),
            None => set_query_param(&href, SHARE_ID_PARAM, &id),
        };
        self.inner.location.replace(next);
        debug!(
            "[STATE_STORE] Published id={} for path={} duration_ms={}",
            id,
            path,
            start.elapsed().as_millis()
        );
        self.inner.handlers.emit_share_id(path, &id);
    }
}
