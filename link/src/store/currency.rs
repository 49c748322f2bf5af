//! The sticky currency slot shared by every path.

use log::{debug, warn};
use std::sync::Arc;

use super::runtime::CurrencyCallback;
use super::{StateStore, Subscription};
use crate::event_handlers::{SyncError, SyncErrorKind};

impl StateStore {
    /// Active currency: the session slot, else the last stored currency,
    /// else `config.default_currency`.
    pub fn currency(&self) -> String {
        if let Some(code) = self.inner.currency.lock().clone() {
            return code;
        }
        match self.inner.storage.get_item(&self.inner.config.currency_storage_key) {
            Ok(Some(code)) if !code.is_empty() => code,
            Ok(_) => self.inner.config.default_currency.clone(),
            Err(e) => {
                warn!("[STATE_STORE] Failed to read stored currency: {}", e);
                self.inner.config.default_currency.clone()
            }
        }
    }

    /// Set the sticky currency for every path.
    ///
    /// The code is mirrored to page-local storage and currency subscribers
    /// are notified. No remote write is scheduled; the currency travels with
    /// the next upload of whichever path changes.
    pub fn set_currency(&self, code: impl Into<String>) {
        let code = code.into();
        *self.inner.currency.lock() = Some(code.clone());

        if let Err(e) = self
            .inner
            .storage
            .set_item(&self.inner.config.currency_storage_key, &code)
        {
            warn!("[STATE_STORE] Failed to persist currency {}: {}", code, e);
            self.report_error(SyncError::new(SyncErrorKind::Storage, "", e.to_string()));
        }

        let callbacks: Vec<CurrencyCallback> = self
            .inner
            .currency_subscribers
            .lock()
            .iter()
            .map(|(_, cb)| cb.clone())
            .collect();
        debug!(
            "[STATE_STORE] Currency set to {} ({} subscriber(s))",
            code,
            callbacks.len()
        );
        for callback in callbacks {
            callback(&code);
        }
    }

    pub fn update_currency<F>(&self, updater: F)
    where
        F: FnOnce(&str) -> String,
    {
        let previous = self.currency();
        self.set_currency(updater(&previous));
    }

    /// Register `callback` for currency changes on any path.
    pub fn subscribe_currency(
        &self,
        callback: impl Fn(&str) + Send + Sync + 'static,
    ) -> Subscription {
        let id = self.next_subscriber_id();
        let callback: CurrencyCallback = Arc::new(callback);
        self.inner.currency_subscribers.lock().push((id, callback));
        Subscription::currency(Arc::downgrade(&self.inner), id)
    }
}
