use std::fmt;
use std::sync::Weak;

use super::StoreInner;
use crate::models::StateField;

#[derive(Debug, Clone)]
enum Target {
    Field { path: String, field: StateField },
    Currency,
}

/// Handle for a registered change callback.
///
/// The callback stays registered until this handle is dropped or
/// [`unsubscribe`](Self::unsubscribe) is called. Use [`detach`](Self::detach)
/// to keep it for the lifetime of the store.
#[must_use = "dropping a Subscription unregisters its callback"]
pub struct Subscription {
    store: Weak<StoreInner>,
    target: Target,
    id: u64,
    active: bool,
}

impl Subscription {
    pub(crate) fn field(store: Weak<StoreInner>, path: &str, field: StateField, id: u64) -> Self {
        Self {
            store,
            target: Target::Field {
                path: path.to_string(),
                field,
            },
            id,
            active: true,
        }
    }

    pub(crate) fn currency(store: Weak<StoreInner>, id: u64) -> Self {
        Self {
            store,
            target: Target::Currency,
            id,
            active: true,
        }
    }

    /// Field this subscription listens to; `None` for the currency.
    pub fn field_name(&self) -> Option<StateField> {
        match &self.target {
            Target::Field { field, .. } => Some(*field),
            Target::Currency => None,
        }
    }

    /// Remove the callback now.
    pub fn unsubscribe(mut self) {
        self.remove();
    }

    /// Keep the callback registered for as long as the store lives.
    pub fn detach(mut self) {
        self.active = false;
    }

    fn remove(&mut self) {
        if !self.active {
            return;
        }
        self.active = false;
        let Some(store) = self.store.upgrade() else {
            return;
        };
        match &self.target {
            Target::Field { path, field } => {
                if let Some(runtime) = store.paths.get(path) {
                    let mut state = runtime.state.lock();
                    if let Some(callbacks) = state.subscribers.get_mut(field) {
                        callbacks.retain(|(id, _)| *id != self.id);
                    }
                }
            }
            Target::Currency => {
                store.currency_subscribers.lock().retain(|(id, _)| *id != self.id);
            }
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.remove();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("target", &self.target)
            .field("id", &self.id)
            .field("active", &self.active)
            .finish()
    }
}
