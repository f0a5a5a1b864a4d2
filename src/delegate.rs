//! Switch observers.
//!
//! Delegates are notified before and after every account switch. Both
//! hooks are optional: the trait ships default no-op bodies, so a
//! delegate that only cares about one side of the switch implements
//! just that method.
//!
//! The manager holds delegates weakly. Dropping the owning [`Arc`]
//! silently excludes the delegate from future broadcasts; dead entries
//! are pruned whenever the set is scanned.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Weak};

use tracing::warn;

use crate::account::Account;
use crate::manager::AccountManager;

/// Observer of account switches.
///
/// Both hooks run on the manager's serializer, so a slow delegate
/// delays queued work. A delegate that needs to switch accounts from
/// inside a hook must use
/// [`AccountManager::enqueue_switch`], which defers the nested switch
/// until the in-progress one completes; awaiting
/// [`request_switch`](AccountManager::request_switch) from a hook would
/// wait on the serializer the hook itself occupies.
pub trait AccountDelegate: Send + Sync {
    /// Called before the current account changes. Querying `manager`
    /// here observes pre-switch state.
    ///
    /// `from`/`to` are `None` when switching from/to the
    /// unauthenticated state.
    fn will_switch(
        &self,
        manager: &AccountManager,
        from: Option<&Account>,
        to: Option<&Account>,
    ) {
        let _ = (manager, from, to);
    }

    /// Called after the current account changed. Querying `manager`
    /// here observes post-switch state.
    fn did_switch(&self, manager: &AccountManager, from: Option<&Account>, to: Option<&Account>) {
        let _ = (manager, from, to);
    }
}

/// Set of weakly-held delegates.
#[derive(Default)]
pub(crate) struct DelegateSet {
    entries: Vec<Weak<dyn AccountDelegate>>,
}

impl DelegateSet {
    /// Add a delegate. Idempotent: registering the same delegate twice
    /// keeps a single entry, so it is never notified twice for one
    /// switch. Dead entries are pruned while scanning.
    pub(crate) fn register(&mut self, delegate: &Arc<dyn AccountDelegate>) {
        let weak = Arc::downgrade(delegate);
        self.entries.retain(|entry| entry.strong_count() > 0);
        if !self.entries.iter().any(|entry| Weak::ptr_eq(entry, &weak)) {
            self.entries.push(weak);
        }
    }

    /// Remove a delegate. No-op if it was never registered.
    pub(crate) fn unregister(&mut self, delegate: &Arc<dyn AccountDelegate>) {
        let weak = Arc::downgrade(delegate);
        self.entries
            .retain(|entry| entry.strong_count() > 0 && !Weak::ptr_eq(entry, &weak));
    }

    /// Upgrade the live delegates, pruning the dead ones.
    ///
    /// Broadcasts iterate this snapshot, so delegates registered or
    /// dropped mid-broadcast do not affect the in-flight notification.
    pub(crate) fn snapshot(&mut self) -> Vec<Arc<dyn AccountDelegate>> {
        let mut live = Vec::with_capacity(self.entries.len());
        self.entries.retain(|entry| match entry.upgrade() {
            Some(delegate) => {
                live.push(delegate);
                true
            }
            None => false,
        });
        live
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Invoke one hook on every delegate in `snapshot`.
///
/// A panicking delegate is caught and logged; the remaining delegates
/// are still notified and nothing propagates to the switch caller.
pub(crate) fn broadcast<F>(snapshot: &[Arc<dyn AccountDelegate>], hook: &'static str, invoke: F)
where
    F: Fn(&dyn AccountDelegate),
{
    for delegate in snapshot {
        let result = catch_unwind(AssertUnwindSafe(|| invoke(delegate.as_ref())));
        if let Err(payload) = result {
            let reason = payload
                .downcast_ref::<&str>()
                .map(ToString::to_string)
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "non-string panic payload".to_string());
            warn!(hook, reason = %reason, "delegate panicked during switch broadcast");
        }
    }
}
