//! The account manager facade.
//!
//! [`AccountManager`] is the single entry point for registering
//! accounts, switching the current one, and observing switches. An
//! application constructs one manager at startup and passes clones of
//! the handle wherever account state is needed; tests construct
//! isolated instances. There is deliberately no process-wide global.

mod worker;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tokio::sync::{mpsc, oneshot};
use tracing::debug;

use crate::account::{Account, AccountIdentity, AccountRegistry};
use crate::delegate::{AccountDelegate, DelegateSet};
use crate::error::{Error, Result};
use worker::{Command, Worker};

/// State shared between manager handles and the serializer worker.
pub(crate) struct Shared {
    registry: RwLock<AccountRegistry>,
    delegates: Mutex<DelegateSet>,
    tx: mpsc::UnboundedSender<Command>,
}

impl Shared {
    pub(crate) fn registry(&self) -> RwLockReadGuard<'_, AccountRegistry> {
        self.registry.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Write access to the registry. Worker-only: handles never write.
    pub(crate) fn registry_mut(&self) -> RwLockWriteGuard<'_, AccountRegistry> {
        self.registry
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn delegates_mut(&self) -> MutexGuard<'_, DelegateSet> {
        self.delegates
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// Thread-safe registry of authenticated accounts with a coordinated
/// notion of "the current account".
///
/// All mutations (account insertion/removal and switches) are applied
/// by a single serializer task in FIFO order, so concurrent callers
/// never observe a half-applied switch and two switches never
/// interleave their delegate notifications. Reads
/// ([`current_identity`](Self::current_identity),
/// [`account`](Self::account), ...) are served directly from shared
/// state and always see a fully-applied mutation.
///
/// The handle is cheap to clone; all clones address the same registry.
#[derive(Clone)]
pub struct AccountManager {
    shared: Arc<Shared>,
}

impl AccountManager {
    /// Create a manager with an empty registry and no current account.
    ///
    /// Spawns the serializer task on the ambient tokio runtime. The
    /// task exits once the last handle is dropped.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    #[must_use]
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let shared = Arc::new(Shared {
            registry: RwLock::new(AccountRegistry::new()),
            delegates: Mutex::new(DelegateSet::default()),
            tx,
        });
        let worker = Worker::new(rx, Arc::downgrade(&shared));
        tokio::spawn(worker.run());
        Self { shared }
    }

    pub(crate) const fn from_shared(shared: Arc<Shared>) -> Self {
        Self { shared }
    }

    pub(crate) fn shared(&self) -> &Shared {
        &self.shared
    }

    /// Register an account, replacing any record under the same
    /// identity. Never affects the current account.
    ///
    /// Resolves once the serializer has applied the insertion.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ManagerShutdown`] if the serializer is gone.
    pub async fn add_account(&self, account: Account) -> Result<()> {
        let (done, applied) = oneshot::channel();
        self.send(Command::Insert { account, done })?;
        applied.await.map_err(|_| Error::ManagerShutdown)
    }

    /// Remove the account registered under `identity`; a no-op if it
    /// was never registered.
    ///
    /// Removing the current account first switches to the
    /// unauthenticated state through the usual
    /// `will_switch`/`did_switch` broadcasts, so observers never see a
    /// current pointer referring to a deleted account.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ManagerShutdown`] if the serializer is gone.
    pub async fn remove_account(&self, identity: &AccountIdentity) -> Result<()> {
        let (done, applied) = oneshot::channel();
        self.send(Command::Remove {
            identity: identity.clone(),
            done,
        })?;
        applied.await.map_err(|_| Error::ManagerShutdown)
    }

    /// Switch the current account to `to`, or to the unauthenticated
    /// state with `None`.
    ///
    /// Resolves when the switch has fully completed, including both
    /// delegate broadcasts. Switching to the already-current value
    /// (including `None` while unauthenticated) succeeds immediately
    /// without notifying anyone.
    ///
    /// # Errors
    ///
    /// - [`Error::AccountNotFound`] if `to` names an unregistered
    ///   identity; the current account is unchanged and no delegate
    ///   was notified.
    /// - [`Error::ManagerShutdown`] if the serializer is gone.
    pub async fn request_switch(&self, to: Option<AccountIdentity>) -> Result<()> {
        let (done, outcome) = oneshot::channel();
        self.send(Command::Switch {
            to,
            done: Some(done),
        })?;
        outcome.await.map_err(|_| Error::ManagerShutdown)?
    }

    /// Fire-and-forget variant of [`request_switch`](Self::request_switch).
    ///
    /// Enqueues the switch and returns immediately; a failed switch is
    /// logged instead of reported. This is the one safe way for a
    /// delegate to trigger another switch from inside a callback: the
    /// nested request queues behind the unit of work that is notifying
    /// it.
    pub fn enqueue_switch(&self, to: Option<AccountIdentity>) {
        if self.send(Command::Switch { to, done: None }).is_err() {
            debug!("switch enqueued after shutdown; dropped");
        }
    }

    /// Identity of the current account, or `None` when unauthenticated.
    #[must_use]
    pub fn current_identity(&self) -> Option<AccountIdentity> {
        self.shared.registry().current().cloned()
    }

    /// Record of the current account, or `None` when unauthenticated.
    #[must_use]
    pub fn current_account(&self) -> Option<Account> {
        self.shared.registry().current_account().cloned()
    }

    /// Record registered under `identity`, if any.
    #[must_use]
    pub fn account(&self, identity: &AccountIdentity) -> Option<Account> {
        self.shared.registry().get(identity).cloned()
    }

    /// Snapshot of every registered identity.
    #[must_use]
    pub fn identities(&self) -> Vec<AccountIdentity> {
        self.shared.registry().identities()
    }

    /// Number of registered accounts.
    #[must_use]
    pub fn account_count(&self) -> usize {
        self.shared.registry().len()
    }

    /// Register a switch observer.
    ///
    /// The manager keeps only a weak reference: dropping the delegate's
    /// last `Arc` silently stops its notifications. Registering the
    /// same delegate again is a no-op, never a double subscription.
    pub fn register_delegate(&self, delegate: &Arc<dyn AccountDelegate>) {
        self.shared.delegates_mut().register(delegate);
    }

    /// Remove a switch observer. A no-op if it was never registered.
    pub fn unregister_delegate(&self, delegate: &Arc<dyn AccountDelegate>) {
        self.shared.delegates_mut().unregister(delegate);
    }

    fn send(&self, command: Command) -> Result<()> {
        self.shared
            .tx
            .send(command)
            .map_err(|_| Error::ManagerShutdown)
    }
}

impl Default for AccountManager {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for AccountManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountManager")
            .field("accounts", &self.account_count())
            .field("current", &self.current_identity())
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn account(user: &str) -> Account {
        Account::new(AccountIdentity::new(user, "org1"), user)
    }

    #[tokio::test]
    async fn add_then_lookup() {
        let manager = AccountManager::new();
        let acct = account("user1").with_access_token("tok");
        let identity = acct.identity.clone();

        manager.add_account(acct).await.unwrap();

        let found = manager.account(&identity).unwrap();
        assert_eq!(found.access_token.as_deref(), Some("tok"));
        assert_eq!(manager.account_count(), 1);
        assert!(manager.current_identity().is_none());
    }

    #[tokio::test]
    async fn re_adding_overwrites() {
        let manager = AccountManager::new();
        let identity = AccountIdentity::new("user1", "org1");
        manager
            .add_account(Account::new(identity.clone(), "old"))
            .await
            .unwrap();
        manager
            .add_account(Account::new(identity.clone(), "new"))
            .await
            .unwrap();

        assert_eq!(manager.account_count(), 1);
        assert_eq!(manager.account(&identity).unwrap().display_name, "new");
    }

    #[tokio::test]
    async fn switch_to_registered_account() {
        let manager = AccountManager::new();
        let acct = account("user1");
        let identity = acct.identity.clone();
        manager.add_account(acct).await.unwrap();

        manager.request_switch(Some(identity.clone())).await.unwrap();
        assert_eq!(manager.current_identity(), Some(identity.clone()));
        assert!(manager.current_account().unwrap().last_accessed.is_some());

        manager.request_switch(None).await.unwrap();
        assert!(manager.current_identity().is_none());
        // Record survives switching away.
        assert!(manager.account(&identity).is_some());
    }

    #[tokio::test]
    async fn switch_to_unregistered_identity_fails_unchanged() {
        let manager = AccountManager::new();
        let acct = account("user1");
        let identity = acct.identity.clone();
        manager.add_account(acct).await.unwrap();
        manager.request_switch(Some(identity.clone())).await.unwrap();

        let missing = AccountIdentity::new("ghost", "org1");
        let err = manager.request_switch(Some(missing.clone())).await;
        assert!(matches!(err, Err(Error::AccountNotFound(id)) if id == missing));
        assert_eq!(manager.current_identity(), Some(identity));
    }

    #[tokio::test]
    async fn remove_non_current_keeps_current() {
        let manager = AccountManager::new();
        let keep = account("user1");
        let drop_me = account("user2");
        let keep_id = keep.identity.clone();
        let drop_id = drop_me.identity.clone();
        manager.add_account(keep).await.unwrap();
        manager.add_account(drop_me).await.unwrap();
        manager.request_switch(Some(keep_id.clone())).await.unwrap();

        manager.remove_account(&drop_id).await.unwrap();
        assert_eq!(manager.current_identity(), Some(keep_id));
        assert_eq!(manager.account_count(), 1);
    }

    #[tokio::test]
    async fn remove_current_clears_current() {
        let manager = AccountManager::new();
        let acct = account("user1");
        let identity = acct.identity.clone();
        manager.add_account(acct).await.unwrap();
        manager.request_switch(Some(identity.clone())).await.unwrap();

        manager.remove_account(&identity).await.unwrap();
        assert!(manager.current_identity().is_none());
        assert!(manager.account(&identity).is_none());
    }

    #[tokio::test]
    async fn debug_formatting_is_cheap_summary() {
        let manager = AccountManager::new();
        manager.add_account(account("user1")).await.unwrap();
        let rendered = format!("{manager:?}");
        assert!(rendered.contains("accounts: 1"));
    }
}
