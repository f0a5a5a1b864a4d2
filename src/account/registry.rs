//! In-memory account registry.

use std::collections::HashMap;

use tracing::debug;

use super::model::{Account, AccountIdentity};

/// Registry of authenticated accounts plus the current-account pointer.
///
/// This is plain single-threaded state. The manager shares it behind a
/// lock with a single-writer discipline: only the serializer worker
/// mutates it, so readers always observe a completed mutation, never a
/// partial one.
#[derive(Debug, Default)]
pub struct AccountRegistry {
    accounts: HashMap<AccountIdentity, Account>,
    current: Option<AccountIdentity>,
}

impl AccountRegistry {
    /// Create an empty registry with no current account.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an account, replacing any existing record for the same
    /// identity. Never affects the current pointer.
    pub fn insert(&mut self, account: Account) {
        let identity = account.identity.clone();
        if self.accounts.insert(identity.clone(), account).is_some() {
            debug!(%identity, "replaced registered account");
        } else {
            debug!(%identity, "registered account");
        }
    }

    /// Remove the record for `identity`, returning it if present.
    ///
    /// The caller is responsible for clearing the current pointer first
    /// when removing the current account; this method only touches the
    /// map.
    pub fn remove(&mut self, identity: &AccountIdentity) -> Option<Account> {
        let removed = self.accounts.remove(identity);
        if removed.is_some() {
            debug!(%identity, "removed account");
        }
        removed
    }

    /// Look up the record for `identity`.
    #[must_use]
    pub fn get(&self, identity: &AccountIdentity) -> Option<&Account> {
        self.accounts.get(identity)
    }

    /// Whether `identity` is registered.
    #[must_use]
    pub fn contains(&self, identity: &AccountIdentity) -> bool {
        self.accounts.contains_key(identity)
    }

    /// Snapshot of all registered identities, in no particular order.
    #[must_use]
    pub fn identities(&self) -> Vec<AccountIdentity> {
        self.accounts.keys().cloned().collect()
    }

    /// Number of registered accounts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    /// Whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    /// Identity of the current account, if any.
    #[must_use]
    pub fn current(&self) -> Option<&AccountIdentity> {
        self.current.as_ref()
    }

    /// Record for the current account, if any.
    #[must_use]
    pub fn current_account(&self) -> Option<&Account> {
        self.current.as_ref().and_then(|id| self.accounts.get(id))
    }

    /// Set the current pointer. Worker-only: every write flows through
    /// the switch sequence so delegates are notified around it.
    ///
    /// Stamps `last_accessed` on the account becoming current.
    pub(crate) fn set_current(&mut self, identity: Option<AccountIdentity>) {
        if let Some(id) = &identity
            && let Some(account) = self.accounts.get_mut(id)
        {
            account.last_accessed = Some(chrono::Utc::now());
        }
        self.current = identity;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::redundant_clone)]
mod tests {
    use super::*;

    fn account(user: &str) -> Account {
        Account::new(AccountIdentity::new(user, "org1"), user)
    }

    #[test]
    fn insert_then_get_returns_the_record() {
        let mut registry = AccountRegistry::new();
        let acct = account("user1").with_access_token("tok-1");
        let identity = acct.identity.clone();
        registry.insert(acct);

        let found = registry.get(&identity).unwrap();
        assert_eq!(found.access_token.as_deref(), Some("tok-1"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn insert_overwrites_same_identity() {
        let mut registry = AccountRegistry::new();
        let identity = AccountIdentity::new("user1", "org1");
        registry.insert(Account::new(identity.clone(), "old name"));
        registry.insert(Account::new(identity.clone(), "new name"));

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get(&identity).unwrap().display_name, "new name");
    }

    #[test]
    fn insert_does_not_touch_current() {
        let mut registry = AccountRegistry::new();
        registry.insert(account("user1"));
        assert!(registry.current().is_none());
    }

    #[test]
    fn remove_returns_record_and_forgets_it() {
        let mut registry = AccountRegistry::new();
        let acct = account("user1");
        let identity = acct.identity.clone();
        registry.insert(acct);

        assert!(registry.remove(&identity).is_some());
        assert!(registry.get(&identity).is_none());
        assert!(registry.remove(&identity).is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn identities_snapshot() {
        let mut registry = AccountRegistry::new();
        registry.insert(account("user1"));
        registry.insert(account("user2"));

        let mut ids = registry.identities();
        ids.sort_by(|a, b| a.user_id.cmp(&b.user_id));
        assert_eq!(ids.len(), 2);
        assert_eq!(ids[0].user_id, "user1");
        assert_eq!(ids[1].user_id, "user2");
    }

    #[test]
    fn set_current_stamps_last_accessed() {
        let mut registry = AccountRegistry::new();
        let acct = account("user1");
        let identity = acct.identity.clone();
        registry.insert(acct);

        assert!(registry.current_account().is_none());
        registry.set_current(Some(identity.clone()));
        assert_eq!(registry.current(), Some(&identity));
        assert!(registry.current_account().unwrap().last_accessed.is_some());

        registry.set_current(None);
        assert!(registry.current().is_none());
    }
}
