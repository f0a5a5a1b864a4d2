//! Account model types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Unique identifier for an account: a user within an org.
///
/// Two identities are equal iff both fields match exactly. This is the
/// key type of the registry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccountIdentity {
    /// User identifier, unique within an org.
    pub user_id: String,
    /// Org identifier.
    pub org_id: String,
}

impl AccountIdentity {
    /// Create a new identity.
    #[must_use]
    pub fn new(user_id: impl Into<String>, org_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            org_id: org_id.into(),
        }
    }
}

impl std::fmt::Display for AccountIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.user_id, self.org_id)
    }
}

/// An authenticated account session.
///
/// Produced by an external credential layer and handed to the registry;
/// this crate never creates accounts on its own. The token and URL are
/// opaque here — no validation or refresh happens in this core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    /// Identity this account is registered under.
    pub identity: AccountIdentity,
    /// Human-readable name for display in account pickers.
    pub display_name: String,
    /// API endpoint the session is bound to, if known.
    pub instance_url: Option<String>,
    /// Opaque access token owned by the credential layer.
    pub access_token: Option<String>,
    /// When this account object was created.
    pub created_at: DateTime<Utc>,
    /// When this account last became the current account.
    pub last_accessed: Option<DateTime<Utc>>,
}

impl Account {
    /// Create a new account for the given identity.
    #[must_use]
    pub fn new(identity: AccountIdentity, display_name: impl Into<String>) -> Self {
        Self {
            identity,
            display_name: display_name.into(),
            instance_url: None,
            access_token: None,
            created_at: Utc::now(),
            last_accessed: None,
        }
    }

    /// Set the instance URL.
    #[must_use]
    pub fn with_instance_url(mut self, url: impl Into<String>) -> Self {
        self.instance_url = Some(url.into());
        self
    }

    /// Set the access token.
    #[must_use]
    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }
}
