//! Error types for the session registry.

use thiserror::Error;

use crate::account::AccountIdentity;

/// Errors that can occur in registry operations.
#[derive(Debug, Error)]
pub enum Error {
    /// A switch targeted an identity that is not in the registry.
    ///
    /// The current account is unchanged and no delegate was notified.
    #[error("account not found: {0}")]
    AccountNotFound(AccountIdentity),

    /// The manager's serializer task is no longer running.
    ///
    /// Happens only after every [`AccountManager`](crate::AccountManager)
    /// handle for the instance has been dropped.
    #[error("account manager has shut down")]
    ManagerShutdown,
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
