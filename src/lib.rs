//! # authledger
//!
//! In-process multi-account session registry for client applications.
//!
//! Tracks the authenticated accounts a client holds, designates one as
//! "current", and coordinates switching the current account while
//! notifying observers before and after each switch. Switches are
//! atomic and strictly ordered under concurrent access: every mutation
//! runs on a single serializer task, so no caller ever observes a torn
//! switch and no two switches interleave their notifications.
//!
//! Credential acquisition, token refresh, persistence, and UI are
//! external collaborators: they produce [`Account`] values and consume
//! switch notifications, but none of that lives here.
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use authledger::{Account, AccountDelegate, AccountIdentity, AccountManager};
//!
//! let manager = AccountManager::new();
//! let identity = AccountIdentity::new("005x0000001", "00Dx0000002");
//! manager.add_account(Account::new(identity.clone(), "Work")).await?;
//! manager.request_switch(Some(identity)).await?;
//! assert!(manager.current_account().is_some());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod account;
mod delegate;
mod error;
mod manager;

pub use account::{Account, AccountIdentity, AccountRegistry};
pub use delegate::AccountDelegate;
pub use error::{Error, Result};
pub use manager::AccountManager;
