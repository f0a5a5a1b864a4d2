//! Account management module.
//!
//! Provides the account model and the in-memory registry.

mod model;
mod registry;

pub use model::{Account, AccountIdentity};
pub use registry::AccountRegistry;
