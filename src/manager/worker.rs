//! The serializer behind [`AccountManager`](super::AccountManager).
//!
//! All registry mutations and all switch sequences run on one spawned
//! task, fed by an unbounded command channel. Units of work execute one
//! at a time in arrival order, so two switches can never interleave
//! their will/did broadcast pairs, and a request enqueued from inside a
//! delegate callback runs strictly after the in-progress unit
//! completes.

use std::sync::Weak;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

use super::{AccountManager, Shared};
use crate::account::{Account, AccountIdentity};
use crate::delegate::broadcast;
use crate::error::{Error, Result};

/// A unit of work for the serializer.
pub(crate) enum Command {
    /// Insert or replace an account record.
    Insert {
        account: Account,
        done: oneshot::Sender<()>,
    },
    /// Remove an account record; switches away first if it is current.
    Remove {
        identity: AccountIdentity,
        done: oneshot::Sender<()>,
    },
    /// Switch the current account. `done` is absent for fire-and-forget
    /// requests enqueued from delegate callbacks.
    Switch {
        to: Option<AccountIdentity>,
        done: Option<oneshot::Sender<Result<()>>>,
    },
}

/// Owns the receiving end of the command channel.
///
/// Holds the shared state weakly so the task exits once every manager
/// handle has been dropped.
pub(crate) struct Worker {
    rx: mpsc::UnboundedReceiver<Command>,
    shared: Weak<Shared>,
}

impl Worker {
    pub(crate) const fn new(rx: mpsc::UnboundedReceiver<Command>, shared: Weak<Shared>) -> Self {
        Self { rx, shared }
    }

    /// Drain commands until every sender is gone.
    pub(crate) async fn run(mut self) {
        while let Some(command) = self.rx.recv().await {
            let Some(shared) = self.shared.upgrade() else {
                break;
            };
            let manager = AccountManager::from_shared(shared);
            handle(&manager, command);
        }
        debug!("account manager serializer stopped");
    }
}

/// Execute one unit of work to completion.
fn handle(manager: &AccountManager, command: Command) {
    match command {
        Command::Insert { account, done } => {
            manager.shared().registry_mut().insert(account);
            let _ = done.send(());
        }
        Command::Remove { identity, done } => {
            remove(manager, &identity);
            let _ = done.send(());
        }
        Command::Switch { to, done } => {
            let result = switch(manager, to);
            match done {
                Some(done) => {
                    // Receiver may have stopped waiting; the switch
                    // itself already ran to completion either way.
                    let _ = done.send(result);
                }
                None => {
                    if let Err(error) = result {
                        warn!(%error, "enqueued switch failed");
                    }
                }
            }
        }
    }
}

/// Remove an account record.
///
/// Removing the current account is an implicit switch to the
/// unauthenticated state and takes the same broadcast path as an
/// explicit switch, with the record deleted between the two broadcasts:
/// `will_switch` observers still see the account, `did_switch`
/// observers see it gone and current as none.
fn remove(manager: &AccountManager, identity: &AccountIdentity) {
    let shared = manager.shared();
    let is_current = shared.registry().current() == Some(identity);
    if !is_current {
        shared.registry_mut().remove(identity);
        return;
    }

    let from = shared.registry().current_account().cloned();
    let snapshot = shared.delegates_mut().snapshot();

    broadcast(&snapshot, "will_switch", |delegate| {
        delegate.will_switch(manager, from.as_ref(), None);
    });

    {
        let mut registry = shared.registry_mut();
        registry.set_current(None);
        registry.remove(identity);
    }

    broadcast(&snapshot, "did_switch", |delegate| {
        delegate.did_switch(manager, from.as_ref(), None);
    });
}

/// The switch sequence.
///
/// Precondition check, target resolution, then the bracketed mutation:
/// `will_switch` fires before the current pointer moves and
/// `did_switch` after, so delegates querying the manager from either
/// hook observe a consistent pre- or post-switch view.
fn switch(manager: &AccountManager, to: Option<AccountIdentity>) -> Result<()> {
    let shared = manager.shared();

    let (from, to_account) = {
        let registry = shared.registry();

        // Switching to the account that is already current (including
        // none to none) is a successful no-op with zero broadcasts.
        if registry.current() == to.as_ref() {
            return Ok(());
        }

        let to_account = match &to {
            Some(identity) => Some(
                registry
                    .get(identity)
                    .cloned()
                    .ok_or_else(|| Error::AccountNotFound(identity.clone()))?,
            ),
            None => None,
        };
        (registry.current_account().cloned(), to_account)
    };

    debug!(
        from = ?from.as_ref().map(|a| &a.identity),
        to = ?to,
        "switching current account"
    );

    let snapshot = shared.delegates_mut().snapshot();

    broadcast(&snapshot, "will_switch", |delegate| {
        delegate.will_switch(manager, from.as_ref(), to_account.as_ref());
    });

    shared.registry_mut().set_current(to);

    broadcast(&snapshot, "did_switch", |delegate| {
        delegate.did_switch(manager, from.as_ref(), to_account.as_ref());
    });

    Ok(())
}
