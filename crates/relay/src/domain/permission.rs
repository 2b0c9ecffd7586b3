//! Transaction-scoped permissioning.
//!
//! Protocol contracts only accept calls into their permissioned functions
//! while the relay executes the winning bundle for the matching permission
//! key. The window is represented by a [`Grant`]: opening it marks the key as
//! permissioned, dropping it closes the window again. The grant is handed to
//! the execution as an explicit [`Permission`] context value.

use {
    crate::{
        domain::eth::{Address, PermissionKey},
        infra::observe,
    },
    dashmap::{DashMap, mapref::entry::Entry},
    std::sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    tokio::sync::Notify,
};

/// Tracks the active permission grants of one chain. At most one grant is
/// active per permission key.
#[derive(Debug, Clone, Default)]
pub struct Registry(Arc<Inner>);

#[derive(Debug, Default)]
struct Inner {
    active: DashMap<PermissionKey, GrantId>,
    released: Notify,
    next_id: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct GrantId(u64);

impl Registry {
    /// Whether `(receiver, permission_id)` is permissioned right now.
    pub fn is_permissioned(&self, receiver: Address, permission_id: &[u8]) -> bool {
        self.0
            .active
            .contains_key(&PermissionKey::from_parts(receiver, permission_id))
    }

    /// Opens a grant for the permission key, waiting for a conflicting grant
    /// on the same key to be closed first.
    pub async fn open(&self, key: PermissionKey) -> Grant {
        loop {
            // Register for the notification before checking so a release in
            // between is not missed.
            let released = self.0.released.notified();
            if let Some(grant) = self.try_open(&key) {
                return grant;
            }
            observe::grant_contended(&key);
            released.await;
        }
    }

    /// Opens a grant for the permission key unless one is already active.
    pub fn try_open(&self, key: &PermissionKey) -> Option<Grant> {
        match self.0.active.entry(key.clone()) {
            Entry::Occupied(_) => None,
            Entry::Vacant(entry) => {
                let id = GrantId(self.0.next_id.fetch_add(1, Ordering::Relaxed));
                entry.insert(id);
                observe::grant_opened(key);
                Some(Grant {
                    permission: Permission {
                        registry: self.clone(),
                        key: key.clone(),
                        id,
                    },
                })
            }
        }
    }

    fn is_active(&self, key: &PermissionKey, id: GrantId) -> bool {
        self.0.active.get(key).is_some_and(|active| *active == id)
    }

    fn release(&self, key: &PermissionKey, id: GrantId) {
        if self.0.active.remove_if(key, |_, active| *active == id).is_some() {
            observe::grant_closed(key);
        }
        self.0.released.notify_waiters();
    }
}

/// An open permission window. Closed when dropped, so an execution that fails,
/// panics or gets cancelled never leaves the key permissioned.
#[derive(Debug)]
pub struct Grant {
    permission: Permission,
}

impl Grant {
    /// The context value handed to the execution of the bundle.
    pub fn permission(&self) -> &Permission {
        &self.permission
    }

    pub fn close(self) {}
}

impl Drop for Grant {
    fn drop(&mut self) {
        self.permission
            .registry
            .release(&self.permission.key, self.permission.id);
    }
}

/// Permission context threaded through the execution of a bundle. Answers the
/// `isPermissioned` check of protocol contracts for exactly the grant it was
/// created from; once that grant is closed every check returns false, even if
/// the context value is kept around.
#[derive(Debug, Clone)]
pub struct Permission {
    registry: Registry,
    key: PermissionKey,
    id: GrantId,
}

impl Permission {
    pub fn is_permissioned(&self, receiver: Address, permission_id: &[u8]) -> bool {
        self.key.receiver() == receiver
            && self.key.permission_id() == permission_id
            && self.is_active()
    }

    pub fn is_active(&self) -> bool {
        self.registry.is_active(&self.key, self.id)
    }

    pub fn key(&self) -> &PermissionKey {
        &self.key
    }
}
