use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use cq_types::UserId;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

type Slot = Arc<AsyncMutex<()>>;

/// One async mutex per user.
///
/// Operations for the same user run one at a time, operations for different
/// users run in parallel. An entry is removed once the last guard for it is
/// dropped and nobody is waiting, so the map only holds active users.
#[derive(Default)]
pub struct UserLocks {
    slots: Mutex<HashMap<UserId, Slot>>,
}

/// Holds a user's lock until dropped.
pub struct UserGuard<'a> {
    locks: &'a UserLocks,
    user: UserId,
    guard: Option<OwnedMutexGuard<()>>,
}

impl UserLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `user`.
    pub async fn acquire(&self, user: &UserId) -> UserGuard<'_> {
        let slot = {
            let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(slots.entry(user.clone()).or_default())
        };
        let guard = slot.lock_owned().await;
        UserGuard {
            locks: self,
            user: user.clone(),
            guard: Some(guard),
        }
    }

    /// Number of users with a held or awaited lock.
    pub fn active(&self) -> usize {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl Drop for UserGuard<'_> {
    fn drop(&mut self) {
        // Release first so the only remaining reference is the map's.
        drop(self.guard.take());
        let mut slots = self
            .locks
            .slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if slots
            .get(&self.user)
            .is_some_and(|slot| Arc::strong_count(slot) == 1)
        {
            slots.remove(&self.user);
        }
    }
}

impl std::fmt::Debug for UserLocks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserLocks")
            .field("active", &self.active())
            .finish()
    }
}
