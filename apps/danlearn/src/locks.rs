//! # Per-User Locks
//!
//! Serializes load/mutate/save cycles for one user id while leaving
//! different users fully parallel.
//!
//! The registry map is guarded by a short-lived std mutex that is never held
//! across an await; each entry is a tokio mutex that the caller holds for
//! the duration of its cycle.

use danlearn_core::UserId;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Entries beyond this count trigger a sweep of idle locks.
const SWEEP_THRESHOLD: usize = 1024;

/// Registry of per-user mutexes.
#[derive(Debug, Default)]
pub struct UserLocks {
    entries: Mutex<BTreeMap<UserId, Arc<AsyncMutex<()>>>>,
}

impl UserLocks {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `user_id`.
    pub async fn lock(&self, user_id: &UserId) -> OwnedMutexGuard<()> {
        let entry = {
            let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
            if entries.len() > SWEEP_THRESHOLD {
                // Only the registry holds idle entries.
                entries.retain(|_, lock| Arc::strong_count(lock) > 1);
            }
            Arc::clone(entries.entry(user_id.clone()).or_default())
        };
        entry.lock_owned().await
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn same_user_is_exclusive() {
        let locks = Arc::new(UserLocks::new());
        let id = UserId::new("alice").expect("id");

        let guard = locks.lock(&id).await;
        let contender = {
            let locks = Arc::clone(&locks);
            let id = id.clone();
            tokio::spawn(async move {
                let _guard = locks.lock(&id).await;
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!contender.is_finished());

        drop(guard);
        contender.await.expect("join");
    }

    #[tokio::test]
    async fn different_users_do_not_block() {
        let locks = UserLocks::new();
        let _a = locks.lock(&UserId::new("a").expect("id")).await;
        let _b = tokio::time::timeout(
            Duration::from_millis(100),
            locks.lock(&UserId::new("b").expect("id")),
        )
        .await
        .expect("not blocked");
        assert_eq!(locks.len(), 2);
    }
}
