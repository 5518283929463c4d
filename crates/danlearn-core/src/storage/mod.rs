//! # State Store
//!
//! Keyed persistence for [`UserState`] records.
//!
//! Two backends share one trait:
//! - `MemoryStore`: encoded snapshots in a `BTreeMap`, for tests and
//!   ephemeral servers
//! - `RedbStore`: redb embedded database (ACID, crash-safe)
//!
//! Both store the bytes produced by [`snapshot_to_bytes`], so transient
//! fields re-default on every load regardless of backend.
//!
//! [`snapshot_to_bytes`]: crate::formats::snapshot_to_bytes

mod memory;
mod redb_store;

pub use memory::MemoryStore;
pub use redb_store::RedbStore;

use crate::clock::Clock;
use crate::state::UserState;
use crate::{DanlearnError, UserId};
use std::path::Path;

// =============================================================================
// STORE TRAIT
// =============================================================================

/// Load / save / reset of learner records.
///
/// The store does no locking beyond what a single call needs; callers
/// serialize load-mutate-save cycles per user.
pub trait UserStore: Send + Sync {
    /// Load a record. `Ok(None)` when the user has never been saved.
    fn load(&self, user_id: &UserId) -> Result<Option<UserState>, DanlearnError>;

    /// Persist a record, replacing any previous one.
    fn save(&self, state: &UserState) -> Result<(), DanlearnError>;

    /// Number of stored records.
    fn user_count(&self) -> Result<usize, DanlearnError>;

    /// Stored user ids in ascending order.
    fn user_ids(&self) -> Result<Vec<UserId>, DanlearnError>;

    /// Load a record, or a fresh one when absent. Nothing is written.
    fn load_or_new(&self, user_id: &UserId, clock: &dyn Clock) -> Result<UserState, DanlearnError> {
        Ok(self
            .load(user_id)?
            .unwrap_or_else(|| UserState::new(user_id.clone(), clock)))
    }

    /// Discard any stored record and write a fresh default one.
    fn reset(&self, user_id: &UserId, clock: &dyn Clock) -> Result<UserState, DanlearnError> {
        let fresh = UserState::new(user_id.clone(), clock);
        self.save(&fresh)?;
        Ok(fresh)
    }
}

// =============================================================================
// BACKEND SELECTION
// =============================================================================

/// Storage backend selected at startup.
#[derive(Debug)]
pub enum StorageBackend {
    /// Records live in process memory and vanish on exit.
    InMemory(MemoryStore),
    /// Records persist in a redb database file.
    Persistent(RedbStore),
}

impl Default for StorageBackend {
    fn default() -> Self {
        Self::InMemory(MemoryStore::new())
    }
}

impl StorageBackend {
    /// Open (or create) a redb-backed store.
    pub fn open_redb(path: impl AsRef<Path>) -> Result<Self, DanlearnError> {
        Ok(Self::Persistent(RedbStore::open(path)?))
    }

    /// Whether records survive a restart.
    #[must_use]
    pub fn is_persistent(&self) -> bool {
        matches!(self, Self::Persistent(_))
    }

    fn store(&self) -> &dyn UserStore {
        match self {
            Self::InMemory(store) => store,
            Self::Persistent(store) => store,
        }
    }
}

impl UserStore for StorageBackend {
    fn load(&self, user_id: &UserId) -> Result<Option<UserState>, DanlearnError> {
        self.store().load(user_id)
    }

    fn save(&self, state: &UserState) -> Result<(), DanlearnError> {
        self.store().save(state)
    }

    fn user_count(&self) -> Result<usize, DanlearnError> {
        self.store().user_count()
    }

    fn user_ids(&self) -> Result<Vec<UserId>, DanlearnError> {
        self.store().user_ids()
    }
}
