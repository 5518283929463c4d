//! In-memory store of encoded snapshots.

use super::UserStore;
use crate::formats::{snapshot_from_bytes, snapshot_to_bytes};
use crate::state::UserState;
use crate::{DanlearnError, UserId};
use std::collections::BTreeMap;
use std::sync::RwLock;

/// Snapshots keyed by user id, held in process memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<BTreeMap<UserId, Vec<u8>>>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl UserStore for MemoryStore {
    fn load(&self, user_id: &UserId) -> Result<Option<UserState>, DanlearnError> {
        let records = self
            .records
            .read()
            .map_err(|_| DanlearnError::IoError("memory store lock poisoned".to_string()))?;
        records
            .get(user_id)
            .map(|bytes| snapshot_from_bytes(bytes))
            .transpose()
    }

    fn save(&self, state: &UserState) -> Result<(), DanlearnError> {
        let bytes = snapshot_to_bytes(state)?;
        let mut records = self
            .records
            .write()
            .map_err(|_| DanlearnError::IoError("memory store lock poisoned".to_string()))?;
        records.insert(state.user_id().clone(), bytes);
        Ok(())
    }

    fn user_count(&self) -> Result<usize, DanlearnError> {
        let records = self
            .records
            .read()
            .map_err(|_| DanlearnError::IoError("memory store lock poisoned".to_string()))?;
        Ok(records.len())
    }

    fn user_ids(&self) -> Result<Vec<UserId>, DanlearnError> {
        let records = self
            .records
            .read()
            .map_err(|_| DanlearnError::IoError("memory store lock poisoned".to_string()))?;
        Ok(records.keys().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::{LearningMode, Plan};
    use chrono::{TimeZone, Utc};

    fn clock() -> ManualClock {
        ManualClock::new(Utc.with_ymd_and_hms(2026, 1, 5, 10, 0, 0).single().expect("ts"))
    }

    #[test]
    fn absent_user_loads_none() {
        let store = MemoryStore::new();
        let id = UserId::new("ghost").expect("id");
        assert!(store.load(&id).expect("load").is_none());
        assert_eq!(store.user_count().expect("count"), 0);
    }

    #[test]
    fn save_then_load() {
        let clock = clock();
        let store = MemoryStore::new();
        let id = UserId::new("u1").expect("id");
        let mut state = UserState::new(id.clone(), &clock);
        state.activate_subscription(Plan::Basic20, &clock);
        state.set_mode(Some(LearningMode::new("speaking")));

        store.save(&state).expect("save");
        let loaded = store.load(&id).expect("load").expect("present");

        assert_eq!(loaded.subscription(), state.subscription());
        assert_eq!(loaded.mode(), None);
    }

    #[test]
    fn reset_replaces_record() {
        let clock = clock();
        let store = MemoryStore::new();
        let id = UserId::new("u2").expect("id");
        let mut state = UserState::new(id.clone(), &clock);
        state.start_diagnostic();
        store.save(&state).expect("save");

        let fresh = store.reset(&id, &clock).expect("reset");

        assert!(!fresh.diagnostic().active);
        let loaded = store.load(&id).expect("load").expect("present");
        assert!(!loaded.diagnostic().active);
        assert_eq!(store.user_ids().expect("ids"), vec![id]);
    }
}
