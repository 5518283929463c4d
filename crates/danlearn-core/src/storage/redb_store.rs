//! # redb-backed User Store
//!
//! Durable learner records in a redb embedded database:
//! - ACID transactions, one write transaction per save
//! - Crash safety (copy-on-write B-trees)
//! - MVCC (concurrent readers, single writer)

use super::UserStore;
use crate::formats::{snapshot_from_bytes, snapshot_to_bytes};
use crate::state::UserState;
use crate::{DanlearnError, UserId};
use redb::{Database, ReadableDatabase, ReadableTable, ReadableTableMetadata, TableDefinition};
use std::path::Path;

/// Table for records: user id -> encoded snapshot bytes
const USERS: TableDefinition<&str, &[u8]> = TableDefinition::new("users");

/// A disk-backed learner store.
pub struct RedbStore {
    db: Database,
}

impl std::fmt::Debug for RedbStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbStore").finish_non_exhaustive()
    }
}

impl RedbStore {
    /// Open or create a database at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, DanlearnError> {
        let db =
            Database::create(path.as_ref()).map_err(|e| DanlearnError::IoError(e.to_string()))?;

        // Create the table up front so read transactions never miss it.
        {
            let write_txn = db
                .begin_write()
                .map_err(|e| DanlearnError::IoError(e.to_string()))?;
            let _ = write_txn
                .open_table(USERS)
                .map_err(|e| DanlearnError::IoError(e.to_string()))?;
            write_txn
                .commit()
                .map_err(|e| DanlearnError::IoError(e.to_string()))?;
        }

        Ok(Self { db })
    }
}

impl UserStore for RedbStore {
    fn load(&self, user_id: &UserId) -> Result<Option<UserState>, DanlearnError> {
        let read_txn = self
            .db
            .begin_read()
            .map_err(|e| DanlearnError::IoError(e.to_string()))?;
        let table = read_txn
            .open_table(USERS)
            .map_err(|e| DanlearnError::IoError(e.to_string()))?;
        let entry = table
            .get(user_id.as_str())
            .map_err(|e| DanlearnError::IoError(e.to_string()))?;
        entry.map(|bytes| snapshot_from_bytes(bytes.value())).transpose()
    }

    fn save(&self, state: &UserState) -> Result<(), DanlearnError> {
        let bytes = snapshot_to_bytes(state)?;
        let write_txn = self
            .db
            .begin_write()
            .map_err(|e| DanlearnError::IoError(e.to_string()))?;
        {
            let mut table = write_txn
                .open_table(USERS)
                .map_err(|e| DanlearnError::IoError(e.to_string()))?;
            table
                .insert(state.user_id().as_str(), bytes.as_slice())
                .map_err(|e| DanlearnError::IoError(e.to_string()))?;
        }
        write_txn
            .commit()
            .map_err(|e| DanlearnError::IoError(e.to_string()))
    }

    fn user_count(&self) -> Result<usize, DanlearnError> {
        let read_txn = self
            .db
            .begin_read()
            .map_err(|e| DanlearnError::IoError(e.to_string()))?;
        let table = read_txn
            .open_table(USERS)
            .map_err(|e| DanlearnError::IoError(e.to_string()))?;
        let len = table
            .len()
            .map_err(|e| DanlearnError::IoError(e.to_string()))?;
        Ok(len as usize)
    }

    fn user_ids(&self) -> Result<Vec<UserId>, DanlearnError> {
        let read_txn = self
            .db
            .begin_read()
            .map_err(|e| DanlearnError::IoError(e.to_string()))?;
        let table = read_txn
            .open_table(USERS)
            .map_err(|e| DanlearnError::IoError(e.to_string()))?;
        let mut ids = Vec::new();
        for entry in table
            .iter()
            .map_err(|e| DanlearnError::IoError(e.to_string()))?
        {
            let (key, _) = entry.map_err(|e| DanlearnError::IoError(e.to_string()))?;
            ids.push(UserId::new(key.value())?);
        }
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Plan;
    use crate::clock::ManualClock;
    use chrono::{Duration, TimeZone, Utc};
    use tempfile::TempDir;

    fn clock() -> ManualClock {
        ManualClock::new(Utc.with_ymd_and_hms(2026, 8, 20, 7, 0, 0).single().expect("ts"))
    }

    #[test]
    fn records_survive_reopen() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("users.redb");
        let clock = clock();
        let id = UserId::new("persisted").expect("id");

        {
            let store = RedbStore::open(&path).expect("open");
            let mut state = UserState::new(id.clone(), &clock);
            state.activate_subscription(Plan::Pro40, &clock);
            state.add_voice_seconds(600, &clock);
            store.save(&state).expect("save");
        }

        let store = RedbStore::open(&path).expect("reopen");
        let loaded = store.load(&id).expect("load").expect("present");
        assert_eq!(loaded.subscription().plan, Some(Plan::Pro40));
        assert_eq!(loaded.usage().voice.seconds_used, 600);
        assert_eq!(store.user_count().expect("count"), 1);
    }

    #[test]
    fn stale_usage_rolls_over_after_load() {
        let dir = TempDir::new().expect("tempdir");
        let store = RedbStore::open(dir.path().join("users.redb")).expect("open");
        let clock = clock();
        let id = UserId::new("sleepy").expect("id");

        let mut state = UserState::new(id.clone(), &clock);
        state.add_text_step(&clock);
        store.save(&state).expect("save");

        clock.advance(Duration::days(2));
        let mut loaded = store.load(&id).expect("load").expect("present");
        assert_eq!(loaded.usage_for_today(&clock).text.steps_used, 0);
    }

    #[test]
    fn lists_ids_in_order() {
        let dir = TempDir::new().expect("tempdir");
        let store = RedbStore::open(dir.path().join("users.redb")).expect("open");
        let clock = clock();
        for name in ["b", "a", "c"] {
            store
                .save(&UserState::new(UserId::new(name).expect("id"), &clock))
                .expect("save");
        }
        let ids: Vec<String> = store
            .user_ids()
            .expect("ids")
            .into_iter()
            .map(String::from)
            .collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }
}
