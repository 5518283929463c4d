//! # Formats
//!
//! Byte-level encoding of learner snapshots. File and database I/O live in
//! the `storage` module.

pub mod snapshot;

pub use snapshot::{MAX_SNAPSHOT_PAYLOAD_SIZE, SnapshotHeader, snapshot_from_bytes, snapshot_to_bytes};
