//! # Snapshot Format
//!
//! Binary envelope for persisted [`UserState`] records.
//!
//! Format: Header (5 bytes) + JSON payload.
//! - 4 bytes: Magic ("DNLS")
//! - 1 byte: Version
//!
//! The payload is self-describing JSON so records written before a field
//! existed still load, with the field at its default.
//!
//! ## Validation
//!
//! Size and header are checked before the payload is parsed:
//! - Maximum payload size (`MAX_SNAPSHOT_PAYLOAD_SIZE`)
//! - Magic bytes and version

use crate::state::UserState;
use crate::{DanlearnError, primitives};

// =============================================================================
// LIMITS
// =============================================================================

/// Maximum accepted snapshot size. A learner record is a few kilobytes.
pub const MAX_SNAPSHOT_PAYLOAD_SIZE: usize = 1024 * 1024;

const HEADER_SIZE: usize = 5;

// =============================================================================
// HEADER
// =============================================================================

/// The snapshot header precedes every payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnapshotHeader {
    pub magic: [u8; 4],
    pub version: u8,
}

impl SnapshotHeader {
    /// Create a header with the current format version.
    #[must_use]
    pub fn new() -> Self {
        Self {
            magic: *primitives::MAGIC_BYTES,
            version: primitives::FORMAT_VERSION,
        }
    }

    /// Validate magic and version.
    pub fn validate(&self) -> Result<(), DanlearnError> {
        if &self.magic != primitives::MAGIC_BYTES {
            return Err(DanlearnError::DeserializationError(
                "Invalid magic bytes".to_string(),
            ));
        }
        if self.version != primitives::FORMAT_VERSION {
            return Err(DanlearnError::DeserializationError(format!(
                "Unsupported snapshot version: {} (expected {})",
                self.version,
                primitives::FORMAT_VERSION
            )));
        }
        Ok(())
    }

    /// Write header to bytes.
    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut bytes = [0u8; HEADER_SIZE];
        bytes[0..4].copy_from_slice(&self.magic);
        bytes[4] = self.version;
        bytes
    }

    /// Read header from bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DanlearnError> {
        let Some(header) = bytes.get(..HEADER_SIZE) else {
            return Err(DanlearnError::DeserializationError(
                "Header too short".to_string(),
            ));
        };
        let mut magic = [0u8; 4];
        magic.copy_from_slice(&header[0..4]);
        Ok(Self {
            magic,
            version: header[4],
        })
    }
}

impl Default for SnapshotHeader {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// ENCODE / DECODE
// =============================================================================

/// Encode a record as header + JSON payload.
pub fn snapshot_to_bytes(state: &UserState) -> Result<Vec<u8>, DanlearnError> {
    let payload =
        serde_json::to_vec(state).map_err(|e| DanlearnError::SerializationError(e.to_string()))?;

    let mut bytes = Vec::with_capacity(HEADER_SIZE + payload.len());
    bytes.extend_from_slice(&SnapshotHeader::new().to_bytes());
    bytes.extend_from_slice(&payload);
    Ok(bytes)
}

/// Decode a record, validating header and payload size first.
pub fn snapshot_from_bytes(bytes: &[u8]) -> Result<UserState, DanlearnError> {
    let header = SnapshotHeader::from_bytes(bytes)?;
    header.validate()?;

    let payload = bytes.get(HEADER_SIZE..).unwrap_or_default();
    if payload.len() > MAX_SNAPSHOT_PAYLOAD_SIZE {
        return Err(DanlearnError::DeserializationError(format!(
            "Snapshot payload {} bytes exceeds maximum allowed {} bytes",
            payload.len(),
            MAX_SNAPSHOT_PAYLOAD_SIZE
        )));
    }

    serde_json::from_slice(payload).map_err(|e| {
        DanlearnError::DeserializationError(format!("Failed to decode snapshot: {}", e))
    })
}

// =============================================================================
// TESTS
// =============================================================================
