//! Error types for the commit store.

use thiserror::Error;

/// Errors from commit store operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The key is locked by another pending branch.
    ///
    /// This signals an upstream key-partition bug, not a legitimate race:
    /// the caller must abandon the whole processing step.
    #[error("Key {} is locked by another pending branch", hex::encode(key))]
    LockContention {
        /// The contested key.
        key: Vec<u8>,
    },

    /// A pending-write log already exists under this id.
    #[error("Pending writes already exist for id {}", hex::encode(id))]
    PendingExists {
        /// The duplicate id.
        id: Vec<u8>,
    },

    /// No pending-write log exists under this id.
    #[error("No pending writes for id {}", hex::encode(id))]
    UnknownPending {
        /// The unknown id.
        id: Vec<u8>,
    },

    /// The persisted pending-write log failed to encode or decode.
    #[error("Pending-write codec failure: {0}")]
    Codec(String),
}
