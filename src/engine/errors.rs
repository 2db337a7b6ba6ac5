use sled::transaction::TransactionError;
use thiserror::Error;

/// Errors that can arise while interacting with the roamlog engine and its storage layer.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Wrapper around sled's error type.
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),

    /// Wrapper around bincode serialization and deserialization errors.
    #[error("serialization error: {0}")]
    Bincode(#[from] bincode::Error),

    /// Wrapper around IO errors (directory creation, shape file reads, etc.).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Wrapper around JSON errors (shape index files, ingest payloads).
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Returned when fetching a record that is not present.
    #[error("record not found: {0}")]
    NotFound(String),

    /// Returned when deserializing a record with an unexpected schema version.
    #[error("schema mismatch for {entity}: expected {expected}, got {found}")]
    SchemaMismatch {
        entity: &'static str,
        expected: u8,
        found: u8,
    },

    /// Returned when a rotation targets a quest that is no longer in progress.
    #[error("quest {quest_id} is not in progress; rotation refused")]
    RotationConflict { quest_id: u64 },

    /// Malformed caller input (bad timestamps, empty usernames, etc.).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// UTF-8 encoding error
    #[error("utf-8 error: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    /// Internal error (unexpected conditions)
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<TransactionError<EngineError>> for EngineError {
    fn from(err: TransactionError<EngineError>) -> Self {
        match err {
            TransactionError::Abort(inner) => inner,
            TransactionError::Storage(e) => EngineError::Sled(e),
        }
    }
}
