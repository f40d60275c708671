//! Store error types

use thiserror::Error;

use crate::session::SessionId;

/// Result type alias for snapshot persistence
pub type PersistenceResult<T> = Result<T, PersistenceError>;

/// Error during snapshot persistence.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("serialize failed: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("deserialize failed: {0}")]
    Deserialize(#[source] serde_json::Error),

    #[error("version mismatch: expected at most {expected}, found {found}")]
    VersionMismatch { expected: u32, found: u32 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised by session store operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("Session not found: {0}")]
    SessionNotFound(SessionId),

    /// The session exists but is not receiving events.
    #[error("Session {0} is not live; event rejected")]
    SessionFrozen(SessionId),
}
