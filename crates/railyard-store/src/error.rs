//! Error types for the storage layer.

use railyard_codec::SessionId;

/// Errors that can occur in the storage layer.
///
/// The variants separate "the database is unreachable" from "the database
/// refused the write". The session layer degrades the same way for both,
/// but logs and health checks need to tell them apart.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No record exists for the id.
    #[error("session {0} not found in store")]
    NotFound(SessionId),

    /// The backend could not be reached (refused, reset, pool closed).
    #[error("store unreachable: {0}")]
    Connectivity(String),

    /// The backend did not answer in time.
    #[error("store call timed out")]
    Timeout,

    /// The backend rejected the operation (constraint, permission, schema).
    #[error("store rejected operation: {0}")]
    Constraint(String),

    /// A stored row cannot be represented (negative id, bad timestamp).
    #[error("corrupt session record: {0}")]
    Corrupt(String),
}

impl StoreError {
    /// Returns `true` if retrying later might succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Connectivity(_) | Self::Timeout)
    }
}
