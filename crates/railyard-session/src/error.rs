//! Error types for the session layer.

use railyard_codec::{CodecError, SessionId};

/// Errors that can occur during session management.
///
/// Store failures are deliberately absent. A failed write degrades the
/// session to ephemeral and a failed read looks like [`NotFound`], so the
/// caller never has to handle a database error.
///
/// [`NotFound`]: SessionError::NotFound
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The presented key is not a well-formed token (wrong length or
    /// characters). No lookup was attempted.
    #[error("invalid token: {0}")]
    InvalidToken(String),

    /// The key is well-formed but does not grant access to any live
    /// session under either facet.
    #[error("invalid capability")]
    InvalidCapability,

    /// No session exists for the id (never created, or already evicted).
    #[error("session {0} not found")]
    NotFound(SessionId),

    /// The session exists but is past its expiry.
    #[error("session {0} expired")]
    Expired(SessionId),

    /// Tokens could not be minted for a freshly allocated id.
    #[error(transparent)]
    Codec(#[from] CodecError),
}
