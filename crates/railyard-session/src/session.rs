//! Session types: the data structures that represent one editing context.
//!
//! A "session" is the server's record of a shared map project. It tracks:
//! - WHICH project (`id`, `payload_ref`)
//! - WHEN it stops being valid (`expires_at`)
//! - WHETHER it is durable (`persisted`), which decides if edits are allowed

use std::time::Duration;

use chrono::{DateTime, Utc};
use railyard_codec::{SessionId, TokenPair};
use railyard_store::SessionRecord;

// ---------------------------------------------------------------------------
// SessionConfig
// ---------------------------------------------------------------------------

/// Configuration for session behavior.
///
/// Built once at startup and handed to the [`SessionManager`]; nothing
/// reads these values from the environment directly, so tests can swap in
/// a short TTL.
///
/// [`SessionManager`]: crate::SessionManager
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// How long (in seconds) a session stays valid after creation.
    ///
    /// Default: 86 400 (one day).
    pub ttl_secs: u64,

    /// Upper bound (in seconds) on any single store call. A call that runs
    /// longer is treated as a failure.
    ///
    /// Default: 5 seconds.
    pub store_timeout_secs: u64,
}

impl SessionConfig {
    /// Longest TTL honoured; larger values are clamped.
    pub const MAX_TTL_SECS: u64 = 100 * 365 * 86_400;

    /// The TTL as a `chrono` duration, for timestamp arithmetic.
    pub fn ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.ttl_secs.min(Self::MAX_TTL_SECS) as i64)
    }

    /// The store timeout as a `std` duration, for `tokio::time::timeout`.
    pub fn store_timeout(&self) -> Duration {
        Duration::from_secs(self.store_timeout_secs)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 86_400,
            store_timeout_secs: 5,
        }
    }
}

// ---------------------------------------------------------------------------
// SessionState
// ---------------------------------------------------------------------------

/// The lifecycle state of a session.
///
/// ```text
///   Active ──(expires_at reached)──→ Expired
/// ```
///
/// A freshly created session is already `Active`; there is no separate
/// creation event. `Expired` is terminal. A holder whose session expired
/// must ask for a new one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Active,
    Expired,
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// A snapshot of one editing session.
///
/// Sessions are immutable once created: `persisted` and `expires_at` are
/// fixed at creation. Every caller gets its own clone, so nothing is
/// shared mutably between requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub id: SessionId,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    /// Opaque handle to the editing context owned by the map modules.
    pub payload_ref: String,
    /// `true` iff the store committed this session when it was created.
    ///
    /// A session that failed to persist lives only in this process's
    /// memory and is lost on restart. It is never reported editable.
    pub persisted: bool,
}

impl Session {
    /// Wraps a store record. `persisted` says whether it came from (or
    /// made it into) the store.
    pub fn from_record(record: SessionRecord, persisted: bool) -> Self {
        Self {
            id: record.id,
            created_at: record.created_at,
            expires_at: record.expires_at,
            payload_ref: record.payload_ref,
            persisted,
        }
    }

    /// The durable form of this session.
    pub fn to_record(&self) -> SessionRecord {
        SessionRecord {
            id: self.id,
            created_at: self.created_at,
            expires_at: self.expires_at,
            payload_ref: self.payload_ref.clone(),
        }
    }

    /// Returns the state at `now`. Expiry is inclusive: at exactly
    /// `expires_at` the session is already expired.
    pub fn state_at(&self, now: DateTime<Utc>) -> SessionState {
        if now >= self.expires_at {
            SessionState::Expired
        } else {
            SessionState::Active
        }
    }

    /// Shorthand for `state_at(now) == Expired`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.state_at(now) == SessionState::Expired
    }
}

// ---------------------------------------------------------------------------
// IssuedSession
// ---------------------------------------------------------------------------

/// What [`SessionManager::create`](crate::SessionManager::create) hands
/// back: the new session and both of its capability tokens.
///
/// The caller decides which tokens to reveal. The HTTP layer only reveals
/// the private token if the session resolves as editable.
#[derive(Debug, Clone)]
pub struct IssuedSession {
    pub session: Session,
    pub tokens: TokenPair,
}
