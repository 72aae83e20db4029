//! Durable session storage for Railyard.
//!
//! Provides the [`SessionStore`] trait that the session layer persists
//! through, plus two implementations:
//!
//! - [`MemoryStore`]: in-process, for tests and single-node development
//! - [`PgSessionStore`]: PostgreSQL via `sqlx` (feature `postgres`)
//!
//! # Feature Flags
//!
//! - `postgres` (default): PostgreSQL store via `sqlx`

#![allow(async_fn_in_trait)]

mod error;
mod memory;
#[cfg(feature = "postgres")]
mod postgres;

pub use error::StoreError;
pub use memory::MemoryStore;
#[cfg(feature = "postgres")]
pub use postgres::{PgSessionStore, PgStoreConfig};

use std::future::Future;

use chrono::{DateTime, Utc};
use railyard_codec::SessionId;

/// The durable form of a session.
///
/// Only what must survive a restart lives here. Whether a session is
/// editable is derived by the session layer, not stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRecord {
    pub id: SessionId,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    /// Opaque handle to the editing context this session grants access to.
    pub payload_ref: String,
}

impl SessionRecord {
    /// Returns `true` if the record is past its expiry at `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Persistence backend for session records.
///
/// # Trait bounds
///
/// - `Clone` → handles are cheap; every implementation shares its state
///   (a pool, an `Arc`) between clones.
/// - `Send + Sync + 'static` → one store is shared by every request task.
///
/// Every method returns a `Send` future so callers can `.await` it from
/// inside multi-threaded request handlers.
pub trait SessionStore: Clone + Send + Sync + 'static {
    /// Allocates the next session id from a sequence shared by every
    /// process using this store.
    fn next_id(&self) -> impl Future<Output = Result<SessionId, StoreError>> + Send;

    /// Durably writes `record`.
    ///
    /// Idempotent: persisting the same id twice is not an error.
    fn persist(
        &self,
        record: &SessionRecord,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Loads the record for `id`.
    ///
    /// # Errors
    /// Returns [`StoreError::NotFound`] if no such record exists.
    fn load(
        &self,
        id: SessionId,
    ) -> impl Future<Output = Result<SessionRecord, StoreError>> + Send;

    /// Deletes every record whose `expires_at` is at or before `before`.
    /// Returns how many were removed.
    fn delete_expired(
        &self,
        before: DateTime<Utc>,
    ) -> impl Future<Output = Result<u64, StoreError>> + Send;

    /// Checks that the backend is reachable.
    fn ping(&self) -> impl Future<Output = Result<(), StoreError>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_record_is_expired_at_boundary() {
        let now = Utc::now();
        let record = SessionRecord {
            id: SessionId(1),
            created_at: now,
            expires_at: now + Duration::seconds(10),
            payload_ref: "p".into(),
        };

        assert!(!record.is_expired_at(now + Duration::seconds(9)));
        assert!(record.is_expired_at(now + Duration::seconds(10)));
        assert!(record.is_expired_at(now + Duration::seconds(11)));
    }
}
