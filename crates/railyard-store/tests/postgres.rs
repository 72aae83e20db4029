//! Integration tests against a live PostgreSQL.
//!
//! Ignored by default. Run with a scratch database:
//!
//! ```text
//! RAILYARD_TEST_DATABASE_URL=postgres://railyard@localhost/railyard_test \
//!     cargo test -p railyard-store -- --ignored
//! ```

#![cfg(feature = "postgres")]

use chrono::{Duration, Utc};
use railyard_codec::SessionId;
use railyard_store::{PgSessionStore, SessionRecord, SessionStore, StoreError};

async fn store() -> PgSessionStore {
    let url = std::env::var("RAILYARD_TEST_DATABASE_URL")
        .expect("RAILYARD_TEST_DATABASE_URL must be set for postgres tests");
    let pool = sqlx::PgPool::connect(&url).await.expect("should connect");
    let store = PgSessionStore::from_pool(pool);
    store.ensure_schema().await.expect("schema should apply");
    store
}

#[tokio::test]
#[ignore]
async fn test_postgres_full_record_lifecycle() {
    let store = store().await;
    store.ping().await.expect("ping should succeed");

    let id = store.next_id().await.unwrap();
    let now = Utc::now();
    let record = SessionRecord {
        id,
        created_at: now,
        expires_at: now + Duration::seconds(60),
        payload_ref: "integration".into(),
    };

    store.persist(&record).await.unwrap();
    store.persist(&record).await.expect("persist must be idempotent");

    let loaded = store.load(id).await.unwrap();
    assert_eq!(loaded.id, id);
    assert_eq!(loaded.payload_ref, "integration");

    let removed = store.delete_expired(now + Duration::seconds(61)).await.unwrap();
    assert!(removed >= 1);
    assert!(matches!(store.load(id).await, Err(StoreError::NotFound(_))));
}

#[tokio::test]
#[ignore]
async fn test_postgres_sequence_is_strictly_increasing() {
    let store = store().await;

    let a = store.next_id().await.unwrap();
    let b = store.next_id().await.unwrap();

    assert!(b > a);
    assert!(store.load(SessionId(u64::MAX)).await.is_err());
}
