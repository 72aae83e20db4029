//! In-process [`SessionStore`] backed by a `HashMap`.
//!
//! Clones share one map and one id sequence, so two `SessionManager`s built
//! on clones of the same `MemoryStore` behave like two processes sharing a
//! database. The store can be switched offline, or slowed down, to exercise
//! the degraded paths without a real outage.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use railyard_codec::SessionId;
use tokio::sync::Mutex;

use crate::{SessionRecord, SessionStore, StoreError};

#[derive(Debug)]
struct Inner {
    records: Mutex<HashMap<SessionId, SessionRecord>>,
    next_id: AtomicU64,
    online: AtomicBool,
    latency_ms: AtomicU64,
}

/// A shared, in-memory session store.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

impl MemoryStore {
    /// Creates an empty, online store whose sequence starts at 1.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                records: Mutex::new(HashMap::new()),
                next_id: AtomicU64::new(1),
                online: AtomicBool::new(true),
                latency_ms: AtomicU64::new(0),
            }),
        }
    }

    /// Takes the store offline (`false`) or brings it back (`true`).
    ///
    /// While offline every operation fails with
    /// [`StoreError::Connectivity`].
    pub fn set_online(&self, online: bool) {
        self.inner.online.store(online, Ordering::SeqCst);
    }

    /// Returns `true` if the store is accepting operations.
    pub fn is_online(&self) -> bool {
        self.inner.online.load(Ordering::SeqCst)
    }

    /// Makes every operation wait `latency` before doing anything.
    ///
    /// Models a database that accepts connections but does not answer.
    /// `Duration::ZERO` restores immediate replies.
    pub fn set_latency(&self, latency: Duration) {
        let ms = u64::try_from(latency.as_millis()).unwrap_or(u64::MAX);
        self.inner.latency_ms.store(ms, Ordering::SeqCst);
    }

    /// Returns the number of stored records.
    pub async fn len(&self) -> usize {
        self.inner.records.lock().await.len()
    }

    /// Returns `true` if no records are stored.
    pub async fn is_empty(&self) -> bool {
        self.inner.records.lock().await.is_empty()
    }

    async fn gate(&self) -> Result<(), StoreError> {
        let ms = self.inner.latency_ms.load(Ordering::SeqCst);
        if ms > 0 {
            tokio::time::sleep(Duration::from_millis(ms)).await;
        }
        if self.is_online() {
            Ok(())
        } else {
            Err(StoreError::Connectivity("memory store is offline".into()))
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore for MemoryStore {
    async fn next_id(&self) -> Result<SessionId, StoreError> {
        self.gate().await?;
        Ok(SessionId(self.inner.next_id.fetch_add(1, Ordering::SeqCst)))
    }

    async fn persist(&self, record: &SessionRecord) -> Result<(), StoreError> {
        self.gate().await?;
        // First write wins, matching `ON CONFLICT DO NOTHING`.
        self.inner
            .records
            .lock()
            .await
            .entry(record.id)
            .or_insert_with(|| record.clone());
        Ok(())
    }

    async fn load(&self, id: SessionId) -> Result<SessionRecord, StoreError> {
        self.gate().await?;
        self.inner
            .records
            .lock()
            .await
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound(id))
    }

    async fn delete_expired(&self, before: DateTime<Utc>) -> Result<u64, StoreError> {
        self.gate().await?;
        let mut records = self.inner.records.lock().await;
        let start = records.len();
        records.retain(|_, record| record.expires_at > before);
        Ok((start - records.len()) as u64)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.gate().await
    }
}
