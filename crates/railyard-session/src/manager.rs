//! The session manager: creates, caches, resolves and expires sessions.
//!
//! This is the central piece of the session layer. It's responsible for:
//! - Allocating session ids (from the store's shared sequence)
//! - Persisting new sessions, and degrading gracefully when that fails
//! - Minting both capability tokens for every new session
//! - Resolving ids to live sessions, cache first, store second
//! - Expiring sessions lazily on access and in a background sweep
//!
//! # Concurrency note
//!
//! `SessionManager` is shared as `Arc<SessionManager<S>>` across every
//! request task. The cache is a `DashMap`, so each entry is locked only for
//! the instant it takes to clone or insert it. No cache guard is ever held
//! across an `.await`, which means store I/O never runs under a lock.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use railyard_codec::{CodecError, Keyring, SessionId};
use railyard_store::{SessionRecord, SessionStore, StoreError};
use rand::Rng;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::{Clock, IssuedSession, Session, SessionConfig, SessionError, SystemClock};

/// Ids with this bit set are ephemeral: minted in-process when the store
/// could not allocate one. The store sequence never reaches this range.
const EPHEMERAL_BIT: u64 = 1 << (SessionId::BITS - 1);

/// Outcome of one expiry sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweepReport {
    /// Entries evicted from the in-process cache.
    pub cached: usize,
    /// Records deleted from the store, or `None` if the store call failed.
    pub stored: Option<u64>,
}

/// Manages every session this process knows about.
///
/// ## Lifecycle
///
/// ```text
/// create() ──→ [Active] ──(expires_at)──→ [Expired] ──→ sweep_expired()
///                 │                            │
///                 └── resolve() → Ok(session)  └── resolve() → Err(Expired)
/// ```
pub struct SessionManager<S: SessionStore> {
    /// Durable backend; also the id allocator.
    store: S,

    /// Both facet secrets.
    keyring: Keyring,

    config: SessionConfig,

    clock: Arc<dyn Clock>,

    /// Live sessions seen by this process, keyed by id.
    ///
    /// Ephemeral sessions exist ONLY here. Everything else is also in the
    /// store and can be reloaded after eviction.
    cache: DashMap<SessionId, Session>,
}

impl<S: SessionStore> SessionManager<S> {
    /// Creates a manager using the system clock.
    pub fn new(store: S, keyring: Keyring, config: SessionConfig) -> Self {
        Self {
            store,
            keyring,
            config,
            clock: Arc::new(SystemClock),
            cache: DashMap::new(),
        }
    }

    /// Replaces the time source. Tests use a [`ManualClock`](crate::ManualClock).
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn keyring(&self) -> &Keyring {
        &self.keyring
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Creates a new session and mints its tokens.
    ///
    /// Steps:
    /// 1. Allocate an id from the store sequence. If the store is down,
    ///    fall back to a random ephemeral id.
    /// 2. Mint the public and private tokens.
    /// 3. Try to persist the record. Failure is logged, not returned: the
    ///    session is kept in memory with `persisted = false`.
    /// 4. Cache the session and return it with both tokens.
    ///
    /// # Errors
    /// Returns [`SessionError::Codec`] if the store sequence has run past
    /// the encodable id range.
    pub async fn create(&self) -> Result<IssuedSession, SessionError> {
        let now = self.clock.now();

        let (id, durable) = match self.bounded(self.store.next_id()).await {
            Ok(id) if id.0 < EPHEMERAL_BIT => (id, true),
            Ok(id) => {
                tracing::error!(session_id = %id, "session id sequence exhausted");
                return Err(CodecError::IdOutOfRange(id.0).into());
            }
            Err(e) => {
                tracing::warn!(error = %e, "id allocation failed, issuing ephemeral session");
                (self.ephemeral_id(), false)
            }
        };

        let tokens = self.keyring.issue(id)?;

        let record = SessionRecord {
            id,
            created_at: now,
            expires_at: now
                .checked_add_signed(self.config.ttl())
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
            payload_ref: uuid::Uuid::new_v4().to_string(),
        };

        let persisted = durable && self.try_persist(&record).await;

        let session = Session::from_record(record, persisted);
        self.add(session.clone());

        tracing::info!(session_id = %id, persisted, "session created");
        Ok(IssuedSession { session, tokens })
    }

    /// Registers an already-built session in the cache.
    ///
    /// Replaces any entry with the same id.
    pub fn add(&self, session: Session) {
        self.cache.insert(session.id, session);
    }

    /// Looks up a live session by id.
    ///
    /// Checks the cache first, then the store. A session found in the store
    /// was by definition persisted, and is cached for later lookups.
    ///
    /// # Errors
    /// - [`SessionError::Expired`]: the session is past `expires_at`
    ///   (a cached entry is evicted on the spot)
    /// - [`SessionError::NotFound`]: no such session, or the store could
    ///   not be asked in time
    pub async fn resolve(&self, id: SessionId) -> Result<Session, SessionError> {
        let now = self.clock.now();

        // Clone out of the map so the shard guard drops before any await.
        let cached = self.cache.get(&id).map(|entry| entry.value().clone());
        if let Some(session) = cached {
            if session.is_expired_at(now) {
                self.cache.remove(&id);
                tracing::debug!(session_id = %id, "evicted expired session");
                return Err(SessionError::Expired(id));
            }
            return Ok(session);
        }

        // Ephemeral sessions never reach the store. A cache miss means it
        // is gone (swept, or created by another process).
        if is_ephemeral(id) {
            return Err(SessionError::NotFound(id));
        }

        match self.bounded(self.store.load(id)).await {
            Ok(record) => {
                let session = Session::from_record(record, true);
                if session.is_expired_at(now) {
                    return Err(SessionError::Expired(id));
                }
                self.cache.insert(id, session.clone());
                Ok(session)
            }
            Err(StoreError::NotFound(_)) => Err(SessionError::NotFound(id)),
            Err(e) => {
                tracing::warn!(session_id = %id, error = %e, "store lookup failed");
                Err(SessionError::NotFound(id))
            }
        }
    }

    /// Returns the cached session for `id`, without consulting the store
    /// or checking expiry.
    pub fn get(&self, id: SessionId) -> Option<Session> {
        self.cache.get(&id).map(|entry| entry.value().clone())
    }

    /// Removes expired sessions from the cache and the store.
    pub async fn sweep_expired(&self) -> SweepReport {
        let now = self.clock.now();

        let mut cached = 0;
        self.cache.retain(|_, session| {
            let keep = !session.is_expired_at(now);
            if !keep {
                cached += 1;
            }
            keep
        });

        let stored = match self.bounded(self.store.delete_expired(now)).await {
            Ok(n) => Some(n),
            Err(e) => {
                tracing::warn!(error = %e, "store expiry sweep failed");
                None
            }
        };

        if cached > 0 || stored.is_some_and(|n| n > 0) {
            tracing::info!(cached, stored = stored.unwrap_or(0), "expired sessions swept");
        }
        SweepReport { cached, stored }
    }

    /// Spawns a background task that calls [`sweep_expired`](Self::sweep_expired)
    /// every `every`.
    ///
    /// The task runs until the returned handle is aborted or the runtime
    /// shuts down. Resolution does its own expiry check, so requests never
    /// wait on the sweep.
    pub fn spawn_sweeper(self: &Arc<Self>, every: Duration) -> JoinHandle<()> {
        let manager = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // The first tick completes immediately; skip it so the first
            // sweep happens one full interval after startup.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                manager.sweep_expired().await;
            }
        })
    }

    /// Returns the number of cached sessions.
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    /// Returns `true` if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    async fn try_persist(&self, record: &SessionRecord) -> bool {
        match self.bounded(self.store.persist(record)).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(
                    session_id = %record.id,
                    error = %e,
                    transient = e.is_transient(),
                    "session persistence failed, session is ephemeral"
                );
                false
            }
        }
    }

    /// Runs a store call under the configured timeout.
    async fn bounded<T>(
        &self,
        call: impl Future<Output = Result<T, StoreError>>,
    ) -> Result<T, StoreError> {
        tokio::time::timeout(self.config.store_timeout(), call)
            .await
            .unwrap_or(Err(StoreError::Timeout))
    }

    /// Draws a random id from the ephemeral half of the id space.
    fn ephemeral_id(&self) -> SessionId {
        let mut rng = rand::rng();
        loop {
            let raw = EPHEMERAL_BIT | (rng.random::<u64>() & (EPHEMERAL_BIT - 1));
            let id = SessionId(raw);
            if !self.cache.contains_key(&id) {
                return id;
            }
        }
    }
}

fn is_ephemeral(id: SessionId) -> bool {
    id.0 & EPHEMERAL_BIT != 0
}

// =========================================================================
// Tests
// =========================================================================
