//! PostgreSQL [`SessionStore`] using `sqlx`.
//!
//! Schema:
//!
//! ```sql
//! CREATE SEQUENCE railyard_session_id_seq;
//! CREATE TABLE railyard_sessions (
//!     id          BIGINT PRIMARY KEY,
//!     created_at  TIMESTAMPTZ NOT NULL,
//!     expires_at  TIMESTAMPTZ NOT NULL,
//!     payload_ref TEXT NOT NULL
//! );
//! ```
//!
//! The sequence is what makes ids unique across every process pointed at
//! the same database.

use std::time::Duration;

use chrono::{DateTime, Utc};
use railyard_codec::SessionId;
use sqlx::PgPool;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};

use crate::{SessionRecord, SessionStore, StoreError};

/// Connection parameters for [`PgSessionStore`].
#[derive(Debug, Clone)]
pub struct PgStoreConfig {
    pub host: String,
    pub port: u16,
    pub dbname: String,
    pub user: String,
    pub password: String,
    pub max_connections: u32,
    /// How long to wait for a pooled connection before giving up.
    pub acquire_timeout: Duration,
}

impl Default for PgStoreConfig {
    fn default() -> Self {
        Self {
            host: "localhost".into(),
            port: 5432,
            dbname: "railyard".into(),
            user: "railyard".into(),
            password: String::new(),
            max_connections: 10,
            acquire_timeout: Duration::from_secs(3),
        }
    }
}

impl PgStoreConfig {
    fn connect_options(&self) -> PgConnectOptions {
        PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .database(&self.dbname)
            .username(&self.user)
            .password(&self.password)
    }
}

type RecordRow = (i64, DateTime<Utc>, DateTime<Utc>, String);

/// A session store backed by a PostgreSQL connection pool.
#[derive(Debug, Clone)]
pub struct PgSessionStore {
    pool: PgPool,
}

impl PgSessionStore {
    /// Creates a store with a lazily connecting pool.
    ///
    /// No connection is opened here, so a database that is down at startup
    /// does not stop the service from booting. The first query pays the
    /// connection cost (or fails with [`StoreError::Connectivity`]).
    pub fn connect_lazy(config: &PgStoreConfig) -> Self {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout)
            .connect_lazy_with(config.connect_options());
        tracing::info!(host = %config.host, port = config.port, db = %config.dbname, "postgres session store configured");
        Self { pool }
    }

    /// Wraps an existing pool.
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Creates the sequence and table if they do not exist yet.
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        sqlx::query("CREATE SEQUENCE IF NOT EXISTS railyard_session_id_seq")
            .execute(&self.pool)
            .await
            .map_err(classify)?;
        sqlx::query(
            r#"CREATE TABLE IF NOT EXISTS railyard_sessions (
                id          BIGINT PRIMARY KEY,
                created_at  TIMESTAMPTZ NOT NULL,
                expires_at  TIMESTAMPTZ NOT NULL,
                payload_ref TEXT NOT NULL
            )"#,
        )
        .execute(&self.pool)
        .await
        .map_err(classify)?;
        sqlx::query(
            "CREATE INDEX IF NOT EXISTS railyard_sessions_expires_at_idx \
             ON railyard_sessions (expires_at)",
        )
        .execute(&self.pool)
        .await
        .map_err(classify)?;
        Ok(())
    }
}

impl SessionStore for PgSessionStore {
    async fn next_id(&self) -> Result<SessionId, StoreError> {
        let raw = sqlx::query_scalar::<_, i64>("SELECT nextval('railyard_session_id_seq')")
            .fetch_one(&self.pool)
            .await
            .map_err(classify)?;
        to_session_id(raw)
    }

    async fn persist(&self, record: &SessionRecord) -> Result<(), StoreError> {
        let id = i64::try_from(record.id.0)
            .map_err(|_| StoreError::Constraint(format!("id {} exceeds BIGINT", record.id)))?;
        sqlx::query(
            r#"INSERT INTO railyard_sessions (id, created_at, expires_at, payload_ref)
               VALUES ($1, $2, $3, $4)
               ON CONFLICT (id) DO NOTHING"#,
        )
        .bind(id)
        .bind(record.created_at)
        .bind(record.expires_at)
        .bind(&record.payload_ref)
        .execute(&self.pool)
        .await
        .map_err(classify)?;
        Ok(())
    }

    async fn load(&self, id: SessionId) -> Result<SessionRecord, StoreError> {
        let Ok(key) = i64::try_from(id.0) else {
            return Err(StoreError::NotFound(id));
        };
        let row = sqlx::query_as::<_, RecordRow>(
            r#"SELECT id, created_at, expires_at, payload_ref
               FROM railyard_sessions
               WHERE id = $1"#,
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await
        .map_err(classify)?;

        let (raw_id, created_at, expires_at, payload_ref) = row.ok_or(StoreError::NotFound(id))?;
        Ok(SessionRecord {
            id: to_session_id(raw_id)?,
            created_at,
            expires_at,
            payload_ref,
        })
    }

    async fn delete_expired(&self, before: DateTime<Utc>) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM railyard_sessions WHERE expires_at <= $1")
            .bind(before)
            .execute(&self.pool)
            .await
            .map_err(classify)?;
        Ok(result.rows_affected())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map_err(classify)?;
        Ok(())
    }
}

fn to_session_id(raw: i64) -> Result<SessionId, StoreError> {
    u64::try_from(raw)
        .map(SessionId)
        .map_err(|_| StoreError::Corrupt(format!("negative session id {raw}")))
}

/// Maps a `sqlx` error onto the store's failure kinds.
fn classify(err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::PoolTimedOut => StoreError::Timeout,
        sqlx::Error::Database(db) => StoreError::Constraint(db.message().to_string()),
        sqlx::Error::ColumnDecode { .. }
        | sqlx::Error::Decode(_)
        | sqlx::Error::ColumnNotFound(_)
        | sqlx::Error::TypeNotFound { .. } => StoreError::Corrupt(err.to_string()),
        other => StoreError::Connectivity(other.to_string()),
    }
}
