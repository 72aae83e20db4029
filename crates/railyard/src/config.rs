//! Service settings.
//!
//! Loaded once at startup, in three layers (later wins):
//!
//! 1. built-in defaults
//! 2. `config/settings.{toml,yaml,json,ini}` if present, or whatever path
//!    `RAILYARD_CONFIG` names
//! 3. `RAILYARD__<SECTION>__<KEY>` environment variables, e.g.
//!    `RAILYARD__SESSIONS__SECRET_KEY_PUBLIC`
//!
//! A `.env` file in the working directory is read into the environment
//! first. The two facet secrets have no default and must be provided.

use std::fmt;
use std::time::Duration;

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, Environment, File, FileFormat};
use railyard_codec::{CodecError, Keyring};
use railyard_session::SessionConfig;
use railyard_store::PgStoreConfig;
use serde::Deserialize;

use crate::RailyardError;

const DEFAULT_PATH: &str = "config/settings";
const PATH_VAR: &str = "RAILYARD_CONFIG";
const ENV_PREFIX: &str = "RAILYARD";

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub sessions: SessionSettings,
    pub database: DatabaseSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

#[derive(Clone, Deserialize)]
pub struct SessionSettings {
    /// Hex-encoded secret for view tokens.
    pub secret_key_public: String,
    /// Hex-encoded secret for edit tokens.
    pub secret_key_private: String,
    /// Session lifetime in seconds.
    pub expiration_time: u64,
    /// Seconds between expiry sweeps; `0` turns the sweeper off.
    pub sweep_interval: u64,
    /// Upper bound on a single store call, in seconds.
    pub store_timeout: u64,
}

#[derive(Clone, Deserialize)]
pub struct DatabaseSettings {
    pub host: String,
    pub port: u16,
    pub dbname: String,
    pub user: String,
    pub password: String,
    pub max_connections: u32,
    /// Seconds to wait for a pooled connection.
    pub acquire_timeout: u64,
}

// Secrets and passwords stay out of logs.
impl fmt::Debug for SessionSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionSettings")
            .field("secret_key_public", &"<redacted>")
            .field("secret_key_private", &"<redacted>")
            .field("expiration_time", &self.expiration_time)
            .field("sweep_interval", &self.sweep_interval)
            .field("store_timeout", &self.store_timeout)
            .finish()
    }
}

impl fmt::Debug for DatabaseSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("dbname", &self.dbname)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("max_connections", &self.max_connections)
            .field("acquire_timeout", &self.acquire_timeout)
            .finish()
    }
}

impl Settings {
    /// Loads settings from `.env`, the settings file and the environment.
    pub fn load() -> Result<Self, RailyardError> {
        dotenvy::dotenv().ok();
        let path = std::env::var(PATH_VAR).unwrap_or_else(|_| DEFAULT_PATH.to_string());
        Self::load_from(&path)
    }

    /// Loads settings from `path` (extension optional, file optional) and
    /// the environment.
    ///
    /// # Errors
    /// [`RailyardError::Config`] if a value is missing or has the wrong
    /// type, [`RailyardError::InvalidSetting`] if a value cannot work.
    pub fn load_from(path: &str) -> Result<Self, RailyardError> {
        let settings: Self = defaults()?
            .add_source(File::with_name(path).required(false))
            // No `try_parsing`: it would turn hex secrets like "0011..."
            // into integers and drop the leading zeros.
            .add_source(Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()?
            .try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Parses settings from TOML text layered over the defaults. The
    /// environment is not consulted.
    pub fn from_toml(toml: &str) -> Result<Self, RailyardError> {
        let settings: Self = defaults()?
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()?
            .try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Rejects values that parse but leave the service unusable.
    pub fn validate(&self) -> Result<(), RailyardError> {
        self.session_config().map(|_| ())
    }

    /// `host:port` to bind the HTTP listener to.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Builds the facet keyring.
    ///
    /// # Errors
    /// [`CodecError::InvalidSecret`] if a secret is not hex, is too short,
    /// or both secrets are the same.
    pub fn keyring(&self) -> Result<Keyring, CodecError> {
        Keyring::from_hex(
            &self.sessions.secret_key_public,
            &self.sessions.secret_key_private,
        )
    }

    /// Session lifetime and store timeout for the manager.
    ///
    /// # Errors
    /// [`RailyardError::InvalidSetting`] if either is zero. A zero TTL
    /// expires every session at birth; a zero timeout fails every store
    /// call.
    pub fn session_config(&self) -> Result<SessionConfig, RailyardError> {
        if self.sessions.expiration_time == 0 {
            return Err(RailyardError::InvalidSetting {
                key: "sessions.expiration_time",
                reason: "must be at least 1 second".into(),
            });
        }
        if self.sessions.store_timeout == 0 {
            return Err(RailyardError::InvalidSetting {
                key: "sessions.store_timeout",
                reason: "must be at least 1 second".into(),
            });
        }
        Ok(SessionConfig {
            ttl_secs: self.sessions.expiration_time,
            store_timeout_secs: self.sessions.store_timeout,
        })
    }

    /// Sweeper period, or `None` when sweeping is disabled.
    pub fn sweep_interval(&self) -> Option<Duration> {
        (self.sessions.sweep_interval > 0)
            .then(|| Duration::from_secs(self.sessions.sweep_interval))
    }

    pub fn pg_config(&self) -> PgStoreConfig {
        let db = &self.database;
        PgStoreConfig {
            host: db.host.clone(),
            port: db.port,
            dbname: db.dbname.clone(),
            user: db.user.clone(),
            password: db.password.clone(),
            max_connections: db.max_connections,
            acquire_timeout: Duration::from_secs(db.acquire_timeout),
        }
    }
}

fn defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    Config::builder()
        .set_default("server.host", "0.0.0.0")?
        .set_default("server.port", 5000_i64)?
        .set_default("sessions.expiration_time", 86_400_i64)?
        .set_default("sessions.sweep_interval", 300_i64)?
        .set_default("sessions.store_timeout", 5_i64)?
        .set_default("database.host", "localhost")?
        .set_default("database.port", 5432_i64)?
        .set_default("database.dbname", "railyard")?
        .set_default("database.user", "railyard")?
        .set_default("database.password", "")?
        .set_default("database.max_connections", 10_i64)?
        .set_default("database.acquire_timeout", 3_i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRETS: &str = r#"
        [sessions]
        secret_key_public = "00112233445566778899aabbccddeeff"
        secret_key_private = "ffeeddccbbaa99887766554433221100"
    "#;

    #[test]
    fn test_from_toml_fills_defaults() {
        let settings = Settings::from_toml(SECRETS).unwrap();

        assert_eq!(settings.bind_addr(), "0.0.0.0:5000");
        assert_eq!(settings.sessions.expiration_time, 86_400);
        assert_eq!(settings.sweep_interval(), Some(Duration::from_secs(300)));
        assert_eq!(settings.database.port, 5432);
        assert_eq!(settings.pg_config().acquire_timeout, Duration::from_secs(3));
    }

    #[test]
    fn test_from_toml_missing_secret_fails() {
        let toml = "[sessions]\nsecret_key_public = \"00112233445566778899aabbccddeeff\"\n";
        let result = Settings::from_toml(toml);
        assert!(result.is_err());
    }

    #[test]
    fn test_from_toml_overrides_defaults() {
        let toml = format!(
            "{SECRETS}\nexpiration_time = 60\nsweep_interval = 0\n\n[server]\nport = 8080\n"
        );

        let settings = Settings::from_toml(&toml).unwrap();

        assert_eq!(settings.session_config().unwrap().ttl_secs, 60);
        assert_eq!(settings.sweep_interval(), None);
        assert_eq!(settings.server.port, 8080);
    }

    #[test]
    fn test_keyring_valid_secrets_keep_leading_zeros() {
        let settings = Settings::from_toml(SECRETS).unwrap();

        let keyring = settings.keyring().unwrap();
        let token = keyring
            .encode(railyard_codec::Facet::Public, railyard_codec::SessionId(42))
            .unwrap();

        assert_eq!(token.to_string(), "86fb7aa108ff7555");
    }

    #[test]
    fn test_keyring_identical_secrets_rejected() {
        let toml = r#"
            [sessions]
            secret_key_public = "00112233445566778899aabbccddeeff"
            secret_key_private = "00112233445566778899aabbccddeeff"
        "#;
        let settings = Settings::from_toml(toml).unwrap();

        assert!(settings.keyring().is_err());
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let settings = Settings::from_toml(SECRETS).unwrap();
        let rendered = format!("{settings:?}");
        assert!(!rendered.contains("00112233"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn test_from_toml_zero_expiration_time_rejected() {
        let toml = format!("{SECRETS}\nexpiration_time = 0\n");

        let result = Settings::from_toml(&toml);

        assert!(matches!(
            result,
            Err(RailyardError::InvalidSetting { key: "sessions.expiration_time", .. })
        ));
    }

    #[test]
    fn test_from_toml_zero_store_timeout_rejected() {
        let toml = format!("{SECRETS}\nstore_timeout = 0\n");

        let result = Settings::from_toml(&toml);

        assert!(matches!(
            result,
            Err(RailyardError::InvalidSetting { key: "sessions.store_timeout", .. })
        ));
    }

    #[test]
    fn test_load_from_env_overrides_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        std::fs::write(
            &path,
            r#"
                [server]
                port = 7000

                [sessions]
                secret_key_public = "aabbccddeeff00112233445566778899"
                secret_key_private = "ffeeddccbbaa99887766554433221100"
                expiration_time = 100
            "#,
        )
        .unwrap();

        // SAFETY: this is the only test that touches RAILYARD__ variables.
        unsafe {
            std::env::set_var("RAILYARD__SESSIONS__EXPIRATION_TIME", "42");
            std::env::set_var(
                "RAILYARD__SESSIONS__SECRET_KEY_PUBLIC",
                "00112233445566778899aabbccddeeff",
            );
        }
        let result = Settings::load_from(path.to_str().unwrap());
        unsafe {
            std::env::remove_var("RAILYARD__SESSIONS__EXPIRATION_TIME");
            std::env::remove_var("RAILYARD__SESSIONS__SECRET_KEY_PUBLIC");
        }

        let settings = result.unwrap();
        assert_eq!(settings.session_config().unwrap().ttl_secs, 42);
        assert_eq!(settings.server.port, 7000, "file values survive where env is silent");
        let token = settings
            .keyring()
            .unwrap()
            .encode(railyard_codec::Facet::Public, railyard_codec::SessionId(42))
            .unwrap();
        assert_eq!(token.to_string(), "86fb7aa108ff7555", "hex secret must keep its leading zeros");
    }
}
