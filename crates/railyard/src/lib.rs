//! # Railyard
//!
//! Capability-token session service for a collaborative transit-map editor.
//!
//! Every editing session gets two tokens: a public one that grants view
//! access and a private one that grants edit access. This crate is the HTTP
//! face of that system and the place where settings, logging and the
//! session stack are wired together.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use railyard::prelude::*;
//!
//! # async fn run() -> Result<(), RailyardError> {
//! let settings = Settings::load()?;
//! let store = MemoryStore::new();
//!
//! let server = RailyardServerBuilder::new()
//!     .bind(&settings.bind_addr())
//!     .session_config(settings.session_config()?)
//!     .build(store, settings.keyring()?)
//!     .await?;
//! server.run().await
//! # }
//! ```

pub mod config;
mod error;
pub mod handlers;
mod server;

pub use config::Settings;
pub use error::RailyardError;
pub use server::{AppState, RailyardServer, RailyardServerBuilder, router, shutdown_signal};

pub mod prelude {
    pub use crate::{AppState, RailyardError, RailyardServer, RailyardServerBuilder, Settings, router};
    pub use railyard_codec::{CapabilityToken, Facet, Keyring, SessionId};
    pub use railyard_session::{Auth, AuthResolver, Authenticator, SessionConfig, SessionManager};
    pub use railyard_store::{MemoryStore, PgSessionStore, SessionStore};
}
