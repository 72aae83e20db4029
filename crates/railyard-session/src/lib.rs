//! Session management and capability resolution for Railyard.
//!
//! This crate handles the lifecycle of an editing session:
//!
//! 1. **Creation**: allocating an id, persisting it, minting the two
//!    capability tokens ([`SessionManager::create`])
//! 2. **Resolution**: finding a live session by id, from the in-process
//!    cache or the store ([`SessionManager::resolve`])
//! 3. **Authorization**: turning a presented token into an access
//!    decision ([`Authenticator`], [`AuthResolver`])
//! 4. **Expiry**: lazy on access, plus a background sweep
//!
//! # How it fits in the stack
//!
//! ```text
//! HTTP layer (above)   ← composes create() and auth_by_key()
//!     ↕
//! Session layer (this crate)
//!     ↕                    ↕
//! Codec (tokens)      Store (durable records)
//! ```

#![allow(async_fn_in_trait)]

mod auth;
mod clock;
mod error;
mod manager;
mod session;

pub use auth::{Auth, AuthResolver, Authenticator};
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::SessionError;
pub use manager::{SessionManager, SweepReport};
pub use session::{IssuedSession, Session, SessionConfig, SessionState};
