//! Capability tokens for Railyard.
//!
//! This crate turns a numeric session id into the opaque 16-hex-digit keys
//! that clients hold, and back again:
//!
//! - **Types** ([`SessionId`], [`CapabilityToken`], [`Facet`]): the values
//!   that cross the boundary between the session layer and the outside world.
//! - **Codec** ([`encode`], [`decode`]): a keyed Feistel permutation over
//!   64-bit blocks. Same secret in, same token out; a different secret gives
//!   an unrelated token.
//! - **Keys** ([`FacetSecret`], [`Keyring`]): one secret per facet, loaded
//!   once at startup.
//! - **Errors** ([`CodecError`]).
//!
//! # Architecture
//!
//! ```text
//! Session layer (SessionId) → Codec (Keyring) → Client (CapabilityToken)
//! ```
//!
//! Nothing in here does I/O or holds mutable state, so every function is
//! safe to call from any number of threads at once.

mod codec;
mod error;
mod keyring;
mod types;

pub use codec::{decode, encode};
pub use error::CodecError;
pub use keyring::{FacetSecret, Keyring, TokenPair};
pub use types::{CapabilityToken, Facet, SessionId};
