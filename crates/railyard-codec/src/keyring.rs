//! Facet secrets and the keyring that pairs them.
//!
//! Each facet (public, private) has its own secret. The secrets are parsed
//! from hex once at startup and never change afterwards, so a [`Keyring`]
//! can be cloned freely and shared across every request handler.

use std::fmt;
use std::str::FromStr;

use hmac::{Hmac, Mac};
use serde::Serialize;
use sha2::Sha256;

use crate::{CapabilityToken, CodecError, Facet, SessionId, codec};

pub(crate) type HmacSha256 = Hmac<Sha256>;

// ---------------------------------------------------------------------------
// FacetSecret
// ---------------------------------------------------------------------------

/// The key for one facet of the token codec.
///
/// Holds a pre-keyed HMAC instance. Each PRF call clones it instead of
/// re-running the key schedule.
#[derive(Clone)]
pub struct FacetSecret {
    bytes: Vec<u8>,
    mac: HmacSha256,
}

impl FacetSecret {
    /// Minimum secret length in bytes (64 bits).
    pub const MIN_LEN: usize = 8;

    /// Builds a secret from raw key bytes.
    ///
    /// # Errors
    /// Returns [`CodecError::InvalidSecret`] if the key is shorter than
    /// [`FacetSecret::MIN_LEN`].
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CodecError> {
        if bytes.len() < Self::MIN_LEN {
            return Err(CodecError::InvalidSecret(format!(
                "need at least {} bytes, got {}",
                Self::MIN_LEN,
                bytes.len()
            )));
        }
        let mac = HmacSha256::new_from_slice(bytes)
            .map_err(|e| CodecError::InvalidSecret(e.to_string()))?;
        Ok(Self {
            bytes: bytes.to_vec(),
            mac,
        })
    }

    /// Parses a hex-encoded secret (even length, at least 16 digits).
    ///
    /// # Errors
    /// [`CodecError::InvalidSecret`] if the text is not even-length hex or
    /// decodes to fewer than [`Self::MIN_LEN`] bytes.
    pub fn from_hex(hex_str: &str) -> Result<Self, CodecError> {
        let bytes = hex::decode(hex_str.trim())
            .map_err(|e| CodecError::InvalidSecret(e.to_string()))?;
        Self::from_bytes(&bytes)
    }

    /// Keyed PRF: HMAC-SHA256 over the concatenation of `parts`.
    pub(crate) fn prf(&self, parts: &[&[u8]]) -> [u8; 32] {
        let mut mac = self.mac.clone();
        for part in parts {
            mac.update(part);
        }
        let digest = mac.finalize().into_bytes();
        let mut out = [0u8; 32];
        out.copy_from_slice(&digest);
        out
    }
}

impl FromStr for FacetSecret {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl PartialEq for FacetSecret {
    fn eq(&self, other: &Self) -> bool {
        self.bytes == other.bytes
    }
}

impl Eq for FacetSecret {}

impl fmt::Debug for FacetSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FacetSecret(<{} bytes redacted>)", self.bytes.len())
    }
}

// ---------------------------------------------------------------------------
// TokenPair
// ---------------------------------------------------------------------------

/// Both capability tokens for one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TokenPair {
    pub public: CapabilityToken,
    pub private: CapabilityToken,
}

impl TokenPair {
    /// Returns the token for the given facet.
    pub fn get(&self, facet: Facet) -> CapabilityToken {
        match facet {
            Facet::Public => self.public,
            Facet::Private => self.private,
        }
    }
}

// ---------------------------------------------------------------------------
// Keyring
// ---------------------------------------------------------------------------

/// The two facet secrets, bundled.
///
/// This is the only thing the session layer needs to mint or check tokens.
#[derive(Debug, Clone)]
pub struct Keyring {
    public: FacetSecret,
    private: FacetSecret,
}

impl Keyring {
    /// Creates a keyring from two secrets.
    ///
    /// # Errors
    /// Returns [`CodecError::InvalidSecret`] if both facets share a secret.
    /// With one secret the public token would equal the private token.
    pub fn new(public: FacetSecret, private: FacetSecret) -> Result<Self, CodecError> {
        if public == private {
            return Err(CodecError::InvalidSecret(
                "public and private facet secrets must differ".into(),
            ));
        }
        Ok(Self { public, private })
    }

    /// Parses both secrets from hex.
    pub fn from_hex(public: &str, private: &str) -> Result<Self, CodecError> {
        Self::new(FacetSecret::from_hex(public)?, FacetSecret::from_hex(private)?)
    }

    /// Returns the secret for `facet`.
    pub fn secret(&self, facet: Facet) -> &FacetSecret {
        match facet {
            Facet::Public => &self.public,
            Facet::Private => &self.private,
        }
    }

    /// Encodes `id` under the secret for `facet`.
    pub fn encode(&self, facet: Facet, id: SessionId) -> Result<CapabilityToken, CodecError> {
        codec::encode(self.secret(facet), id)
    }

    /// Decodes `token` under the secret for `facet`.
    pub fn decode(&self, facet: Facet, token: CapabilityToken) -> Result<SessionId, CodecError> {
        codec::decode(self.secret(facet), token)
    }

    /// Mints both tokens for `id`.
    pub fn issue(&self, id: SessionId) -> Result<TokenPair, CodecError> {
        Ok(TokenPair {
            public: self.encode(Facet::Public, id)?,
            private: self.encode(Facet::Private, id)?,
        })
    }
}
