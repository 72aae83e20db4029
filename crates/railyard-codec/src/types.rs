//! Identity and token types shared by every Railyard layer.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::CodecError;

// ---------------------------------------------------------------------------
// SessionId
// ---------------------------------------------------------------------------

/// A numeric session identifier.
///
/// Ids are allocated densely from a shared sequence, which makes them easy
/// to guess. They never leave the server in raw form; clients only ever see
/// a [`CapabilityToken`] derived from one.
///
/// Only the low [`SessionId::BITS`] bits are usable. The remaining bits of
/// the 64-bit token block carry a keyed check tag.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct SessionId(pub u64);

impl SessionId {
    /// Width of the id field inside a token block.
    pub const BITS: u32 = 40;

    /// Largest encodable id.
    pub const MAX: u64 = (1 << Self::BITS) - 1;

    /// Returns the underlying `u64` value.
    pub fn into_inner(self) -> u64 {
        self.0
    }

    /// Returns `true` if this id fits in a token.
    pub fn is_encodable(self) -> bool {
        self.0 <= Self::MAX
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "S-{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Facet
// ---------------------------------------------------------------------------

/// Which of the two capability roles a token plays.
///
/// ```text
///   Public  → view the shared map
///   Private → view AND edit it (if the session is durable)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Facet {
    Public,
    Private,
}

impl fmt::Display for Facet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Public => write!(f, "public"),
            Self::Private => write!(f, "private"),
        }
    }
}

// ---------------------------------------------------------------------------
// CapabilityToken
// ---------------------------------------------------------------------------

/// An opaque 64-bit capability.
///
/// On the wire it is always exactly 16 lowercase hex digits, zero-padded:
/// `CapabilityToken(0x2a)` renders as `"000000000000002a"`. Parsing accepts
/// upper- or lowercase digits but nothing else: no sign, no `0x` prefix,
/// no whitespace.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct CapabilityToken(pub u64);

impl CapabilityToken {
    /// Number of hex digits in the rendered form.
    pub const HEX_LEN: usize = 16;

    /// Returns the raw 64-bit block.
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for CapabilityToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

// Tokens are secrets. `{:?}` shows only a short prefix so they can appear
// in debug logs without handing out a usable key.
impl fmt::Debug for CapabilityToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered = self.to_string();
        write!(f, "CapabilityToken({}…)", &rendered[..4])
    }
}

impl FromStr for CapabilityToken {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != Self::HEX_LEN {
            return Err(CodecError::Malformed(format!(
                "expected {} hex digits, got {} characters",
                Self::HEX_LEN,
                s.len()
            )));
        }
        // `from_str_radix` tolerates a leading `+`, so check the charset first.
        if !s.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(CodecError::Malformed("non-hex character".into()));
        }
        u64::from_str_radix(s, 16)
            .map(CapabilityToken)
            .map_err(|e| CodecError::Malformed(e.to_string()))
    }
}

impl From<CapabilityToken> for String {
    fn from(token: CapabilityToken) -> Self {
        token.to_string()
    }
}

impl TryFrom<String> for CapabilityToken {
    type Error = CodecError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_display_zero_pads_to_sixteen_digits() {
        assert_eq!(CapabilityToken(0x2a).to_string(), "000000000000002a");
        assert_eq!(CapabilityToken(u64::MAX).to_string(), "ffffffffffffffff");
    }

    #[test]
    fn test_token_from_str_accepts_mixed_case() {
        let token: CapabilityToken = "86FB7aa108ff7555".parse().unwrap();
        assert_eq!(token, CapabilityToken(0x86fb_7aa1_08ff_7555));
    }

    #[test]
    fn test_token_from_str_wrong_length_is_malformed() {
        for input in ["", "abc", "86fb7aa108ff755", "86fb7aa108ff75550"] {
            let result = input.parse::<CapabilityToken>();
            assert!(
                matches!(result, Err(CodecError::Malformed(_))),
                "{input:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_token_from_str_non_hex_is_malformed() {
        for input in ["86fb7aa108ff755g", "+6fb7aa108ff7555", " 6fb7aa108ff7555", "0x6fb7aa108ff755"] {
            let result = input.parse::<CapabilityToken>();
            assert!(
                matches!(result, Err(CodecError::Malformed(_))),
                "{input:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_token_from_str_multibyte_input_is_malformed() {
        // 16 bytes, but not 16 hex digits.
        let result = "éééééééé".parse::<CapabilityToken>();
        assert!(matches!(result, Err(CodecError::Malformed(_))));
    }

    #[test]
    fn test_token_debug_hides_most_digits() {
        let debug = format!("{:?}", CapabilityToken(0x86fb_7aa1_08ff_7555));
        assert!(debug.contains("86fb"));
        assert!(!debug.contains("08ff7555"));
    }

    #[test]
    fn test_session_id_encodable_range() {
        assert!(SessionId(0).is_encodable());
        assert!(SessionId(SessionId::MAX).is_encodable());
        assert!(!SessionId(SessionId::MAX + 1).is_encodable());
    }

    #[test]
    fn test_facet_display() {
        assert_eq!(Facet::Public.to_string(), "public");
        assert_eq!(Facet::Private.to_string(), "private");
    }
}
