//! The keyed permutation between session ids and capability tokens.
//!
//! A token is a 64-bit block run through an 8-round balanced Feistel
//! network whose round function is HMAC-SHA256 keyed by the facet secret:
//!
//! ```text
//!   block = tag(24 bits) ‖ id(40 bits)
//!
//!   for r in 0..8:        L, R = R, L ^ F(r, R)       (encode)
//!   for r in 7..=0:       L, R = R ^ F(r, L), L       (decode)
//! ```
//!
//! A Feistel network is invertible no matter what `F` is, so decoding needs
//! no lookup table: run the rounds backwards and you get the block back.
//!
//! The tag is a keyed MAC of the id. Decoding a token under the wrong
//! secret scrambles the block, and the recomputed tag then matches with
//! probability 2⁻²⁴. That is what keeps a public token from being read as
//! a private one.

use crate::keyring::FacetSecret;
use crate::{CapabilityToken, CodecError, SessionId};

const ROUNDS: u8 = 8;
const TAG_BITS: u32 = 64 - SessionId::BITS;
const TAG_MASK: u64 = (1 << TAG_BITS) - 1;

// Domain separation between the two PRF uses.
const TAG_DOMAIN: &[u8] = b"railyard/tag";
const ROUND_DOMAIN: &[u8] = b"railyard/round";

/// Encodes `id` into a token under `secret`.
///
/// Deterministic: the same `(secret, id)` always yields the same token.
///
/// # Errors
/// Returns [`CodecError::IdOutOfRange`] if `id` exceeds [`SessionId::MAX`].
pub fn encode(secret: &FacetSecret, id: SessionId) -> Result<CapabilityToken, CodecError> {
    if !id.is_encodable() {
        return Err(CodecError::IdOutOfRange(id.0));
    }
    let block = (tag(secret, id) << SessionId::BITS) | id.0;

    let (mut left, mut right) = split(block);
    for round in 0..ROUNDS {
        (left, right) = (right, left ^ round_fn(secret, round, right));
    }
    Ok(CapabilityToken(join(left, right)))
}

/// Decodes `token` under `secret`.
///
/// # Errors
/// Returns [`CodecError::TagMismatch`] if the token was not produced by
/// [`encode`] with this secret.
pub fn decode(secret: &FacetSecret, token: CapabilityToken) -> Result<SessionId, CodecError> {
    let (mut left, mut right) = split(token.0);
    for round in (0..ROUNDS).rev() {
        (left, right) = (right ^ round_fn(secret, round, left), left);
    }
    let block = join(left, right);

    let id = SessionId(block & SessionId::MAX);
    let claimed = block >> SessionId::BITS;
    if claimed != tag(secret, id) {
        return Err(CodecError::TagMismatch);
    }
    Ok(id)
}

fn tag(secret: &FacetSecret, id: SessionId) -> u64 {
    let digest = secret.prf(&[TAG_DOMAIN, &id.0.to_be_bytes()]);
    let value = u64::from(digest[0]) << 16 | u64::from(digest[1]) << 8 | u64::from(digest[2]);
    value & TAG_MASK
}

fn round_fn(secret: &FacetSecret, round: u8, half: u32) -> u32 {
    let digest = secret.prf(&[ROUND_DOMAIN, &[round], &half.to_be_bytes()]);
    u32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]])
}

fn split(block: u64) -> (u32, u32) {
    ((block >> 32) as u32, block as u32)
}

fn join(left: u32, right: u32) -> u64 {
    (u64::from(left) << 32) | u64::from(right)
}
