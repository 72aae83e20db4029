//! Error types for the codec layer.

/// Errors that can occur while encoding or decoding capability tokens.
///
/// None of these are fatal. A decode failure just means "this token does
/// not belong to this facet", and the caller moves on to the next facet.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    /// The token string is not exactly 16 hexadecimal digits.
    #[error("malformed capability token: {0}")]
    Malformed(String),

    /// The token parsed, but its embedded check tag does not match under
    /// this secret. Either it was minted under another facet, or it was
    /// never minted at all.
    #[error("capability token does not decode under this secret")]
    TagMismatch,

    /// The id does not fit in the token's id field.
    #[error("session id {0} is outside the encodable range")]
    IdOutOfRange(u64),

    /// A facet secret could not be parsed or is too weak.
    #[error("invalid facet secret: {0}")]
    InvalidSecret(String),
}
