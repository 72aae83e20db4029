//! Unified error type for the Railyard service.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use railyard_codec::CodecError;
use railyard_session::SessionError;
use railyard_store::StoreError;
use serde::Serialize;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant generates the `From` impl, so
/// `?` converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum RailyardError {
    /// Bad secret or an id outside the token domain.
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// A storage error that reached the service (startup, health).
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Session creation or resolution failed.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// Settings could not be loaded or deserialized.
    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// A setting parsed but holds a value the service cannot run with.
    #[error("invalid setting {key}: {reason}")]
    InvalidSetting { key: &'static str, reason: String },

    /// Binding or serving failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Anything that should not happen with a healthy process.
    #[error("internal error: {0}")]
    Internal(String),
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl RailyardError {
    fn status(&self) -> StatusCode {
        match self {
            Self::Session(SessionError::InvalidToken(_)) => StatusCode::BAD_REQUEST,
            Self::Session(SessionError::InvalidCapability) => StatusCode::FORBIDDEN,
            Self::Session(SessionError::NotFound(_)) => StatusCode::NOT_FOUND,
            Self::Session(SessionError::Expired(_)) => StatusCode::GONE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for RailyardError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::debug!(error = %self, "request rejected");
        }
        (status, Json(ErrorBody { error: self.to_string() })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use railyard_codec::SessionId;

    #[test]
    fn test_from_codec_error() {
        let err: RailyardError = CodecError::IdOutOfRange(1 << 40).into();
        assert!(matches!(err, RailyardError::Codec(_)));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_from_store_error() {
        let err: RailyardError = StoreError::Connectivity("refused".into()).into();
        assert!(matches!(err, RailyardError::Store(_)));
        assert!(err.to_string().contains("refused"));
    }

    #[test]
    fn test_from_session_error_maps_status() {
        let cases = [
            (SessionError::InvalidToken("short".into()), StatusCode::BAD_REQUEST),
            (SessionError::InvalidCapability, StatusCode::FORBIDDEN),
            (SessionError::NotFound(SessionId(3)), StatusCode::NOT_FOUND),
            (SessionError::Expired(SessionId(3)), StatusCode::GONE),
            (
                SessionError::Codec(CodecError::TagMismatch),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (session_err, expected) in cases {
            let err: RailyardError = session_err.into();
            assert_eq!(err.status(), expected, "{err}");
        }
    }

    #[test]
    fn test_invalid_setting_names_the_key() {
        let err = RailyardError::InvalidSetting {
            key: "sessions.expiration_time",
            reason: "must be at least 1 second".into(),
        };
        assert!(err.to_string().contains("sessions.expiration_time"));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_into_response_uses_status() {
        let response = RailyardError::Internal("boom".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
