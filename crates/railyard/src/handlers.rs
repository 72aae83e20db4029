//! HTTP handlers.
//!
//! Both are thin. `/session` composes [`SessionManager::create`] with
//! [`Authenticator::auth_by_key`], and `/health` asks the store for a ping.
//!
//! [`SessionManager::create`]: railyard_session::SessionManager::create

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use railyard_codec::CapabilityToken;
use railyard_session::Authenticator;
use railyard_store::{SessionStore, StoreError};
use serde::{Deserialize, Serialize};

use crate::{AppState, RailyardError};

/// Body of `GET /session`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionResponse {
    /// Whether the holder of these keys may edit.
    pub is_private: bool,
    pub public_key: CapabilityToken,
    /// Present only when the session is editable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub private_key: Option<CapabilityToken>,
}

/// Body of `GET /health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub db: String,
}

/// `GET /session`: creates a session and returns its keys.
///
/// The fresh session is resolved through its own private key, so the
/// response reports exactly what a later caller presenting that key would
/// get. If the store did not take the write, the session is view-only and
/// the private key is withheld.
pub async fn create_session<S: SessionStore>(
    State(state): State<AppState<S>>,
) -> Result<Json<SessionResponse>, RailyardError> {
    let issued = state.sessions.create().await?;

    let auth = state
        .auth
        .auth_by_key(&issued.tokens.private.to_string())
        .await
        .map_err(|e| {
            RailyardError::Internal(format!(
                "session {} did not resolve after creation: {e}",
                issued.session.id
            ))
        })?;

    if !auth.editable {
        tracing::warn!(
            session_id = %auth.session.id,
            public_key = %issued.tokens.public,
            "session created but not editable, store persistence may be failing"
        );
    }

    Ok(Json(SessionResponse {
        is_private: auth.editable,
        public_key: issued.tokens.public,
        private_key: auth.editable.then_some(issued.tokens.private),
    }))
}

/// `GET /health`: reports whether the session store answers.
pub async fn health<S: SessionStore>(
    State(state): State<AppState<S>>,
) -> (StatusCode, Json<HealthResponse>) {
    let timeout = state.sessions.config().store_timeout();
    let answer = tokio::time::timeout(timeout, state.sessions.store().ping())
        .await
        .unwrap_or(Err(StoreError::Timeout));

    match answer {
        Ok(()) => (
            StatusCode::OK,
            Json(HealthResponse {
                status: "ok".into(),
                db: "connected".into(),
            }),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "health check failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(HealthResponse {
                    status: "error".into(),
                    db: e.to_string(),
                }),
            )
        }
    }
}
