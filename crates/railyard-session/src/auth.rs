//! Capability resolution: turning a presented token into an access decision.
//!
//! Every session has two tokens. The public one grants read access; the
//! private one grants edit access, but only if the session is durable.
//! Nothing about a token string says which facet it belongs to, so the
//! resolver tries the private secret first and falls back to the public one.
//!
//! Collaborators (the map and GTFS editing modules) depend on the
//! [`Authenticator`] trait rather than on [`AuthResolver`] directly, so they
//! can be tested against a stub.

use std::sync::Arc;

use railyard_codec::{CapabilityToken, Facet};
use railyard_store::SessionStore;

use crate::{Session, SessionError, SessionManager};

/// The outcome of a successful [`Authenticator::auth_by_key`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Auth {
    pub session: Session,
    /// Which secret the token decoded under.
    pub facet: Facet,
    /// `true` only for a private token on a persisted session.
    pub editable: bool,
}

/// Validates a capability token and returns what it grants.
///
/// # Trait bounds
///
/// - `Send + Sync` → shared across request tasks
/// - `'static` → lives as long as the server
pub trait Authenticator: Send + Sync + 'static {
    /// Resolves `key` to a live session.
    ///
    /// # Returns
    /// - `Ok(Auth)`: the key names a live session
    /// - `Err(SessionError::InvalidToken)`: the key is not 16 hex digits
    /// - `Err(SessionError::InvalidCapability)`: well-formed, but grants nothing
    fn auth_by_key(
        &self,
        key: &str,
    ) -> impl std::future::Future<Output = Result<Auth, SessionError>> + Send;
}

/// The production [`Authenticator`], backed by a [`SessionManager`].
pub struct AuthResolver<S: SessionStore> {
    sessions: Arc<SessionManager<S>>,
}

impl<S: SessionStore> AuthResolver<S> {
    pub fn new(sessions: Arc<SessionManager<S>>) -> Self {
        Self { sessions }
    }

    /// Tries one facet. `None` means "not this one, try the next".
    async fn try_facet(&self, facet: Facet, token: CapabilityToken) -> Option<Auth> {
        let id = self.sessions.keyring().decode(facet, token).ok()?;
        match self.sessions.resolve(id).await {
            Ok(session) => {
                let editable = facet == Facet::Private && session.persisted;
                Some(Auth {
                    session,
                    facet,
                    editable,
                })
            }
            Err(e) => {
                tracing::debug!(%facet, error = %e, "token decoded but session unavailable");
                None
            }
        }
    }
}

// Manual impl: a derive would require `S: Clone` on the struct parameter
// even though only the Arc is cloned.
impl<S: SessionStore> Clone for AuthResolver<S> {
    fn clone(&self) -> Self {
        Self {
            sessions: Arc::clone(&self.sessions),
        }
    }
}

impl<S: SessionStore> Authenticator for AuthResolver<S> {
    async fn auth_by_key(&self, key: &str) -> Result<Auth, SessionError> {
        let token: CapabilityToken = key
            .parse()
            .map_err(|e: railyard_codec::CodecError| SessionError::InvalidToken(e.to_string()))?;

        for facet in [Facet::Private, Facet::Public] {
            if let Some(auth) = self.try_facet(facet, token).await {
                return Ok(auth);
            }
        }
        Err(SessionError::InvalidCapability)
    }
}
