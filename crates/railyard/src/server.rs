//! `RailyardServer` builder and serve loop.
//!
//! This is the entry point for running the service. It ties together the
//! layers: store → session manager → auth resolver → HTTP router.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::routing::get;
use railyard_codec::Keyring;
use railyard_session::{AuthResolver, SessionConfig, SessionManager};
use railyard_store::SessionStore;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::RailyardError;
use crate::handlers;

/// Shared state handed to every handler.
///
/// Both fields point at the same manager, so cloning is two `Arc` bumps.
pub struct AppState<S: SessionStore> {
    pub sessions: Arc<SessionManager<S>>,
    pub auth: AuthResolver<S>,
}

impl<S: SessionStore> AppState<S> {
    pub fn new(manager: SessionManager<S>) -> Self {
        let sessions = Arc::new(manager);
        Self {
            auth: AuthResolver::new(Arc::clone(&sessions)),
            sessions,
        }
    }
}

impl<S: SessionStore> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            sessions: Arc::clone(&self.sessions),
            auth: self.auth.clone(),
        }
    }
}

/// Builds the HTTP router. Separate from the server so tests can drive it
/// without a socket.
pub fn router<S: SessionStore>(state: AppState<S>) -> Router {
    Router::new()
        .route("/session", get(handlers::create_session::<S>))
        .route("/health", get(handlers::health::<S>))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Builder for configuring and starting a Railyard server.
///
/// # Example
///
/// ```rust,ignore
/// let server = RailyardServerBuilder::new()
///     .bind("0.0.0.0:5000")
///     .session_config(settings.session_config()?)
///     .build(store, keyring)
///     .await?;
/// server.run().await
/// ```
pub struct RailyardServerBuilder {
    bind_addr: String,
    session_config: SessionConfig,
    sweep_interval: Option<Duration>,
}

impl RailyardServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            bind_addr: "127.0.0.1:5000".to_string(),
            session_config: SessionConfig::default(),
            sweep_interval: Some(Duration::from_secs(300)),
        }
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    /// Sets the session configuration.
    pub fn session_config(mut self, config: SessionConfig) -> Self {
        self.session_config = config;
        self
    }

    /// Sets the expiry sweep period. `None` disables the sweeper.
    pub fn sweep_interval(mut self, every: Option<Duration>) -> Self {
        self.sweep_interval = every;
        self
    }

    /// Binds the listener and wires the session layer onto `store`.
    pub async fn build<S: SessionStore>(
        self,
        store: S,
        keyring: Keyring,
    ) -> Result<RailyardServer<S>, RailyardError> {
        let listener = TcpListener::bind(&self.bind_addr).await?;
        let manager = SessionManager::new(store, keyring, self.session_config);

        Ok(RailyardServer {
            listener,
            state: AppState::new(manager),
            sweep_interval: self.sweep_interval,
        })
    }
}

impl Default for RailyardServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound Railyard server, produced by [`RailyardServerBuilder::build`].
///
/// Call [`run()`](Self::run) to start serving.
pub struct RailyardServer<S: SessionStore> {
    listener: TcpListener,
    state: AppState<S>,
    sweep_interval: Option<Duration>,
}

impl<S: SessionStore> RailyardServer<S> {
    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.listener.local_addr()
    }

    pub fn state(&self) -> &AppState<S> {
        &self.state
    }

    /// Serves until Ctrl-C or SIGTERM.
    pub async fn run(self) -> Result<(), RailyardError> {
        self.run_until(shutdown_signal()).await
    }

    /// Serves until `shutdown` completes, then drains in-flight requests.
    ///
    /// The expiry sweeper, if enabled, runs for the lifetime of the server.
    pub async fn run_until(
        self,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> Result<(), RailyardError> {
        let sweeper = self
            .sweep_interval
            .map(|every| self.state.sessions.spawn_sweeper(every));

        tracing::info!(addr = ?self.listener.local_addr().ok(), "railyard server running");

        let served = axum::serve(self.listener, router(self.state))
            .with_graceful_shutdown(shutdown)
            .await;

        if let Some(handle) = sweeper {
            handle.abort();
        }
        tracing::info!("railyard server stopped");
        Ok(served?)
    }
}

/// Completes on Ctrl-C, or on SIGTERM where there is one.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("shutdown signal received");
}
