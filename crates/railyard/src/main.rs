use railyard::{RailyardError, RailyardServerBuilder, Settings};
use railyard_store::PgSessionStore;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), RailyardError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,railyard=debug")),
        )
        .with_target(true)
        .init();

    let settings = Settings::load()?;
    tracing::debug!(?settings, "configuration loaded");

    let keyring = settings.keyring()?;

    let store = PgSessionStore::connect_lazy(&settings.pg_config());
    // A missing database is not fatal: sessions are issued as view-only
    // until it comes back, and /health reports the outage.
    if let Err(e) = store.ensure_schema().await {
        tracing::warn!(error = %e, "could not prepare session schema, starting degraded");
    }

    let server = RailyardServerBuilder::new()
        .bind(&settings.bind_addr())
        .session_config(settings.session_config()?)
        .sweep_interval(settings.sweep_interval())
        .build(store, keyring)
        .await?;

    tracing::info!(addr = %server.local_addr()?, "listening");
    server.run().await
}
