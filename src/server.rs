//! HTTP server initialization and runtime setup.
//!
//! Handles storage selection, validator wiring, the rate limit sweeper and
//! the Axum server lifecycle.

use crate::application::services::{LinkService, RateLimiter};
use crate::config::Config;
use crate::domain::repositories::UrlRepository;
use crate::infrastructure::network::{HttpProbe, SystemResolver};
use crate::infrastructure::persistence::{MemoryUrlRepository, PgUrlRepository};
use crate::routes::app_router;
use crate::state::AppState;
use crate::utils::address_safety::AddressSafety;
use crate::utils::url_validator::UrlValidator;

use anyhow::{Context, Result};
use axum::ServiceExt;
use axum::extract::Request;
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;

/// Runs the HTTP server with the given configuration.
///
/// Initializes:
/// - PostgreSQL connection pool and migrations, or the in-memory store
/// - DNS resolver, HTTP probe and URL validator
/// - Rate limiter and its idle-client sweeper
/// - Axum HTTP server with graceful shutdown
///
/// # Errors
///
/// Returns an error if:
/// - Database connection or migration fails
/// - The probe HTTP client cannot be built
/// - Server bind fails
/// - Server runtime error occurs
pub async fn run(config: Config) -> Result<()> {
    let repository = connect_storage(&config).await?;

    let resolver = Arc::new(SystemResolver::new(config.probe_timeout()));
    let probe =
        Arc::new(HttpProbe::new(config.probe_timeout()).context("Failed to build probe client")?);
    let validator = UrlValidator::new(
        AddressSafety::new(resolver),
        probe,
        config.validator_config(),
    );

    let link_service = Arc::new(LinkService::new(
        repository.clone(),
        validator,
        config.storage_timeout(),
    ));

    let rate_limiter = Arc::new(RateLimiter::new(config.rate_limiter_config()));
    let sweeper = rate_limiter.start_sweeper();
    tracing::info!("Rate limit sweeper started");

    let state = AppState::new(
        link_service,
        rate_limiter,
        repository,
        config.base_url.clone(),
        config.behind_proxy,
    );

    let app = app_router(state);

    let addr: SocketAddr = config
        .listen_addr
        .parse()
        .with_context(|| format!("Invalid listen address '{}'", config.listen_addr))?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Listening on http://{addr}");

    let served = axum::serve(
        listener,
        ServiceExt::<Request>::into_make_service_with_connect_info::<SocketAddr>(app),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await;

    sweeper.shutdown().await;
    tracing::info!("Server stopped");

    served?;
    Ok(())
}

async fn connect_storage(config: &Config) -> Result<Arc<dyn UrlRepository>> {
    let Some(ref database_url) = config.database_url else {
        tracing::warn!("No database configured, links are kept in memory");
        return Ok(Arc::new(MemoryUrlRepository::new()));
    };

    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .acquire_timeout(Duration::from_secs(config.db_connect_timeout))
        .connect(database_url)
        .await
        .context("Failed to connect to database")?;
    tracing::info!("Connected to database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run migrations")?;

    Ok(Arc::new(PgUrlRepository::new(Arc::new(pool))))
}

/// Resolves on SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received SIGINT, shutting down"),
        _ = terminate => tracing::info!("Received SIGTERM, shutting down"),
    }
}
