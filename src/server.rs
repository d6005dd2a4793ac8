//! HTTP server initialization and runtime setup.
//!
//! Handles tracing, database connections, cache selection, service wiring
//! and the Axum server lifecycle. The wiring helpers are shared with the
//! `admin` binary.

use crate::application::services::{RedirectService, VerificationService};
use crate::config::{CacheBackend, Config};
use crate::domain::repositories::{PostRepository, RedirectRepository};
use crate::infrastructure::cache::{LookupCache, MemoryCache, NullCache, RedisCache};
use crate::infrastructure::http::HttpProber;
use crate::infrastructure::persistence::{PgPostRepository, PgRedirectRepository};
use crate::routes::app_router;
use crate::state::AppState;

use anyhow::{Context, Result};
use axum::http::StatusCode;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Store and cache handles shared by every service.
#[derive(Clone)]
pub struct Stores {
    pub redirects: Arc<dyn RedirectRepository>,
    pub posts: Arc<dyn PostRepository>,
    pub cache: Arc<dyn LookupCache>,
}

/// Installs the global tracing subscriber.
///
/// `RUST_LOG` directives take precedence over the configured level;
/// `LOG_FORMAT=json` switches to structured output.
pub fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.as_str()));

    if config.log_format == "json" {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

/// Opens the connection pool and applies pending migrations.
///
/// # Errors
///
/// Returns an error if the database is unreachable or a migration fails.
pub async fn connect_database(config: &Config) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .acquire_timeout(Duration::from_secs(config.db_connect_timeout))
        .idle_timeout(Duration::from_secs(config.db_idle_timeout))
        .max_lifetime(Duration::from_secs(config.db_max_lifetime))
        .connect(&config.database_url)
        .await
        .context("Failed to connect to database")?;
    tracing::info!("Connected to database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run database migrations")?;

    Ok(pool)
}

/// Builds the configured lookup cache.
///
/// An unreachable Redis degrades to [`NullCache`] so redirects keep being
/// served from the store.
pub async fn build_cache(config: &Config) -> Arc<dyn LookupCache> {
    match (&config.cache_backend, &config.redis_url) {
        (CacheBackend::Redis, Some(redis_url)) => {
            match RedisCache::connect(redis_url, config.cache_ttl_seconds).await {
                Ok(redis) => {
                    tracing::info!("Cache enabled (Redis)");
                    Arc::new(redis)
                }
                Err(e) => {
                    tracing::warn!("Failed to connect to Redis: {}. Using NullCache.", e);
                    Arc::new(NullCache::new())
                }
            }
        }
        (CacheBackend::Memory, _) => {
            tracing::info!("Cache enabled (in-process)");
            Arc::new(MemoryCache::new())
        }
        _ => {
            tracing::info!("Cache disabled (NullCache)");
            Arc::new(NullCache::new())
        }
    }
}

/// Connects the database and cache and wraps them in repositories.
///
/// # Errors
///
/// Returns an error if the database cannot be reached or migrated.
pub async fn build_stores(config: &Config) -> Result<Stores> {
    let pool = Arc::new(connect_database(config).await?);
    let cache = build_cache(config).await;

    Ok(Stores {
        redirects: Arc::new(PgRedirectRepository::new(pool.clone())),
        posts: Arc::new(PgPostRepository::new(pool)),
        cache,
    })
}

pub fn build_redirect_service(config: &Config, stores: &Stores) -> RedirectService {
    RedirectService::new(
        stores.redirects.clone(),
        stores.posts.clone(),
        stores.cache.clone(),
        config.rule_validator(),
        config.resolver_settings(),
    )
}

/// Builds the verification engine with a live HTTP prober.
///
/// # Errors
///
/// Returns an error if the HTTP client cannot be initialised.
pub fn build_verification_service(
    config: &Config,
    stores: &Stores,
    verbose: bool,
) -> Result<VerificationService> {
    let prober = HttpProber::new(config.prober_settings())
        .context("Failed to build HTTP client for redirect probes")?;

    Ok(VerificationService::new(
        stores.redirects.clone(),
        stores.posts.clone(),
        stores.cache.clone(),
        Arc::new(prober),
        config.rule_validator(),
        config.verification_settings(verbose),
    ))
}

/// Runs the HTTP server with the given configuration.
///
/// Initializes:
/// - PostgreSQL connection pool and migrations
/// - Lookup cache (Redis, in-process or disabled)
/// - Redirect service
/// - Axum HTTP server with graceful shutdown on Ctrl+C
///
/// # Errors
///
/// Returns an error if:
/// - Database connection fails
/// - Server bind fails
/// - Server runtime error occurs
pub async fn run(config: Config) -> Result<()> {
    let stores = build_stores(&config).await?;
    let redirect_service = Arc::new(build_redirect_service(&config, &stores));

    let redirect_status = StatusCode::from_u16(config.redirect_status)
        .context("REDIRECT_STATUS is not a valid HTTP status")?;

    let state = AppState::new(
        redirect_service,
        stores.redirects.clone(),
        stores.cache.clone(),
        redirect_status,
    );

    let app = app_router(state);

    let addr: SocketAddr = config.listen_addr.parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Listening on http://{addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
