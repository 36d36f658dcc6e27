//! Idlemint backend server binary.
//!
//! Wires the economy engine to its storage and cache backends, starts the
//! counter-retention maintenance loop, and serves the HTTP API.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `idlemint.yaml` (or `IDLEMINT_CONFIG`)
//! 2. Initialize structured logging (tracing)
//! 3. Connect the selected storage backend (memory or Postgres, with
//!    migrations)
//! 4. Connect the selected cache backend (memory, Redis, or none)
//! 5. Spawn the daily-counter pruning loop
//! 6. Serve the API until the process is terminated

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use idlemint_api::{start_server, AppState};
use idlemint_db::{PgEconomyStore, PostgresPool, RedisCache};
use idlemint_engine::cache::SnapshotCache;
use idlemint_engine::config::{AppConfig, CacheBackend, StorageBackend};
use idlemint_engine::engine::EconomyEngine;
use idlemint_engine::store::EconomyStore;
use idlemint_engine::{InMemoryCache, InMemoryStore, NoopCache};

/// Default config file path, overridable via `IDLEMINT_CONFIG`.
const DEFAULT_CONFIG_PATH: &str = "idlemint.yaml";

/// Interval between daily-counter pruning passes.
const PRUNE_INTERVAL: Duration = Duration::from_secs(60 * 60);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config()?;
    init_logging(&config);

    info!(
        host = %config.server.host,
        port = config.server.port,
        storage = ?config.storage.backend,
        cache = ?config.cache.backend,
        "idlemint-server starting"
    );

    match config.storage.backend {
        StorageBackend::Memory => {
            warn!("using in-memory storage; all state is lost on restart");
            with_cache(config, InMemoryStore::new()).await
        }
        StorageBackend::Postgres => {
            let pool = PostgresPool::connect(&config.storage.postgres_url).await?;
            pool.run_migrations().await?;
            with_cache(config, PgEconomyStore::new(&pool)).await
        }
    }
}

/// Select the cache backend and hand off to [`run`].
async fn with_cache<S>(
    config: AppConfig,
    store: S,
) -> Result<(), Box<dyn std::error::Error>>
where
    S: EconomyStore + 'static,
{
    match config.cache.backend {
        CacheBackend::Memory => run(config, store, InMemoryCache::new()).await,
        CacheBackend::Redis => {
            let cache = RedisCache::connect(&config.cache.redis_url).await?;
            run(config, store, cache).await
        }
        CacheBackend::None => run(config, store, NoopCache).await,
    }
}

/// Build the engine, start maintenance, and serve.
async fn run<S, C>(
    config: AppConfig,
    store: S,
    cache: C,
) -> Result<(), Box<dyn std::error::Error>>
where
    S: EconomyStore + 'static,
    C: SnapshotCache + 'static,
{
    let state = AppState::new(EconomyEngine::new(store, cache, &config));

    spawn_prune_loop(Arc::clone(&state.engine));

    start_server(&config.server, state).await?;
    Ok(())
}

/// Periodically delete daily-counter rows past the retention window.
fn spawn_prune_loop<S, C>(engine: Arc<EconomyEngine<S, C>>)
where
    S: EconomyStore + 'static,
    C: SnapshotCache + 'static,
{
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(PRUNE_INTERVAL);
        loop {
            ticker.tick().await;
            match engine.prune_daily_counters().await {
                Ok(removed) => {
                    if removed > 0 {
                        info!(removed, "daily counter maintenance pass complete");
                    }
                }
                Err(err) => error!(%err, "daily counter maintenance pass failed"),
            }
        }
    });
}

/// Load `idlemint.yaml`, falling back to defaults when the file is
/// absent. A missing file is normal in development; a malformed one is a
/// startup error.
fn load_config() -> Result<AppConfig, Box<dyn std::error::Error>> {
    let path =
        std::env::var("IDLEMINT_CONFIG").unwrap_or_else(|_| String::from(DEFAULT_CONFIG_PATH));
    if Path::new(&path).exists() {
        Ok(AppConfig::from_file(Path::new(&path))?)
    } else {
        let mut config = AppConfig::default();
        config.apply_env_overrides();
        Ok(config)
    }
}

/// Initialize tracing with the configured level and format. `RUST_LOG`
/// overrides the config level when set.
fn init_logging(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.logging.level.clone()));

    if config.logging.json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    }
}
