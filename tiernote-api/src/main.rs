//! tiernote API Server Entry Point
//!
//! Startup order: telemetry, configuration, cache tier, durable tier
//! (pool, ping, schema), reconcile, bind, serve. Any failure before the
//! listener is bound exits non-zero.

use std::sync::Arc;

use tiernote_api::telemetry::{init_tracing, TelemetryConfig};
use tiernote_api::{
    create_api_router, ApiConfig, ApiError, ApiResult, AppState, CacheConfig, DbConfig,
    PgDurableTier,
};
use tiernote_storage::{
    CacheTier, DurableTier, LmdbCacheTier, MigrationPolicy, NoteStore, NotificationBus,
};

#[tokio::main]
async fn main() {
    let telemetry_config = match TelemetryConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("tiernote-api: {}", e);
            std::process::exit(1);
        }
    };
    if let Err(e) = init_tracing(&telemetry_config) {
        eprintln!("tiernote-api: {}", e);
        std::process::exit(1);
    }

    if let Err(e) = run().await {
        tracing::error!(error = %e, "Server failed");
        std::process::exit(1);
    }
}

async fn run() -> ApiResult<()> {
    let api_config = ApiConfig::from_env()?;
    let cache_config = CacheConfig::from_env()?;
    let db_config = DbConfig::from_env()?;

    let cache = Arc::new(LmdbCacheTier::open(
        &cache_config.path,
        cache_config.key.clone(),
        cache_config.map_size_mb,
    )?);
    cache.ping().await?;
    tracing::info!(
        path = %cache_config.path.display(),
        key = %cache_config.key,
        "Cache tier ready"
    );

    let durable = Arc::new(PgDurableTier::from_config(&db_config)?);
    durable.ping().await?;
    durable.ensure_schema().await?;
    tracing::info!(
        host = %db_config.host,
        dbname = %db_config.dbname,
        table = %durable.table(),
        pool_size = durable.pool_size(),
        "Durable tier ready"
    );

    let store = Arc::new(NoteStore::new(
        cache.clone(),
        durable.clone(),
        MigrationPolicy::new(cache_config.threshold),
        Arc::new(NotificationBus::new(api_config.ws_capacity)),
    ));
    let repaired = store.reconcile().await?;
    if repaired > 0 {
        tracing::warn!(repaired = repaired, "Repaired interrupted eviction");
    }

    let app = create_api_router(AppState::new(store), &api_config);

    let addr = api_config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to bind {}: {}", addr, e)))?;
    tracing::info!(
        %addr,
        threshold = cache_config.threshold,
        "Starting tiernote API server"
    );

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| ApiError::internal_error(format!("Server error: {}", e)));

    durable.close();
    tracing::info!("Durable tier pool closed");
    served
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
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
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
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
    tracing::info!("Shutdown signal received");
}
