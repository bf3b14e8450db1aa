use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use alertproxy_api::background;
use alertproxy_api::config::{extract_settings_from_env, ServerConfig};
use alertproxy_api::extractor::ContextExtractor;
use alertproxy_api::router::build_app_router;
use alertproxy_api::state::AppState;
use alertproxy_db::{InMemoryJobStore, JobStore, PgJobStore};
use alertproxy_events::ChannelsConfig;
use alertproxy_loki::{LokiClient, LokiConfig};
use alertproxy_worker::{WorkerConfig, WorkerPool};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = ServerConfig::from_env();
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    // --- Job store ---
    let store = connect_store().await;

    // --- Log backend ---
    let loki_config = LokiConfig::from_env();
    let loki = LokiClient::new(&loki_config).expect("Failed to build log backend client");
    tracing::info!(base_url = %loki.base_url(), "Log backend client ready");

    // --- Notification registry ---
    let registry = ChannelsConfig::from_env()
        .build_registry()
        .expect("Failed to load notification templates");
    if registry.is_empty() {
        tracing::warn!("No notification channels configured, jobs will deliver nowhere");
    }

    // --- Worker pool (starts only once every dependency is built) ---
    let (queue, pool) = WorkerPool::start(
        WorkerConfig::from_env(),
        Arc::new(registry),
        Arc::clone(&store),
    );

    let extractor = ContextExtractor::new(Arc::new(loki), extract_settings_from_env(), queue);
    tracing::info!(settings = ?extractor.settings(), "Context extractor ready");

    // --- Background tasks ---
    let retention_cancel = tokio_util::sync::CancellationToken::new();
    let retention_handle = tokio::spawn(background::job_retention::run(
        Arc::clone(&store),
        retention_cancel.clone(),
    ));

    let state = AppState {
        config: Arc::new(config.clone()),
        extractor: Arc::new(extractor),
        store,
    };
    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");

    retention_cancel.cancel();
    let _ = tokio::time::timeout(Duration::from_secs(5), retention_handle).await;
    tracing::info!("Job retention task stopped");

    // The router (and with it the last queue handle) is gone; workers drain
    // whatever is still buffered.
    pool.shutdown(Duration::from_secs(config.shutdown_timeout_secs))
        .await;

    tracing::info!("Graceful shutdown complete");
}

/// Install the global subscriber. `LOG_FORMAT=json` switches to JSON lines.
fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        "alertproxy_api=debug,alertproxy_worker=debug,alertproxy_events=debug,tower_http=debug"
            .into()
    });
    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

/// PostgreSQL when `DATABASE_URL` is set, otherwise a process-local store.
async fn connect_store() -> Arc<dyn JobStore> {
    let Some(database_url) = std::env::var("DATABASE_URL")
        .ok()
        .filter(|v| !v.trim().is_empty())
    else {
        tracing::warn!("DATABASE_URL is not set, job status is kept in memory");
        return Arc::new(InMemoryJobStore::new());
    };

    let pool = alertproxy_db::create_pool(&database_url)
        .await
        .expect("Failed to connect to database");
    tracing::info!("Database connection pool created");

    alertproxy_db::health_check(&pool)
        .await
        .expect("Database health check failed");
    tracing::info!("Database health check passed");

    alertproxy_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database migrations applied");

    Arc::new(PgJobStore::new(pool))
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix) so the server
/// drains cleanly under a process supervisor.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
