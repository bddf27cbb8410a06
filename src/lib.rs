pub mod api;
pub mod auth;
pub mod config;
pub mod content;
pub mod cooldown;
pub mod counter;
pub mod db;
pub mod engine;
pub mod error;
pub mod models;
pub mod presence;

use anyhow::Result;
use axum::{routing::get, Router};
use sqlx::postgres::PgPoolOptions;
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::config::Config;
use crate::cooldown::{start_cleanup_task, CooldownLimiter};
use crate::counter::CounterService;
use crate::db::Database;
use crate::engine::ConsistencyEngine;
use crate::presence::PresenceSignal;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub engine: ConsistencyEngine,
    pub counters: CounterService,
    pub presence: PresenceSignal,
    pub config: Arc<Config>,
}

/// Run the server
pub async fn run(config: Config) -> Result<()> {
    // Connect to database with production settings
    let pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .min_connections(config.database.min_connections)
        .acquire_timeout(Duration::from_secs(config.database.connect_timeout_secs))
        .idle_timeout(Duration::from_secs(config.database.idle_timeout_secs))
        .connect(&config.database.url)
        .await?;

    tracing::info!(
        "Database pool: max={}, min={} connections",
        config.database.max_connections,
        config.database.min_connections
    );

    // Run migrations
    sqlx::migrate!("./migrations").run(&pool).await?;
    tracing::info!("Migrations completed successfully");

    let db = Database::new(pool);
    let presence = PresenceSignal::new();
    let config = Arc::new(config);

    // Cooldown limiter and counters use Redis when configured
    let cooldown = CooldownLimiter::from_config(
        config.security.redis_url.as_deref(),
        config.forum.cooldown_secs,
    )
    .await;
    start_cleanup_task(cooldown.clone());
    let backend = if cooldown.is_redis() { "Redis" } else { "in-memory" };
    tracing::info!(
        "Posting cooldown: {}s per user ({})",
        config.forum.cooldown_secs,
        backend
    );

    let counters = CounterService::from_config(config.security.redis_url.as_deref()).await;

    let engine = ConsistencyEngine::new(
        db.clone(),
        cooldown,
        counters.clone(),
        presence.clone(),
        config.forum.clone(),
    );

    let state = AppState {
        db,
        engine,
        counters,
        presence,
        config: config.clone(),
    };

    // Build CORS layer
    let cors = build_cors_layer(&config.security.cors_origins);

    // Build router
    let app = Router::new()
        // Health check
        .route("/health", get(health_check))
        // Ready check (includes DB connectivity)
        .route("/ready", get({
            let db = state.db.clone();
            move || ready_check(db.clone())
        }))
        // API routes
        .nest("/api/v1", api::router())
        // Presence stream
        .route("/api/v1/stream", get(presence::stream_handler))
        // Middleware layers (order matters - applied bottom to top)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Start server
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!("palaver listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shut down gracefully");
    Ok(())
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "ok"
}

/// Readiness check - verifies database connectivity
async fn ready_check(db: Database) -> Result<&'static str, &'static str> {
    match sqlx::query("SELECT 1").execute(db.pool()).await {
        Ok(_) => Ok("ready"),
        Err(_) => Err("database unavailable"),
    }
}

/// Build CORS layer from configuration
fn build_cors_layer(origins: &str) -> CorsLayer {
    if origins == "*" {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        use tower_http::cors::AllowOrigin;

        let origins: Vec<_> = origins
            .split(',')
            .filter_map(|s| s.trim().parse().ok())
            .collect();

        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
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
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, shutting down...");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, shutting down...");
        }
    }
}
