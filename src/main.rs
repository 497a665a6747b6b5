//! CADDM Server - Context-Aware Dynamic Data Masking
//!
//! For every data-access request the server derives contextual risk signals
//! (network origin, time of day, recent authentication failures, device
//! novelty, user privilege), folds them into one score, resolves a masking
//! level from score + role, and transforms the result set field-by-field
//! before it leaves the backend.
//!
//! # Architecture
//!
//! ```text
//! request ─> auth (JWT) ─> policy gates ─> query execution
//!                                               │
//!            audit store <─ signal collectors <─┘
//!                │                │
//!                └── login/device └─> risk scorer ─> mask resolver
//!                    history                              │
//!                                    response <─ row masker
//! ```

mod audit;
mod config;
mod db;
mod error;
mod handlers;
mod masking;
mod middleware;
mod models;
mod risk;

use std::net::SocketAddr;

use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub use error::{AppError, AppResult};

#[tokio::main]
async fn main() {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "caddm_server=debug,tower_http=debug".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = config::Config::from_env();

    // Ambiguous risk semantics are fatal: refuse to start rather than score
    // with invalid weights or thresholds.
    if let Err(reason) = config.risk.validate() {
        tracing::error!("Invalid risk configuration: {}", reason);
        std::process::exit(1);
    }

    tracing::info!("CADDM server starting ({})...", config.environment);
    tracing::info!("Database: {}", config.database_url.split('@').last().unwrap_or("***"));

    // Initialize database pool
    let pool = db::create_pool(&config.database_url).await
        .expect("Failed to create database pool");

    // Run migrations
    tracing::info!("Running database migrations...");
    db::run_migrations(&pool).await
        .expect("Failed to run migrations");

    // Build application state
    let state = AppState {
        audit: audit::PgAuditStore::new(pool.clone()),
        pool,
        config: config.clone(),
    };

    // Build router
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .await
        .unwrap();
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub pool: sqlx::PgPool,
    pub audit: audit::PgAuditStore,
    pub config: config::Config,
}

/// Create the main router with all routes
fn create_router(state: AppState) -> Router {
    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/health", get(handlers::health::check))
        .route("/api/v1/auth/register", post(handlers::auth::register))
        .route("/api/v1/auth/login", post(handlers::auth::login));

    // Masked query access (user JWT auth)
    let query_routes = Router::new()
        .route("/api/v1/query", post(handlers::query::run))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::require_user_auth,
        ));

    Router::new()
        .merge(public_routes)
        .merge(query_routes)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
