//! # Strand Server
//!
//! axum server exposing the graph protocol over WebSocket.
//!
//! ## Endpoints
//!
//! - `GET /` and `GET /ws` - WebSocket upgrade, JSON protocol
//! - `GET /health` - Health check (never requires a key)
//! - `GET /status` - Element counts
//!
//! Security settings come from [`ServerConfig`]: allowed CORS origins, a
//! process-wide message rate limit, and an optional API key.

mod auth;
mod handlers;
mod middleware;
mod types;

pub use auth::keys_match;
pub use middleware::{GlobalRateLimiter, admit, create_rate_limiter};
pub use types::{HealthResponse, StatusResponse};

use crate::config::ServerConfig;
use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware as axum_middleware,
    routing::get,
};
use std::path::Path;
use std::sync::Arc;
use strand_core::{MemoryGraph, StrandError, graph_from_bytes, graph_to_bytes};
use tokio::sync::RwLock;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

// =============================================================================
// SERVER STATE
// =============================================================================

/// State shared by every connection.
#[derive(Clone)]
pub struct AppState {
    pub graph: Arc<RwLock<MemoryGraph>>,
    pub config: Arc<ServerConfig>,
    pub limiter: Option<GlobalRateLimiter>,
}

impl AppState {
    #[must_use]
    pub fn new(graph: MemoryGraph, config: ServerConfig) -> Self {
        let limiter = create_rate_limiter(config.rate_limit);
        Self {
            graph: Arc::new(RwLock::new(graph)),
            config: Arc::new(config),
            limiter,
        }
    }
}

// =============================================================================
// CORS CONFIGURATION
// =============================================================================

fn build_cors_layer(origins: Option<&[String]>) -> CorsLayer {
    match origins {
        Some([only]) if only.as_str() == "*" => {
            tracing::warn!("CORS: Allowing ALL origins. This is insecure for production!");
            CorsLayer::permissive()
        }
        Some(origins) => {
            let allowed: Vec<HeaderValue> = origins
                .iter()
                .filter_map(|origin| match origin.parse::<HeaderValue>() {
                    Ok(hv) => {
                        tracing::info!("CORS: Allowing origin: {}", origin);
                        Some(hv)
                    }
                    Err(e) => {
                        tracing::warn!("CORS: Invalid origin '{}': {}", origin, e);
                        None
                    }
                })
                .collect();
            if allowed.is_empty() {
                tracing::warn!("CORS: No valid origins configured, defaulting to localhost only");
                build_localhost_cors()
            } else {
                cors_for(allowed)
            }
        }
        None => build_localhost_cors(),
    }
}

fn build_localhost_cors() -> CorsLayer {
    let origins: Vec<HeaderValue> = [
        "http://localhost:3000",
        "http://localhost:8090",
        "http://127.0.0.1:3000",
        "http://127.0.0.1:8090",
    ]
    .into_iter()
    .filter_map(|o| o.parse().ok())
    .collect();
    cors_for(origins)
}

fn cors_for(origins: Vec<HeaderValue>) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

// =============================================================================
// ROUTER CREATION
// =============================================================================

/// Build the router with all endpoints and middleware.
///
/// Layers, outer to inner: tracing, CORS, rate limit, authentication.
pub fn create_router(state: AppState) -> Router {
    let cors = build_cors_layer(state.config.cors_origins.as_deref());

    match state.config.rate_limit {
        0 => tracing::info!("Rate limiting disabled"),
        rps => tracing::info!("Rate limiting enabled: {} messages/second", rps),
    }
    if state.config.api_key.is_some() {
        tracing::info!("API key authentication enabled");
    } else {
        tracing::warn!("API key authentication DISABLED. Set STRAND_API_KEY to enable it.");
    }

    let mut router = Router::new()
        .route("/", get(handlers::ws_handler))
        .route("/ws", get(handlers::ws_handler))
        .route("/health", get(handlers::health_handler))
        .route("/status", get(handlers::status_handler));

    if state.config.api_key.is_some() {
        router = router.layer(axum_middleware::from_fn_with_state(
            state.clone(),
            auth::api_key_auth_middleware,
        ));
    }
    if state.limiter.is_some() {
        router = router.layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::rate_limit_middleware,
        ));
    }

    router
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// =============================================================================
// SNAPSHOTS
// =============================================================================

/// Read a snapshot file, or start empty if it does not exist yet.
pub fn load_snapshot(path: &Path) -> Result<MemoryGraph, StrandError> {
    if !path.exists() {
        tracing::info!("No snapshot at {}, starting empty", path.display());
        return Ok(MemoryGraph::new());
    }
    let bytes = std::fs::read(path)
        .map_err(|e| StrandError::IoError(format!("Cannot read {}: {}", path.display(), e)))?;
    graph_from_bytes(&bytes)
}

/// Write `graph` to `path` through a temporary file.
pub fn save_snapshot(graph: &MemoryGraph, path: &Path) -> Result<(), StrandError> {
    let bytes = graph_to_bytes(graph)?;
    let tmp = path.with_extension("tmp");
    std::fs::write(&tmp, bytes)
        .and_then(|()| std::fs::rename(&tmp, path))
        .map_err(|e| StrandError::IoError(format!("Cannot write {}: {}", path.display(), e)))
}

// =============================================================================
// SERVER STARTUP
// =============================================================================

/// Serve until ctrl-c, then write the snapshot if one is configured.
pub async fn run_server(config: ServerConfig, graph: MemoryGraph) -> Result<(), StrandError> {
    let addr = config.bind_addr();
    let snapshot = config.snapshot.clone();
    let state = AppState::new(graph, config);
    let router = create_router(state.clone());

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| StrandError::IoError(format!("Bind failed: {}", e)))?;
    tracing::info!("Strand server listening on ws://{}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| StrandError::IoError(format!("Server error: {}", e)))?;

    if let Some(path) = snapshot {
        let graph = state.graph.read().await;
        save_snapshot(&graph, &path)?;
        tracing::info!("Snapshot written to {}", path.display());
    }
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Cannot listen for ctrl-c: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown requested");
}
