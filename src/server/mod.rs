//! HTTP surface: chat, liveness and graph data-management endpoints.

mod handlers;
pub mod types;

use std::future::Future;
use std::sync::Arc;

use axum::{
    http::HeaderValue,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::chat::ChatService;
use crate::config::ServerConfig;
use crate::error::{RecipebotError, Result};
use crate::graph::GraphStore;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub chat: Arc<ChatService>,
    pub graph: Arc<dyn GraphStore>,
    /// Property the request `pk` field is stored under.
    pub partition_key: String,
}

/// Check if a port is available by attempting to bind to it
async fn check_port_available(host: &str, port: u16) -> bool {
    tokio::net::TcpListener::bind((host, port)).await.is_ok()
}

/// Build the router. An empty `allowed_origins` allows any origin.
pub fn router(state: AppState, allowed_origins: &[String]) -> Router {
    let cors = if allowed_origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<HeaderValue> = allowed_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(Any)
            .allow_headers(Any)
    };

    Router::new()
        .route("/", get(handlers::handle_root))
        .route("/health", get(handlers::handle_health))
        .route("/chat", post(handlers::handle_chat))
        .route("/api/vertices/product", post(handlers::handle_add_product))
        .route("/api/vertices/recipe", post(handlers::handle_add_recipe))
        .route("/api/edges/usesProduct", post(handlers::handle_add_uses_product))
        .route("/api/vertices/:id/connected", get(handlers::handle_connected))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}

/// Serve until `shutdown` resolves.
pub async fn run<F>(config: &ServerConfig, state: AppState, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = router(state, &config.allowed_origins);
    let addr = format!("{}:{}", config.host, config.port);

    if !check_port_available(&config.host, config.port).await {
        return Err(RecipebotError::Config(format!(
            "Port {} is already in use. Stop the other process or set PORT to a different value.",
            config.port
        )));
    }

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| {
            RecipebotError::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to bind to {}: {}", addr, e),
            ))
        })?;

    log::info!("Server running on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| {
            RecipebotError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                format!("HTTP server error: {}", e),
            ))
        })?;

    Ok(())
}
