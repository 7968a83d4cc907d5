//! # HTTP Server
//!
//! Combines the resource routers into one axum application.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use super::config::HttpServerConfig;
use super::index_view_routes::index_view_routes;
use super::observability_routes::observability_routes;
use super::select_routes::select_routes;
use super::sequence_routes::sequence_routes;
use super::state::DatabaseState;
use super::table_routes::table_routes;
use super::transaction_routes::transaction_routes;
use crate::db::Database;

/// HTTP server over one database
pub struct HttpServer {
    config: HttpServerConfig,
    router: Router,
}

impl HttpServer {
    /// Create a server with default configuration
    pub fn new(db: Arc<dyn Database>) -> Self {
        Self::with_config(HttpServerConfig::default(), db)
    }

    /// Create a server with custom configuration
    pub fn with_config(config: HttpServerConfig, db: Arc<dyn Database>) -> Self {
        let state = Arc::new(DatabaseState::new(db));
        let router = Self::build_router(&config, state);
        Self { config, router }
    }

    /// Build the combined router with all endpoints
    pub fn build_router(config: &HttpServerConfig, state: Arc<DatabaseState>) -> Router {
        let cors = if config.cors_origins.is_empty() {
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
        } else {
            let origins: Vec<_> = config
                .cors_origins
                .iter()
                .filter_map(|s| match s.parse() {
                    Ok(origin) => Some(origin),
                    Err(_) => {
                        warn!(origin = %s, "ignoring invalid CORS origin");
                        None
                    }
                })
                .collect();

            CorsLayer::new()
                .allow_origin(AllowOrigin::list(origins))
                .allow_methods(Any)
                .allow_headers(Any)
        };

        Router::new()
            // Welcome message and health check at root level
            .merge(observability_routes(state.clone()))
            .nest("/table", table_routes(state.clone()))
            .nest("/select", select_routes(state.clone()))
            .nest("/indexview", index_view_routes(state.clone()))
            .nest("/sequences", sequence_routes(state.clone()))
            .nest("/transactions", transaction_routes(state))
            .layer(TraceLayer::new_for_http())
            .layer(cors)
    }

    /// Get the socket address
    pub fn socket_addr(&self) -> String {
        self.config.socket_addr()
    }

    /// Get the router (for testing)
    pub fn router(self) -> Router {
        self.router
    }

    /// Serve until Ctrl+C
    pub async fn start(self) -> io::Result<()> {
        let addr: SocketAddr = self
            .config
            .socket_addr()
            .parse()
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, format!("{e}")))?;

        let listener = TcpListener::bind(addr).await?;
        info!(%addr, "pgfacade listening");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        info!("pgfacade stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
