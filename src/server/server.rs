use crate::{
    config::ServerConfig,
    error::{LockerdError, Result, ServerError},
    events::EventBus,
    service::LockerService,
};
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

use super::handlers::{
    get_locker_handler, health_handler, list_lockers_handler, next_pending_handler,
    open_locker_handler, route_fallback_handler,
};

/// Shared state for the Axum server
#[derive(Clone)]
pub struct ServerState {
    pub(crate) service: Arc<LockerService>,
    pub(crate) event_bus: Arc<EventBus>,
}

/// HTTP server bridging web clients and the hardware poller to the locker
/// service.
pub struct HttpServer {
    pub(crate) config: ServerConfig,
    pub(crate) service: Arc<LockerService>,
    pub(crate) event_bus: Arc<EventBus>,
}

impl HttpServer {
    /// Create a new HTTP server
    pub fn new(
        config: ServerConfig,
        service: Arc<LockerService>,
        event_bus: Arc<EventBus>,
    ) -> Self {
        Self {
            config,
            service,
            event_bus,
        }
    }

    /// Build the router with all routes and middleware.
    ///
    /// Kept separate from `start` so tests can drive the router in-process
    /// without binding a socket.
    pub fn router(&self) -> Router {
        let state = ServerState {
            service: Arc::clone(&self.service),
            event_bus: Arc::clone(&self.event_bus),
        };

        // Unmatched methods on known paths report route-not-found, same as
        // unknown paths; CORS stays open to any origin for the dashboard.
        Router::new()
            .route(
                "/casiers",
                get(list_lockers_handler).fallback(route_fallback_handler),
            )
            .route(
                "/casier/:id",
                get(get_locker_handler).fallback(route_fallback_handler),
            )
            .route(
                "/casier/:id/ouvrir",
                post(open_locker_handler).fallback(route_fallback_handler),
            )
            .route(
                "/next-casier",
                get(next_pending_handler).fallback(route_fallback_handler),
            )
            .route(
                "/health",
                get(health_handler).fallback(route_fallback_handler),
            )
            .fallback(route_fallback_handler)
            .layer(CorsLayer::permissive())
            .layer(TraceLayer::new_for_http())
            .with_state(state)
    }

    /// Bind the listener and serve until shutdown is requested
    pub async fn start(&self) -> Result<()> {
        let app = self.router();
        let addr = format!("{}:{}", self.config.ip, self.config.port);

        info!("Starting locker API server on {}", addr);

        let listener =
            tokio::net::TcpListener::bind(&addr)
                .await
                .map_err(|e| ServerError::BindFailed {
                    address: addr.clone(),
                    source: e,
                })?;

        info!("Locker API listening on {}", addr);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| ServerError::StartupFailed {
                details: format!("Server error: {}", e),
            })?;

        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        return;
    }
    info!("Shutdown signal received, stopping server");
}

/// HTTP server builder for configuration
pub struct HttpServerBuilder {
    config: Option<ServerConfig>,
    service: Option<Arc<LockerService>>,
    event_bus: Option<Arc<EventBus>>,
}

impl HttpServerBuilder {
    /// Create a new HTTP server builder
    pub fn new() -> Self {
        Self {
            config: None,
            service: None,
            event_bus: None,
        }
    }

    /// Set the server configuration
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the locker service
    pub fn service(mut self, service: Arc<LockerService>) -> Self {
        self.service = Some(service);
        self
    }

    /// Set the event bus
    pub fn event_bus(mut self, event_bus: Arc<EventBus>) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    /// Build the HTTP server
    pub fn build(self) -> Result<HttpServer> {
        let config = self.config.ok_or_else(|| {
            LockerdError::Server(ServerError::StartupFailed {
                details: "Server configuration is required".to_string(),
            })
        })?;

        let service = self.service.ok_or_else(|| {
            LockerdError::Server(ServerError::StartupFailed {
                details: "Locker service is required".to_string(),
            })
        })?;

        let event_bus = self.event_bus.ok_or_else(|| {
            LockerdError::Server(ServerError::StartupFailed {
                details: "Event bus is required".to_string(),
            })
        })?;

        Ok(HttpServer::new(config, service, event_bus))
    }
}

impl Default for HttpServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
