//! HTTP server assembly.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{middleware, routing::get, Router};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::config::TurnstileConfig;
use crate::error::Result;
use crate::ratelimit::Limiter;

use super::handlers::health;
use super::middleware::rate_limit;

/// State shared by the middleware and handlers.
///
/// The limiter is injected by the composition root so tests can substitute
/// their own instance or strategy.
pub struct AppState {
    pub limiter: Arc<dyn Limiter>,
    pub config: TurnstileConfig,
}

/// HTTP server hosting the guarded API.
pub struct HttpServer {
    /// Address to bind to
    addr: SocketAddr,
    /// Shared application state
    state: Arc<AppState>,
}

impl HttpServer {
    /// Create a new HTTP server.
    pub fn new(addr: SocketAddr, state: Arc<AppState>) -> Self {
        Self { addr, state }
    }

    /// Build the router. Every route sits behind the admission middleware.
    fn router(&self) -> Router {
        Router::new()
            .route("/v1/health", get(health))
            .layer(middleware::from_fn_with_state(
                self.state.clone(),
                rate_limit,
            ))
            .layer(TraceLayer::new_for_http())
    }

    /// Start the server.
    ///
    /// This method will block until the listener fails.
    pub async fn serve(self) -> Result<()> {
        let listener = TcpListener::bind(self.addr).await?;
        info!(addr = %self.addr, "Starting HTTP server");

        axum::serve(
            listener,
            self.router()
                .into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .map_err(|e| {
            error!(error = %e, "HTTP server failed");
            e.into()
        })
    }

    /// Start the server with graceful shutdown.
    ///
    /// The server will shut down when the provided signal resolves.
    pub async fn serve_with_shutdown<F>(self, signal: F) -> Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind(self.addr).await?;
        info!(addr = %self.addr, "Starting HTTP server with graceful shutdown");

        axum::serve(
            listener,
            self.router()
                .into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(signal)
        .await
        .map_err(|e| {
            error!(error = %e, "HTTP server failed");
            e.into()
        })
    }
}
