//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the static file fallback
//! - Install the redirect middleware ahead of static files
//! - Wire up middleware (tracing, timeout, request ID)
//! - Publish reloaded rule sets
//! - Bind server to listener

use std::sync::Arc;
use std::time::Duration;

use axum::{middleware, Router};
use std::future::Future;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    services::ServeDir,
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::ServerConfig;
use crate::http::middleware::redirect_middleware;
use crate::redirects::{Engine, SharedEngine};

/// HTTP server serving a directory behind the redirect engine.
pub struct HttpServer {
    router: Router,
    config: ServerConfig,
    engine: Option<SharedEngine>,
}

impl HttpServer {
    /// Create a new HTTP server. With `engine` set to `None` no redirect
    /// middleware is installed.
    pub fn new(config: ServerConfig, engine: Option<Engine>) -> Self {
        let engine = engine.map(Engine::into_shared);
        let router = Self::build_router(&config, engine.clone());
        Self {
            router,
            config,
            engine,
        }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &ServerConfig, engine: Option<SharedEngine>) -> Router {
        let mut router = Router::new().fallback_service(ServeDir::new(&config.site.root));

        if let Some(engine) = engine {
            router = router.layer(middleware::from_fn_with_state(engine, redirect_middleware));
        }

        router
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    /// The assembled router, for serving or in-process testing.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Handle to the live rule set, if redirects are enabled.
    pub fn engine(&self) -> Option<SharedEngine> {
        self.engine.clone()
    }

    /// Run the server until `shutdown` resolves.
    ///
    /// Engines received on `engine_updates` replace the live rule set as a
    /// whole; requests already in flight finish on the rules they started with.
    pub async fn run(
        self,
        listener: TcpListener,
        mut engine_updates: mpsc::UnboundedReceiver<Engine>,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            root = ?self.config.site.root,
            redirects = self.engine.is_some(),
            "HTTP server starting"
        );

        if let Some(shared) = self.engine.clone() {
            tokio::spawn(async move {
                while let Some(engine) = engine_updates.recv().await {
                    tracing::info!(rules = engine.len(), "Publishing reloaded redirect rules");
                    shared.store(Arc::new(engine));
                }
            });
        }

        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(shutdown)
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }
}

/// Wait for shutdown signal (Ctrl+C).
pub async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
