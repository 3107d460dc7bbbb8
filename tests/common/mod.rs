//! Shared utilities for integration testing.

use std::path::Path;

use axum::{
    body::Body,
    http::{Request, Response},
    middleware, Router,
};
use tower::ServiceExt;

use redirect_server::config::ServerConfig;
use redirect_server::http::redirect_middleware;
use redirect_server::Engine;

/// Body returned when a request falls through the redirect middleware.
pub const NEXT_HANDLER_BODY: &str = "next handler";

/// The redirect middleware in front of a fixed handler.
#[allow(dead_code)]
pub fn app_with_rules(engine: Engine) -> Router {
    Router::new()
        .fallback(|| async { NEXT_HANDLER_BODY })
        .layer(middleware::from_fn_with_state(engine.into_shared(), redirect_middleware))
}

/// Send a GET through `app` without a network round trip.
pub async fn get(app: Router, uri: &str) -> Response<Body> {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    app.oneshot(request).await.unwrap()
}

/// Config serving `root` on an ephemeral local port.
#[allow(dead_code)]
pub fn local_config(root: &Path) -> ServerConfig {
    let mut config = ServerConfig::default();
    config.listener.bind_address = "127.0.0.1:0".into();
    config.site.root = root.to_path_buf();
    config
}
