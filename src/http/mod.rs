//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, tracing, timeout)
//!     → middleware.rs (redirect engine: Redirect → 301/302, NoMatch → next)
//!     → static file fallback (ServeDir over the site root)
//!     → Send to client
//! ```

pub mod middleware;
pub mod server;

pub use middleware::{redirect_middleware, redirect_response};
pub use server::{shutdown_signal, HttpServer};
