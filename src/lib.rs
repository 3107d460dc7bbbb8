//! Static site server with a declarative redirect rule engine.

pub mod config;
pub mod http;
pub mod observability;
pub mod redirects;

pub use config::schema::ServerConfig;
pub use http::HttpServer;
pub use redirects::{Engine, Redirect, RedirectStatus, Resolution};
