//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML) + CLI overrides
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ServerConfig (validated, immutable)
//!
//! Rule file (<root>/_redirections):
//!     loader.rs reads text → redirects::Engine::compile
//!
//! On rule file change:
//!     watcher.rs detects change
//!     → loader.rs recompiles the whole file
//!     → new Engine sent to the server
//!     → atomic swap of Arc<Engine>
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require full reload
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks
//! - A rule file that fails to compile on reload leaves the old rules live

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, load_rules, ConfigError, RulesError};
pub use schema::{ListenerConfig, ObservabilityConfig, ServerConfig, SiteConfig, TimeoutConfig};
pub use watcher::RulesWatcher;
