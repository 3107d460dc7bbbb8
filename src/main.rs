//! Redirect server.
//!
//! Serves a directory over HTTP with a redirect rule engine in front of the
//! static file handler.
//!
//! # Architecture Overview
//!
//! ```text
//!                     ┌──────────────────────────────────────────────────┐
//!   Client Request    │  ┌─────────┐    ┌────────────┐    ┌───────────┐  │
//!   ──────────────────┼─▶│  http   │───▶│  redirect  │───▶│  static   │  │
//!                     │  │ server  │    │ middleware │    │  files    │  │
//!                     │  └─────────┘    └─────┬──────┘    └───────────┘  │
//!   301/302 Location  │                       │                          │
//!   ◀─────────────────┼───────────────────────┘                          │
//!                     │                                                  │
//!                     │  ┌────────────┐   ┌──────────┐   ┌───────────┐   │
//!                     │  │   config   │   │ watcher  │──▶│ ArcSwap   │   │
//!                     │  │ + rules    │   │ (reload) │   │ <Engine>  │   │
//!                     │  └────────────┘   └──────────┘   └───────────┘   │
//!                     └──────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use redirect_server::config::{self, ConfigError, RulesWatcher, ServerConfig};
use redirect_server::http::{shutdown_signal, HttpServer};
use redirect_server::observability::logging;

#[derive(Parser)]
#[command(name = "redirect-server")]
#[command(about = "Serve a directory with declarative redirect rules", long_about = None)]
struct Cli {
    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory to serve (overrides `site.root`).
    #[arg(short, long)]
    root: Option<PathBuf>,

    /// Bind address (overrides `listener.bind_address`).
    #[arg(short, long)]
    bind: Option<String>,

    /// Do not load or apply redirect rules.
    #[arg(long)]
    disable_redirects: bool,

    /// Reload redirect rules when the rule file changes.
    #[arg(long)]
    watch: bool,
}

impl Cli {
    fn apply(self, config: &mut ServerConfig) {
        if let Some(root) = self.root {
            config.site.root = root;
        }
        if let Some(bind) = self.bind {
            config.listener.bind_address = bind;
        }
        config.site.disable_redirects |= self.disable_redirects;
        config.site.watch_redirections |= self.watch;
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => config::load_config(path)?,
        None => ServerConfig::default(),
    };
    cli.apply(&mut config);
    config::validation::validate_config(&config).map_err(ConfigError::Validation)?;

    logging::init(&config.observability.log_filter, std::io::stderr)?;

    tracing::info!("redirect-server v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        root = ?config.site.root,
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    // Rule errors are fatal at startup.
    let engine = config::load_rules(&config.site)?;

    // Keep the watcher alive for the lifetime of the server.
    let (_watcher, engine_updates) = if engine.is_some() && config.site.watch_redirections {
        let (watcher, updates) = RulesWatcher::new(&config.site);
        (Some(watcher.run()?), updates)
    } else {
        let (_, updates) = mpsc::unbounded_channel();
        (None, updates)
    };

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let server = HttpServer::new(config, engine);
    server.run(listener, engine_updates, shutdown_signal()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
