//! Rule file watcher for hot reload.

use std::ffi::OsString;
use std::path::PathBuf;
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::config::loader::read_rules;
use crate::config::schema::SiteConfig;
use crate::redirects::Engine;

/// A watcher that recompiles the rule file whenever it changes.
///
/// The served directory is watched rather than the file itself, so the rule
/// file may be created or removed while the server runs.
pub struct RulesWatcher {
    dir: PathBuf,
    file_name: OsString,
    update_tx: mpsc::UnboundedSender<Engine>,
}

impl RulesWatcher {
    /// Create a new RulesWatcher.
    ///
    /// Returns the watcher and a receiver of freshly compiled engines.
    pub fn new(site: &SiteConfig) -> (Self, mpsc::UnboundedReceiver<Engine>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();

        (
            Self {
                dir: site.root.clone(),
                file_name: OsString::from(&site.redirections_file),
                update_tx,
            },
            update_rx,
        )
    }

    /// Start watching in a background thread. Dropping the returned watcher
    /// stops it.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let tx = self.update_tx;
        let file_name = self.file_name;
        let path = self.dir.join(&file_name);
        let event_path = path.clone();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    let touches_rules = event
                        .paths
                        .iter()
                        .any(|p| p.file_name() == Some(file_name.as_os_str()));
                    let relevant = event.kind.is_modify() || event.kind.is_create() || event.kind.is_remove();
                    if !touches_rules || !relevant {
                        return;
                    }

                    tracing::info!(path = ?event_path, "Redirections file change detected, reloading...");
                    match read_rules(&event_path) {
                        Ok(engine) => {
                            let _ = tx.send(engine);
                        }
                        Err(e) => {
                            tracing::error!("Failed to reload redirect rules: {}. Keeping current rules.", e);
                        }
                    }
                }
                Err(e) => tracing::error!("Watch error: {:?}", e),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&self.dir, RecursiveMode::NonRecursive)?;

        tracing::info!(path = ?path, "Redirections watcher started");
        Ok(watcher)
    }
}
