//! Dynamic config file watcher for hot reload.

use arc_swap::ArcSwap;
use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};

use crate::config::loader::load_dynamic_config;
use crate::config::schema::DynamicConfig;

/// Dynamic tunables shared with request handlers; swapped atomically on reload.
pub type SharedDynamicConfig = Arc<ArcSwap<DynamicConfig>>;

/// A watcher that monitors the dynamic configuration file for changes.
pub struct ConfigWatcher {
    path: PathBuf,
    update_tx: mpsc::UnboundedSender<DynamicConfig>,
}

impl ConfigWatcher {
    /// Create a new ConfigWatcher.
    ///
    /// Returns the watcher and a receiver for configuration updates.
    pub fn new(path: &Path) -> (Self, mpsc::UnboundedReceiver<DynamicConfig>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();

        (
            Self {
                path: path.to_path_buf(),
                update_tx,
            },
            update_rx,
        )
    }

    /// Start watching the file in a background thread.
    ///
    /// The parent directory is watched so that editors which replace the
    /// file (write + rename) are still picked up.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let tx = self.update_tx.clone();
        let path = self.path.clone();
        let file_name = self.path.file_name().map(|n| n.to_os_string());

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    let touches_file = event
                        .paths
                        .iter()
                        .any(|p| p.file_name().map(|n| n.to_os_string()) == file_name);
                    if touches_file && (event.kind.is_modify() || event.kind.is_create()) {
                        tracing::info!(path = ?path, "Dynamic config change detected, reloading");
                        match load_dynamic_config(&path) {
                            Ok(new_config) => {
                                let _ = tx.send(new_config);
                            }
                            Err(e) => {
                                tracing::error!(error = %e, "Failed to reload dynamic config. Keeping current values.");
                            }
                        }
                    }
                }
                Err(e) => tracing::error!("Watch error: {:?}", e),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        let dir = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."));
        watcher.watch(dir, RecursiveMode::NonRecursive)?;

        tracing::info!(path = ?self.path, "Dynamic config watcher started");
        Ok(watcher)
    }
}

/// Apply received updates to the shared config until shutdown or the
/// watcher goes away.
pub async fn apply_updates(
    shared: SharedDynamicConfig,
    mut updates: mpsc::UnboundedReceiver<DynamicConfig>,
    mut shutdown: broadcast::Receiver<()>,
) {
    loop {
        tokio::select! {
            update = updates.recv() => {
                let Some(new_config) = update else { break };
                if **shared.load() == new_config {
                    continue;
                }
                tracing::info!(
                    number_of_parallel_requests = new_config.number_of_parallel_requests,
                    number_of_steps = new_config.number_of_steps,
                    "Dynamic config updated"
                );
                shared.store(Arc::new(new_config));
            }
            _ = shutdown.recv() => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_apply_updates_swaps_config() {
        let shared: SharedDynamicConfig = Arc::new(ArcSwap::from_pointee(DynamicConfig::default()));
        let (tx, rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);

        let task = tokio::spawn(apply_updates(shared.clone(), rx, shutdown_rx));

        tx.send(DynamicConfig {
            number_of_parallel_requests: 3,
            number_of_steps: 7,
        })
        .unwrap();

        for _ in 0..50 {
            if shared.load().number_of_steps == 7 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(shared.load().number_of_parallel_requests, 3);
        assert_eq!(shared.load().number_of_steps, 7);

        shutdown_tx.send(()).unwrap();
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_apply_updates_stops_when_sender_dropped() {
        let shared: SharedDynamicConfig = Arc::new(ArcSwap::from_pointee(DynamicConfig::default()));
        let (tx, rx) = mpsc::unbounded_channel::<DynamicConfig>();
        let (_shutdown_tx, shutdown_rx) = broadcast::channel(1);

        drop(tx);
        apply_updates(shared.clone(), rx, shutdown_rx).await;
        assert_eq!(**shared.load(), DynamicConfig::default());
    }
}
