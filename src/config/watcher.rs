//! Configuration file watcher for hot reload

use anyhow::{Context, Result};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::Path;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use super::AppConfig;

/// Time to let editors finish writing before re-reading
const RELOAD_DEBOUNCE: Duration = Duration::from_millis(100);

/// Watches the config file and yields each successfully reloaded config
pub struct ConfigWatcher {
    _watcher: RecommendedWatcher,
    rx: mpsc::Receiver<AppConfig>,
}

impl ConfigWatcher {
    /// Load (or create) the config at `config_path` and start watching it
    pub async fn new(config_path: String) -> Result<(Self, AppConfig)> {
        let (tx, rx) = mpsc::channel(10);

        let initial_config = AppConfig::load_or_create(&config_path)
            .await
            .context("Failed to load initial config")?;

        let watched_path = config_path.clone();

        // notify callbacks run on their own thread, outside the runtime
        let runtime_handle = tokio::runtime::Handle::current();

        let mut watcher = notify::recommended_watcher(move |res: Result<Event, notify::Error>| {
            match res {
                Ok(event) if matches!(event.kind, EventKind::Modify(_)) => {
                    debug!("Config file modified: {:?}", event.paths);

                    let config_path = watched_path.clone();
                    let tx = tx.clone();

                    runtime_handle.spawn(async move {
                        tokio::time::sleep(RELOAD_DEBOUNCE).await;

                        match AppConfig::load(&config_path).await {
                            Ok(new_config) => {
                                info!("Configuration reloaded");
                                if let Err(e) = tx.send(new_config).await {
                                    error!("Failed to send config update: {}", e);
                                }
                            }
                            Err(e) => {
                                warn!("Failed to reload config (keeping old config): {:#}", e);
                            }
                        }
                    });
                }
                Ok(_) => {}
                Err(e) => error!("Watch error: {}", e),
            }
        })?;

        watcher
            .watch(Path::new(&config_path), RecursiveMode::NonRecursive)
            .with_context(|| format!("Failed to watch config file: {}", config_path))?;

        info!("Config file watcher started for: {}", config_path);

        Ok((Self { _watcher: watcher, rx }, initial_config))
    }

    /// Wait for the next config update, `None` once the watcher is closed
    pub async fn next_config(&mut self) -> Option<AppConfig> {
        self.rx.recv().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::KeyPreset;
    use std::fs;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_config_watcher_reload() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let config_path = temp_dir.path().join("config.yaml");

        fs::write(&config_path, "midi:\n  input_port: \"pedal\"\n")?;

        let (mut watcher, config) =
            ConfigWatcher::new(config_path.to_string_lossy().to_string()).await?;

        assert_eq!(config.midi.input_port, "pedal");
        assert_eq!(config.triggers.primary_keys, None);

        tokio::time::sleep(Duration::from_millis(100)).await;
        fs::write(
            &config_path,
            "midi:\n  input_port: \"pedal\"\ntriggers:\n  primary_keys: vertical\n",
        )?;

        let new_config = tokio::time::timeout(Duration::from_secs(2), watcher.next_config()).await?;

        if let Some(new_config) = new_config {
            assert_eq!(new_config.triggers.primary_keys, Some(KeyPreset::Vertical));
        }

        Ok(())
    }

    #[tokio::test]
    async fn test_missing_config_is_created() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let config_path = temp_dir.path().join("config.yaml");

        let (_watcher, config) =
            ConfigWatcher::new(config_path.to_string_lossy().to_string()).await?;

        assert_eq!(config, AppConfig::default());
        assert!(config_path.exists());
        Ok(())
    }
}
