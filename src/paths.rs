//! Application path management for portable and installed modes
//!
//! - **Dev mode** (debug builds): a `config.yaml` in the working directory
//!   keeps everything next to it.
//! - **Portable mode**: a `.portable` marker next to the executable keeps
//!   all data in the executable's directory.
//! - **Installed mode** (default): data lives in the platform data directory
//!   under `MIDI Page Turner`.

use anyhow::Context;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Application name used for directories in installed mode
const APP_NAME: &str = "MIDI Page Turner";

/// Application paths for config, settings and logs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppPaths {
    pub config: PathBuf,
    /// Directory holding the settings database
    pub state_dir: PathBuf,
    pub logs_dir: PathBuf,
    pub is_portable: bool,
}

impl AppPaths {
    /// Detect paths from the environment
    ///
    /// Runs before logging is initialised, so diagnostics go to stderr.
    pub fn detect() -> Self {
        let exe_dir = std::env::current_exe()
            .ok()
            .and_then(|p| p.parent().map(|p| p.to_path_buf()))
            .unwrap_or_else(|| PathBuf::from("."));

        #[cfg(debug_assertions)]
        {
            let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
            if cwd.join("config.yaml").exists() {
                eprintln!("[paths] Running in DEV mode (config.yaml found in {})", cwd.display());
                return Self::portable(&cwd);
            }
        }

        if exe_dir.join(".portable").exists() {
            #[cfg(debug_assertions)]
            eprintln!("[paths] Running in PORTABLE mode (.portable marker found)");
            return Self::portable(&exe_dir);
        }

        let data_dir = dirs::data_dir().unwrap_or_else(|| {
            eprintln!("[paths] WARNING: no platform data directory, falling back to exe dir");
            exe_dir.clone()
        });
        Self::installed(&data_dir)
    }

    /// Everything inside `dir`
    pub fn portable(dir: &Path) -> Self {
        Self {
            config: dir.join("config.yaml"),
            state_dir: dir.join(".state"),
            logs_dir: dir.join("logs"),
            is_portable: true,
        }
    }

    /// Everything inside an application folder of `data_dir`
    pub fn installed(data_dir: &Path) -> Self {
        let app_data = data_dir.join(APP_NAME);
        Self {
            config: app_data.join("config.yaml"),
            state_dir: app_data.join("state"),
            logs_dir: app_data.join("logs"),
            is_portable: false,
        }
    }

    /// Use a config file other than the detected one
    pub fn with_config(mut self, config: impl Into<PathBuf>) -> Self {
        self.config = config.into();
        self
    }

    /// Base directory, for display
    pub fn base_dir(&self) -> PathBuf {
        self.config
            .parent()
            .map(|p| p.to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."))
    }

    /// Create the state, logs and config directories
    pub fn ensure_directories(&self) -> anyhow::Result<()> {
        let config_dir = self.config.parent().filter(|p| !p.as_os_str().is_empty());

        for dir in [Some(self.state_dir.as_path()), Some(self.logs_dir.as_path()), config_dir]
            .into_iter()
            .flatten()
        {
            if !dir.exists() {
                debug!("Creating directory: {}", dir.display());
                std::fs::create_dir_all(dir)
                    .with_context(|| format!("Failed to create directory: {}", dir.display()))?;
            }
        }
        Ok(())
    }

    /// Settings database path (within state_dir)
    pub fn settings_db_path(&self) -> PathBuf {
        self.state_dir.join("settings.sled")
    }
}
