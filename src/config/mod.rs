//! Configuration for the page turner
//!
//! Handles loading, validation and hot-reloading of the YAML configuration
//! file. Every section is optional; a missing file is created with defaults.

pub mod watcher;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::fs;

pub use watcher::ConfigWatcher;

use crate::engine::{KeyPreset, SlotId};
use crate::inject::InjectionBackend;
use crate::settings::DEFAULT_DEBOUNCE_MS;

/// Longest accepted persistence debounce window
const MAX_DEBOUNCE_MS: u64 = 10_000;

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    pub midi: MidiConfig,
    pub triggers: TriggerConfig,
    pub injection: InjectionConfig,
    pub persistence: PersistenceConfig,
}

/// MIDI input selection
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct MidiConfig {
    /// Case-insensitive substring of the port name; empty selects the first port
    pub input_port: String,
}

/// Key preset overrides applied on startup and on reload
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct TriggerConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary_keys: Option<KeyPreset>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secondary_keys: Option<KeyPreset>,
}

impl TriggerConfig {
    /// Configured presets, per slot
    pub fn presets(&self) -> impl Iterator<Item = (SlotId, KeyPreset)> {
        [
            (SlotId::Primary, self.primary_keys),
            (SlotId::Secondary, self.secondary_keys),
        ]
        .into_iter()
        .filter_map(|(slot, preset)| preset.map(|p| (slot, p)))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct InjectionConfig {
    pub backend: InjectionBackend,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct PersistenceConfig {
    /// Debounce window for binding writes (0 writes immediately)
    pub debounce_ms: u64,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            debounce_ms: DEFAULT_DEBOUNCE_MS,
        }
    }
}

impl AppConfig {
    /// Load configuration from file with validation
    pub async fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config file: {}", path))?;

        let config = Self::from_yaml(&contents)
            .with_context(|| format!("Invalid config file: {}", path))?;

        Ok(config)
    }

    /// Load `path`, writing a default config first when it does not exist
    pub async fn load_or_create(path: &str) -> Result<Self> {
        if !Path::new(path).exists() {
            let config = Self::default();
            config.save(path).await?;
            tracing::info!("Created default config: {}", path);
            return Ok(config);
        }
        Self::load(path).await
    }

    pub fn from_yaml(contents: &str) -> Result<Self> {
        // An empty file is a valid, all-default config
        let config: AppConfig = if contents.trim().is_empty() {
            Self::default()
        } else {
            serde_yaml::from_str(contents).context("Failed to parse YAML config")?
        };

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub async fn save(&self, path: &str) -> Result<()> {
        let yaml = serde_yaml::to_string(self).context("Failed to serialize config to YAML")?;

        if let Some(parent) = Path::new(path).parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create config directory: {}", parent.display()))?;
        }

        fs::write(path, yaml)
            .await
            .with_context(|| format!("Failed to write config file: {}", path))?;

        Ok(())
    }

    /// Validate configuration for correctness
    pub fn validate(&self) -> Result<()> {
        if self.midi.input_port.contains(['\n', '\r']) {
            anyhow::bail!("MIDI input_port must be a single line");
        }

        if self.persistence.debounce_ms > MAX_DEBOUNCE_MS {
            anyhow::bail!(
                "persistence.debounce_ms {} exceeds the maximum of {}ms",
                self.persistence.debounce_ms,
                MAX_DEBOUNCE_MS
            );
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_config() {
        let config = AppConfig::from_yaml(
            r#"
midi:
  input_port: "FS-1"
triggers:
  primary_keys: page
  secondary_keys: space
injection:
  backend: send_input
persistence:
  debounce_ms: 100
"#,
        )
        .unwrap();

        assert_eq!(config.midi.input_port, "FS-1");
        assert_eq!(config.injection.backend, InjectionBackend::SendInput);
        assert_eq!(config.persistence.debounce_ms, 100);
        assert_eq!(
            config.triggers.presets().collect::<Vec<_>>(),
            vec![(SlotId::Primary, KeyPreset::Page), (SlotId::Secondary, KeyPreset::Space)]
        );
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::from_yaml("midi:\n  input_port: pedal\n").unwrap();
        assert_eq!(config.injection.backend, InjectionBackend::Log);
        assert_eq!(config.persistence.debounce_ms, DEFAULT_DEBOUNCE_MS);
        assert_eq!(config.triggers.presets().count(), 0);

        assert_eq!(AppConfig::from_yaml("").unwrap(), AppConfig::default());
    }

    #[test]
    fn test_unknown_preset_rejected() {
        assert!(AppConfig::from_yaml("triggers:\n  primary_keys: escape\n").is_err());
    }

    #[test]
    fn test_validation() {
        let mut config = AppConfig::default();
        assert!(config.validate().is_ok());

        config.persistence.debounce_ms = MAX_DEBOUNCE_MS + 1;
        assert!(config.validate().is_err());

        config.persistence.debounce_ms = 0;
        config.midi.input_port = "a\nb".to_string();
        assert!(config.validate().is_err());
    }

    #[tokio::test]
    async fn test_load_or_create_writes_defaults() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("nested").join("config.yaml");
        let path = path.to_str().unwrap();

        let created = AppConfig::load_or_create(path).await.unwrap();
        assert_eq!(created, AppConfig::default());

        let loaded = AppConfig::load(path).await.unwrap();
        assert_eq!(loaded, created);
    }
}
