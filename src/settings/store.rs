//! Settings store backends

use parking_lot::Mutex;
use std::path::Path;
use tracing::{debug, info, trace};

use super::{BindingSnapshot, SettingsError, SettingsStore};

/// Key used to store the binding snapshot in sled
const SNAPSHOT_KEY: &[u8] = b"trigger_bindings";

/// Settings stored in an embedded sled database
#[derive(Clone)]
pub struct SledSettingsStore {
    db: sled::Db,
}

impl SledSettingsStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        let db = sled::open(path)?;
        info!("Opened settings database at: {}", path.display());
        Ok(Self { db })
    }
}

impl SettingsStore for SledSettingsStore {
    fn save(&self, snapshot: &BindingSnapshot) -> Result<(), SettingsError> {
        let json = serde_json::to_vec(snapshot).map_err(SettingsError::Serialize)?;
        self.db.insert(SNAPSHOT_KEY, json)?;
        self.db.flush()?;
        trace!("Binding snapshot written to sled");
        Ok(())
    }

    fn load(&self) -> Result<Option<BindingSnapshot>, SettingsError> {
        let Some(data) = self.db.get(SNAPSHOT_KEY)? else {
            debug!("No binding snapshot in database");
            return Ok(None);
        };

        let snapshot: BindingSnapshot =
            serde_json::from_slice(&data).map_err(SettingsError::Malformed)?;
        debug!(
            "Loaded binding snapshot (version: {}, timestamp: {})",
            snapshot.version, snapshot.timestamp
        );
        Ok(Some(snapshot))
    }
}

/// In-memory store, holding the serialized snapshot bytes
#[derive(Default)]
pub struct MemorySettingsStore {
    data: Mutex<Option<Vec<u8>>>,
}

impl MemorySettingsStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with raw bytes, which need not be valid JSON
    pub fn with_raw(data: Vec<u8>) -> Self {
        Self {
            data: Mutex::new(Some(data)),
        }
    }
}

impl SettingsStore for MemorySettingsStore {
    fn save(&self, snapshot: &BindingSnapshot) -> Result<(), SettingsError> {
        let json = serde_json::to_vec(snapshot).map_err(SettingsError::Serialize)?;
        *self.data.lock() = Some(json);
        Ok(())
    }

    fn load(&self) -> Result<Option<BindingSnapshot>, SettingsError> {
        self.data
            .lock()
            .as_deref()
            .map(|data| serde_json::from_slice(data).map_err(SettingsError::Malformed))
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{EventKind, KeyPreset, SlotId, TriggerBinding};
    use crate::settings::{restore_bindings, unbound_bindings};
    use tempfile::tempdir;

    fn sample() -> [TriggerBinding; 2] {
        [
            TriggerBinding::bound(SlotId::Primary, EventKind::NoteOnOff, 64, KeyPreset::Page),
            TriggerBinding::bound(SlotId::Secondary, EventKind::ControlChange, 64, KeyPreset::Page),
        ]
    }

    #[test]
    fn test_sled_empty_database() {
        let temp = tempdir().unwrap();
        let store = SledSettingsStore::open(temp.path().join("settings.sled")).unwrap();
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn test_sled_survives_reopen() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("settings.sled");

        {
            let store = SledSettingsStore::open(&path).unwrap();
            store.save(&BindingSnapshot::from_bindings(&sample())).unwrap();
        }

        let store = SledSettingsStore::open(&path).unwrap();
        let restored = restore_bindings(&store);
        assert!(restored.reset.is_none());
        assert_eq!(restored.bindings, sample());
    }

    #[test]
    fn test_sled_malformed_value() {
        let temp = tempdir().unwrap();
        let store = SledSettingsStore::open(temp.path().join("settings.sled")).unwrap();
        store.db.insert(SNAPSHOT_KEY, b"not json".to_vec()).unwrap();

        assert!(matches!(store.load(), Err(SettingsError::Malformed(_))));

        let restored = restore_bindings(&store);
        assert_eq!(restored.bindings, unbound_bindings());
        assert!(store.load().unwrap().is_some());
    }

    #[test]
    fn test_memory_store_last_write_wins() {
        let store = MemorySettingsStore::new();
        store.save(&BindingSnapshot::from_bindings(&unbound_bindings())).unwrap();
        store.save(&BindingSnapshot::from_bindings(&sample())).unwrap();
        assert_eq!(store.load().unwrap().unwrap().to_bindings().unwrap(), sample());
    }
}
