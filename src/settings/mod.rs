//! Settings persistence - trigger bindings across restarts
//!
//! Bindings are stored as a JSON [`BindingSnapshot`] behind the
//! [`SettingsStore`] trait. Unusable stored data never stops the
//! application: both slots are reset to unbound and the reset is written back.

mod persistence_actor;
mod snapshot;
mod store;

pub use persistence_actor::{PersistenceActor, PersistenceActorHandle, DEFAULT_DEBOUNCE_MS};
pub use snapshot::{BindingSnapshot, SlotSettings};
pub use store::{MemorySettingsStore, SledSettingsStore};

use thiserror::Error;
use tracing::{info, warn};

use crate::engine::{KeyPreset, SlotId, TriggerBinding};

/// Errors raised while reading or writing settings
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("settings database error: {0}")]
    Database(#[from] sled::Error),

    #[error("failed to serialize settings: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("malformed settings data: {0}")]
    Malformed(#[source] serde_json::Error),

    #[error("invalid settings: {0}")]
    Invalid(String),
}

/// Storage backend for binding snapshots
pub trait SettingsStore: Send + Sync {
    /// Persist a snapshot, replacing any previous one
    fn save(&self, snapshot: &BindingSnapshot) -> Result<(), SettingsError>;

    /// Read the stored snapshot, `Ok(None)` when nothing was ever saved
    fn load(&self) -> Result<Option<BindingSnapshot>, SettingsError>;
}

/// Bindings restored at startup
#[derive(Debug)]
pub struct RestoredBindings {
    pub bindings: [TriggerBinding; 2],
    /// Set when stored data was unusable and both slots were reset
    pub reset: Option<SettingsError>,
}

/// Default bindings: both slots unbound
pub fn unbound_bindings() -> [TriggerBinding; 2] {
    [
        TriggerBinding::unbound(SlotId::Primary, KeyPreset::default()),
        TriggerBinding::unbound(SlotId::Secondary, KeyPreset::default()),
    ]
}

/// Load bindings from `store`
///
/// Missing data yields unbound defaults. Unreadable or invalid data resets
/// both slots, overwrites the stored snapshot with the reset and reports the
/// cause in [`RestoredBindings::reset`].
pub fn restore_bindings(store: &dyn SettingsStore) -> RestoredBindings {
    let result = store
        .load()
        .and_then(|snapshot| snapshot.map(|s| s.to_bindings()).transpose());

    match result {
        Ok(Some(bindings)) => {
            info!(
                primary = bindings[0].display_label(),
                secondary = bindings[1].display_label(),
                "Restored trigger bindings"
            );
            RestoredBindings { bindings, reset: None }
        }
        Ok(None) => {
            info!("No saved trigger bindings, starting unbound");
            RestoredBindings {
                bindings: unbound_bindings(),
                reset: None,
            }
        }
        Err(e) => {
            warn!("Saved settings invalid, resetting: {}", e);
            let bindings = unbound_bindings();
            if let Err(save_err) = store.save(&BindingSnapshot::from_bindings(&bindings)) {
                warn!("Failed to write reset settings: {}", save_err);
            }
            RestoredBindings {
                bindings,
                reset: Some(e),
            }
        }
    }
}
