//! EngineActorHandle - public API of the engine actor

use std::time::Instant;
use tokio::sync::{broadcast, mpsc, oneshot};

use super::commands::{EngineCommand, EngineStatus};
use super::keys::KeyPreset;
use super::observation::Observation;
use super::types::SlotId;

/// Cheap-to-clone handle to the [`EngineActor`](super::EngineActor)
///
/// All commands except [`status`](Self::status) are fire-and-forget; sends to
/// a stopped actor are ignored.
#[derive(Clone)]
pub struct EngineActorHandle {
    cmd_tx: mpsc::UnboundedSender<EngineCommand>,
    observations: broadcast::Sender<Observation>,
}

impl EngineActorHandle {
    pub fn new(
        cmd_tx: mpsc::UnboundedSender<EngineCommand>,
        observations: broadcast::Sender<Observation>,
    ) -> Self {
        Self { cmd_tx, observations }
    }

    /// Feed raw MIDI bytes received at `at`
    pub fn feed(&self, data: Vec<u8>, at: Instant) {
        let _ = self.cmd_tx.send(EngineCommand::Midi { data, at });
    }

    pub fn begin_learn(&self, slot: SlotId) {
        let _ = self.cmd_tx.send(EngineCommand::BeginLearn { slot });
    }

    pub fn cancel_learn(&self) {
        let _ = self.cmd_tx.send(EngineCommand::CancelLearn);
    }

    pub fn select_keys(&self, slot: SlotId, preset: KeyPreset) {
        let _ = self.cmd_tx.send(EngineCommand::SelectKeys { slot, preset });
    }

    /// Current engine status, `None` once the actor has stopped
    pub async fn status(&self) -> Option<EngineStatus> {
        let (response, rx) = oneshot::channel();
        self.cmd_tx.send(EngineCommand::Status { response }).ok()?;
        rx.await.ok()
    }

    /// Receive observations published after this call
    pub fn subscribe(&self) -> broadcast::Receiver<Observation> {
        self.observations.subscribe()
    }

    /// Publish an observation that did not come from the engine itself
    pub fn announce(&self, observation: Observation) {
        let _ = self.observations.send(observation);
    }

    pub fn shutdown(&self) {
        let _ = self.cmd_tx.send(EngineCommand::Shutdown);
    }
}
