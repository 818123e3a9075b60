//! EngineActor - owns the [`TriggerEngine`] and applies commands in order
//!
//! Side effects leave the actor without blocking it: observations go to a
//! broadcast channel, binding changes to the persistence actor, and injection
//! plans to a blocking task.

use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error, info, trace};

use super::actor_handle::EngineActorHandle;
use super::classify::classify_raw;
use super::commands::{EngineCommand, EngineStatus, SlotStatus};
use super::keys::InjectionPlan;
use super::observation::Observation;
use super::trigger::TriggerEngine;
use crate::inject::KeyInjector;
use crate::midi::format_hex;
use crate::settings::{BindingSnapshot, PersistenceActorHandle};

/// Capacity of the observation broadcast channel
pub const OBSERVATION_CAPACITY: usize = 256;

pub struct EngineActor {
    engine: TriggerEngine,
    command_rx: mpsc::UnboundedReceiver<EngineCommand>,
    persistence: PersistenceActorHandle,
    injector: Arc<dyn KeyInjector>,
    observations: broadcast::Sender<Observation>,
    message_count: u64,
    fire_count: u64,
}

impl EngineActor {
    /// Spawn the actor on the current tokio runtime
    pub fn spawn(
        engine: TriggerEngine,
        persistence: PersistenceActorHandle,
        injector: Arc<dyn KeyInjector>,
        observations: broadcast::Sender<Observation>,
    ) -> EngineActorHandle {
        let (cmd_tx, command_rx) = mpsc::unbounded_channel();

        let actor = EngineActor {
            engine,
            command_rx,
            persistence,
            injector,
            observations: observations.clone(),
            message_count: 0,
            fire_count: 0,
        };

        tokio::spawn(actor.run());
        info!("EngineActor spawned");

        EngineActorHandle::new(cmd_tx, observations)
    }

    async fn run(mut self) {
        debug!("EngineActor run loop started");

        while let Some(cmd) = self.command_rx.recv().await {
            trace!(?cmd, "Processing command");

            match cmd {
                EngineCommand::Midi { data, at } => self.handle_midi(&data, at),
                EngineCommand::BeginLearn { slot } => {
                    let start = self.engine.begin_learn(slot);
                    self.publish(Observation::from_learn_start(start));
                    self.persist();
                }
                EngineCommand::CancelLearn => {
                    if let Some(slot) = self.engine.cancel_learn() {
                        self.publish(Observation::LearnCancelled { slot });
                        self.persist();
                    }
                }
                EngineCommand::SelectKeys { slot, preset } => {
                    if self.engine.select_keys(slot, preset) {
                        self.publish(Observation::KeysSelected { slot, preset });
                        self.persist();
                    }
                }
                EngineCommand::Status { response } => {
                    let _ = response.send(self.status(Instant::now()));
                }
                EngineCommand::Shutdown => {
                    info!("EngineActor received shutdown command");
                    break;
                }
            }
        }

        info!(
            messages = self.message_count,
            fires = self.fire_count,
            "EngineActor run loop terminated"
        );
    }

    fn handle_midi(&mut self, data: &[u8], at: Instant) {
        self.message_count += 1;

        let msg = match classify_raw(data) {
            Ok(msg) => msg,
            Err(e) => {
                debug!("Dropping MIDI input [{}]: {}", format_hex(data), e);
                return;
            }
        };

        let dispatch = self.engine.handle(msg, at);

        for observation in Observation::from_dispatch(&dispatch, self.engine.bindings()) {
            self.publish(observation);
        }
        if dispatch.bindings_changed() {
            self.persist();
        }
        if let Some(plan) = dispatch.plan() {
            self.fire_count += 1;
            self.inject(plan.clone());
        }
    }

    fn publish(&self, observation: Observation) {
        trace!(%observation, "Observation");
        // No subscribers is fine
        let _ = self.observations.send(observation);
    }

    fn persist(&self) {
        self.persistence
            .save(BindingSnapshot::from_bindings(self.engine.bindings()));
    }

    fn inject(&self, plan: InjectionPlan) {
        let injector = Arc::clone(&self.injector);
        tokio::task::spawn_blocking(move || {
            if let Err(e) = injector.inject(plan.events()) {
                error!("Key injection failed ({}): {}", injector.name(), e);
            }
        });
    }

    fn status(&self, now: Instant) -> EngineStatus {
        let bindings = self.engine.bindings();
        let since = now.saturating_duration_since(self.engine.last_actuation());
        EngineStatus {
            slots: [
                SlotStatus::from_binding(&bindings[0]),
                SlotStatus::from_binding(&bindings[1]),
            ],
            learning: self.engine.learning(),
            cooldown_remaining: self.engine.cooldown().saturating_sub(since),
            fire_count: self.fire_count,
        }
    }
}
