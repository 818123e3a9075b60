//! Persistence actor for debounced binding snapshots
//!
//! Binding changes arrive as whole [`BindingSnapshot`]s. The actor keeps only
//! the newest pending snapshot and writes it once the debounce window passes
//! without another change (last-write-wins). Write failures are logged and
//! never reach the engine.
//!
//! ```ignore
//! let store = Arc::new(SledSettingsStore::open(paths.settings_db())?);
//! let handle = PersistenceActor::spawn(store, 250);
//!
//! handle.save(snapshot);          // debounced, never blocks
//! handle.flush().await?;          // before shutdown
//! handle.shutdown();
//! ```

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, trace, warn};

use super::{BindingSnapshot, SettingsStore};

/// Default debounce window in milliseconds
pub const DEFAULT_DEBOUNCE_MS: u64 = 250;

/// Commands sent to the persistence actor
#[derive(Debug)]
pub enum PersistenceCommand {
    /// Save a binding snapshot (debounced)
    Save(BindingSnapshot),
    /// Force flush any pending snapshot
    Flush(oneshot::Sender<Result<()>>),
    Shutdown,
}

pub struct PersistenceActor {
    store: Arc<dyn SettingsStore>,
    command_rx: mpsc::Receiver<PersistenceCommand>,
    pending_snapshot: Option<BindingSnapshot>,
    /// Time of the last save request
    last_write_ts: Instant,
    /// 0 writes every save immediately
    debounce_ms: u64,
    write_count: u64,
}

/// Handle to the persistence actor, cheap to clone
#[derive(Clone)]
pub struct PersistenceActorHandle {
    cmd_tx: mpsc::Sender<PersistenceCommand>,
}

impl PersistenceActor {
    /// Spawn the actor on the current tokio runtime
    pub fn spawn(store: Arc<dyn SettingsStore>, debounce_ms: u64) -> PersistenceActorHandle {
        let (cmd_tx, command_rx) = mpsc::channel(100);

        let actor = PersistenceActor {
            store,
            command_rx,
            pending_snapshot: None,
            last_write_ts: Instant::now(),
            debounce_ms,
            write_count: 0,
        };

        tokio::spawn(actor.run());

        PersistenceActorHandle { cmd_tx }
    }

    async fn run(mut self) {
        info!("Persistence actor started (debounce: {}ms)", self.debounce_ms);

        let tick_interval = if self.debounce_ms > 0 { self.debounce_ms } else { 1000 };
        let mut ticker = tokio::time::interval(Duration::from_millis(tick_interval));

        loop {
            tokio::select! {
                cmd = self.command_rx.recv() => {
                    match cmd {
                        Some(PersistenceCommand::Save(snapshot)) => {
                            trace!("Queued binding snapshot");
                            self.pending_snapshot = Some(snapshot);
                            self.last_write_ts = Instant::now();

                            if self.debounce_ms == 0 {
                                self.flush_pending_snapshot().await;
                            }
                        }
                        Some(PersistenceCommand::Flush(response_tx)) => {
                            self.flush_pending_snapshot().await;
                            let _ = response_tx.send(Ok(()));
                        }
                        Some(PersistenceCommand::Shutdown) | None => {
                            info!("Persistence actor shutting down, flushing pending snapshot");
                            self.flush_pending_snapshot().await;
                            info!(
                                "Persistence actor shutdown complete (total writes: {})",
                                self.write_count
                            );
                            return;
                        }
                    }
                }
                _ = ticker.tick() => {
                    if self.pending_snapshot.is_some() && self.debounce_ms > 0 {
                        let elapsed = self.last_write_ts.elapsed();
                        if elapsed >= Duration::from_millis(self.debounce_ms) {
                            trace!("Debounce window expired ({:?}), flushing", elapsed);
                            self.flush_pending_snapshot().await;
                        }
                    }
                }
            }
        }
    }

    async fn flush_pending_snapshot(&mut self) {
        let Some(snapshot) = self.pending_snapshot.take() else {
            return;
        };

        let store = Arc::clone(&self.store);
        let write_result = tokio::task::spawn_blocking(move || store.save(&snapshot)).await;

        match write_result {
            Ok(Ok(())) => {
                self.write_count += 1;
                debug!("Bindings saved (write #{})", self.write_count);
            }
            // The next binding change provides a fresh snapshot
            Ok(Err(e)) => error!("Failed to save bindings: {}", e),
            Err(e) => error!("Settings write task panicked: {}", e),
        }
    }
}

impl PersistenceActorHandle {
    /// Queue a snapshot without waiting
    ///
    /// Used from the engine's hot path; a full queue drops the snapshot with a
    /// warning since a newer one follows with the next change.
    pub fn save(&self, snapshot: BindingSnapshot) {
        if let Err(e) = self.cmd_tx.try_send(PersistenceCommand::Save(snapshot)) {
            warn!("Dropped binding snapshot: {}", e);
        }
    }

    /// Write any pending snapshot now
    pub async fn flush(&self) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(PersistenceCommand::Flush(tx))
            .await
            .context("Failed to send flush command: actor shut down")?;

        rx.await.context("Failed to receive flush response")?
    }

    /// Ask the actor to flush and stop
    pub fn shutdown(&self) {
        let _ = self.cmd_tx.try_send(PersistenceCommand::Shutdown);
    }
}
