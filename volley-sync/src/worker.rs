//! Background worker that drives drains without caller involvement.
//!
//! Mirrors the handle/engine split used across the codebase: the cheap
//! clonable [`SyncHandle`] sends commands over a channel, while the
//! [`SyncWorker`] owns the run loop and reacts to connectivity changes,
//! a periodic fallback timer, and explicit commands.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::engine::SyncService;
use crate::error::{SyncError, SyncResult};

enum SyncCommand {
    Drain,
    Stop,
}

/// Control handle for a running [`SyncWorker`].
#[derive(Clone)]
pub struct SyncHandle {
    command_tx: mpsc::Sender<SyncCommand>,
}

impl SyncHandle {
    /// Request an immediate drain pass.
    pub async fn force_drain(&self) -> SyncResult<()> {
        self.command_tx
            .send(SyncCommand::Drain)
            .await
            .map_err(|_| SyncError::WorkerNotRunning)
    }

    /// Ask the worker to shut down after its current pass.
    pub async fn stop(&self) -> SyncResult<()> {
        self.command_tx
            .send(SyncCommand::Stop)
            .await
            .map_err(|_| SyncError::WorkerNotRunning)
    }
}

/// Owns the drain loop. Call [`SyncWorker::run`] on a spawned task.
pub struct SyncWorker {
    service: Arc<SyncService>,
    command_rx: mpsc::Receiver<SyncCommand>,
}

/// Build a worker and its handle around a shared engine.
pub fn create_sync_worker(service: Arc<SyncService>) -> (SyncHandle, SyncWorker) {
    let (command_tx, command_rx) = mpsc::channel(16);
    (
        SyncHandle { command_tx },
        SyncWorker {
            service,
            command_rx,
        },
    )
}

impl SyncWorker {
    pub async fn run(mut self) {
        info!("sync worker started");

        // Startup drain covers anything left over from the previous
        // process lifetime.
        if let Err(e) = self.service.drain().await {
            warn!(error = %e, "startup drain failed");
        }

        let mut connectivity = self.service.subscribe_connectivity();
        let fallback = Duration::from_secs(self.service.config().fallback_drain_interval_secs);
        let mut ticker = tokio::time::interval(fallback);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // First tick fires immediately; the startup drain already ran
        ticker.tick().await;

        let mut watch_alive = true;
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    debug!("periodic fallback drain");
                    if let Err(e) = self.service.drain().await {
                        warn!(error = %e, "periodic drain failed");
                    }
                }
                changed = connectivity.changed(), if watch_alive => {
                    match changed {
                        Ok(()) => {
                            let online = *connectivity.borrow_and_update();
                            debug!(online, "connectivity changed");
                            if online {
                                if let Err(e) = self.service.drain().await {
                                    warn!(error = %e, "connectivity drain failed");
                                }
                            }
                        }
                        Err(_) => {
                            // Monitor dropped; fall back to the timer alone
                            warn!("connectivity monitor gone, relying on periodic drain");
                            watch_alive = false;
                        }
                    }
                }
                command = self.command_rx.recv() => {
                    match command {
                        Some(SyncCommand::Drain) => {
                            debug!("explicit drain requested");
                            if let Err(e) = self.service.drain().await {
                                warn!(error = %e, "requested drain failed");
                            }
                        }
                        Some(SyncCommand::Stop) | None => {
                            info!("sync worker stopping");
                            break;
                        }
                    }
                }
            }
        }
    }
}
