//! Background task applying credential-store signals to a gate.
//!
//! Pattern mirrors the other background services: spawn task → return a
//! handle holding the shutdown channel. Dropping the handle stops the task.

use std::sync::Arc;

use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, oneshot};
use tokio::task::JoinHandle;

use super::gate::SessionGate;
use super::AuthSignal;

/// Handle to a running signal subscription.
pub struct SignalListener {
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl SignalListener {
    /// Must be called from within a tokio runtime.
    pub(crate) fn spawn(gate: Arc<SessionGate>, mut events: broadcast::Receiver<AuthSignal>) -> Self {
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();

        let task = tokio::spawn(async move {
            tracing::debug!("Auth signal listener started");
            loop {
                tokio::select! {
                    biased;
                    _ = &mut shutdown_rx => break,
                    event = events.recv() => match event {
                        Ok(signal) => gate.apply_signal(signal).await,
                        Err(RecvError::Lagged(skipped)) => {
                            // Signals were lost; resync against the store.
                            tracing::warn!(skipped, "Auth signal listener lagged; revalidating session");
                            if let Err(e) = gate.revalidate().await {
                                tracing::warn!(error = %e, "Revalidation after lag failed");
                            }
                        }
                        Err(RecvError::Closed) => {
                            tracing::info!("Credential store closed its signal stream");
                            break;
                        }
                    },
                }
            }
            tracing::debug!("Auth signal listener stopped");
        });

        Self {
            shutdown_tx: Some(shutdown_tx),
            task: Some(task),
        }
    }

    /// Ask the task to stop. Idempotent.
    pub fn shutdown(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }

    /// Stop the task and wait until it has exited.
    pub async fn shutdown_and_wait(mut self) {
        self.shutdown();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::warn!(error = %e, "Auth signal listener ended abnormally");
            }
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.as_ref().map_or(true, JoinHandle::is_finished)
    }
}

impl Drop for SignalListener {
    fn drop(&mut self) {
        self.shutdown();
    }
}

// ═══════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════
