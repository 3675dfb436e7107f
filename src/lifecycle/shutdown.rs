//! Shutdown coordination for the router service.

use tokio::sync::broadcast;

/// Coordinator for graceful shutdown.
///
/// Provides a broadcast channel that the servers and the reload scheduler
/// subscribe to.
pub struct Shutdown {
    tx: broadcast::Sender<()>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self { tx }
    }

    /// Subscribe to the shutdown signal.
    ///
    /// Subscribe before spawning the task that listens, or an early trigger
    /// is missed.
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    pub fn trigger(&self) {
        let _ = self.tx.send(());
    }

    /// Number of tasks still listening.
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

/// Resolve once the coordinator fires or is dropped.
///
/// A dropped coordinator counts as a shutdown, so a task never outlives the
/// service that spawned it.
pub async fn triggered(rx: &mut broadcast::Receiver<()>) {
    match rx.recv().await {
        Ok(()) => {}
        Err(broadcast::error::RecvError::Lagged(_)) => {}
        Err(broadcast::error::RecvError::Closed) => {
            tracing::debug!("Shutdown coordinator dropped, stopping task");
        }
    }
}

/// Owned graceful-shutdown future for `axum::serve`.
pub async fn graceful(mut rx: broadcast::Receiver<()>) {
    triggered(&mut rx).await
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}
