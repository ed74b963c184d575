//! Shutdown coordination.

use tokio::sync::broadcast;

/// Broadcasts a single shutdown notification to every subscribed task.
///
/// The HTTP server subscribes before it starts serving; tests and embedding
/// code call [`Shutdown::trigger`] instead of sending a signal.
#[derive(Debug, Clone)]
pub struct Shutdown {
    tx: broadcast::Sender<()>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    pub fn trigger(&self) {
        let delivered = self.tx.send(()).unwrap_or(0);
        tracing::debug!(subscribers = delivered, "Shutdown triggered");
    }

    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolves on trigger, or when every sender is gone.
pub async fn triggered(mut rx: broadcast::Receiver<()>) {
    // Lagged or closed both end the wait.
    let _ = rx.recv().await;
}
