//! Shutdown coordination for background loops.

use tokio::sync::watch;

/// Coordinator for stopping long-running loops.
///
/// Built on a watch channel, so a loop that subscribes after the trigger
/// still observes it. [`Shutdown::reset`] re-arms it for a restart.
#[derive(Debug)]
pub struct Shutdown {
    tx: watch::Sender<bool>,
}

impl Shutdown {
    /// Create a new, untriggered coordinator.
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx }
    }

    /// Subscribe to the shutdown signal.
    pub fn subscribe(&self) -> ShutdownSignal {
        ShutdownSignal {
            rx: self.tx.subscribe(),
        }
    }

    /// Trigger the shutdown signal.
    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }

    /// Re-arm after a completed shutdown.
    pub fn reset(&self) {
        self.tx.send_replace(false);
    }

    pub fn is_triggered(&self) -> bool {
        *self.tx.borrow()
    }

    /// Number of live subscribers (loops still running).
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

/// Receiving half handed to a loop.
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    rx: watch::Receiver<bool>,
}

impl ShutdownSignal {
    /// Resolve once shutdown is triggered (or the coordinator is gone).
    pub async fn recv(&mut self) {
        // Err means the sender was dropped, which also ends the loop.
        let _ = self.rx.wait_for(|triggered| *triggered).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn late_subscriber_sees_trigger() {
        let shutdown = Shutdown::new();
        shutdown.trigger();
        let mut signal = shutdown.subscribe();
        tokio::time::timeout(Duration::from_secs(1), signal.recv())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn reset_rearms() {
        let shutdown = Shutdown::new();
        shutdown.trigger();
        shutdown.reset();
        assert!(!shutdown.is_triggered());

        let mut signal = shutdown.subscribe();
        assert!(tokio::time::timeout(Duration::from_millis(20), signal.recv())
            .await
            .is_err());
    }
}
