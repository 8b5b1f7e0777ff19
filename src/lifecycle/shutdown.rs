//! Shutdown coordination.

use std::sync::Mutex;

use tokio::sync::watch;
use tracing::{info, trace};

/// Coordinator for graceful shutdown.
///
/// Long-running subsystems register themselves by name and receive a
/// listener that resolves once the signal fires. Registration is recorded
/// so the trigger log names exactly what is being asked to wind down;
/// in-flight handlers observe the signal at their next suspension point.
pub struct Shutdown {
    tx: watch::Sender<bool>,
    subsystems: Mutex<Vec<String>>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self {
            tx,
            subsystems: Mutex::new(Vec::new()),
        }
    }

    /// Register a named subsystem and hand it a listener for the signal.
    pub fn register(&self, subsystem: impl Into<String>) -> ShutdownListener {
        let subsystem = subsystem.into();
        self.subsystems
            .lock()
            .expect("shutdown registry mutex poisoned")
            .push(subsystem.clone());
        ShutdownListener {
            subsystem,
            rx: self.tx.subscribe(),
        }
    }

    /// Fire the signal. Every registered listener resolves.
    pub fn trigger(&self) {
        let subsystems = self
            .subsystems
            .lock()
            .expect("shutdown registry mutex poisoned")
            .clone();
        info!(subsystems = ?subsystems, "shutdown signal dispatched");
        let _ = self.tx.send(true);
    }

    /// Whether the signal has already fired.
    pub fn is_triggered(&self) -> bool {
        *self.tx.borrow()
    }

    /// Names of every subsystem that registered a listener.
    pub fn subsystems(&self) -> Vec<String> {
        self.subsystems
            .lock()
            .expect("shutdown registry mutex poisoned")
            .clone()
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

/// One subsystem's view of the shutdown signal.
pub struct ShutdownListener {
    subsystem: String,
    rx: watch::Receiver<bool>,
}

impl ShutdownListener {
    /// Resolve once the signal fires. A dropped coordinator counts as a
    /// shutdown, so orphaned subsystems still wind down.
    pub async fn triggered(mut self) {
        while !*self.rx.borrow_and_update() {
            if self.rx.changed().await.is_err() {
                break;
            }
        }
        trace!(subsystem = %self.subsystem, "shutdown observed");
    }

    pub fn subsystem(&self) -> &str {
        &self.subsystem
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_trigger_resolves_registered_listeners() {
        let shutdown = Shutdown::new();
        let first = shutdown.register("http-server");
        let second = shutdown.register("status-feed");
        assert_eq!(shutdown.subsystems(), vec!["http-server", "status-feed"]);
        assert!(!shutdown.is_triggered());

        shutdown.trigger();
        assert!(shutdown.is_triggered());
        first.triggered().await;
        second.triggered().await;
    }

    #[tokio::test]
    async fn test_listener_registered_after_trigger_resolves_immediately() {
        let shutdown = Shutdown::new();
        shutdown.trigger();
        shutdown.register("late").triggered().await;
    }

    #[tokio::test]
    async fn test_dropped_coordinator_counts_as_shutdown() {
        let shutdown = Shutdown::new();
        let listener = shutdown.register("orphan");
        drop(shutdown);
        listener.triggered().await;
    }
}
