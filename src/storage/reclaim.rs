//! Background Reclamation Loop
//!
//! Lazy expiry alone never frees a key that is not read again. The reclaimer
//! is a Tokio task that calls [`ExpiringStore::sweep`] on a fixed interval so
//! expired keys disappear within one interval of their expiry.
//!
//! The store lock is only held for the sweep itself, never across the wait.
//!
//! The task is owned: [`Reclaimer`] keeps its `JoinHandle` and a shutdown
//! channel. Dropping the handle signals the loop to stop; [`Reclaimer::shutdown`]
//! also waits for it to finish.

use crate::storage::ExpiringStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Configuration for the reclamation loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReclaimConfig {
    /// Time between sweeps (default: 100ms)
    pub interval: Duration,
}

impl Default for ReclaimConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(100),
        }
    }
}

/// A handle to the running reclamation loop.
#[derive(Debug)]
pub struct Reclaimer {
    shutdown_tx: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
}

impl Reclaimer {
    /// Starts the reclamation loop as a background task.
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Example
    ///
    /// ```ignore
    /// use emberkv::storage::{ExpiringStore, ReclaimConfig, Reclaimer};
    /// use std::sync::Arc;
    ///
    /// let store = Arc::new(ExpiringStore::new());
    /// let reclaimer = Reclaimer::start(Arc::clone(&store), ReclaimConfig::default());
    ///
    /// // ... serve traffic ...
    ///
    /// reclaimer.shutdown().await;
    /// ```
    pub fn start(store: Arc<ExpiringStore>, config: ReclaimConfig) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        info!(
            interval_ms = config.interval.as_millis() as u64,
            "Reclamation loop started"
        );
        let task = tokio::spawn(reclaim_loop(store, config, shutdown_rx));

        Self {
            shutdown_tx,
            task: Some(task),
        }
    }

    /// Signals the loop to stop without waiting for it.
    pub fn stop(&self) {
        let _ = self.shutdown_tx.send(true);
    }

    /// Stops the loop and waits for the task to exit.
    pub async fn shutdown(mut self) {
        self.stop();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!(error = %e, "Reclamation task ended abnormally");
            }
        }
        info!("Reclamation loop stopped");
    }
}

impl Drop for Reclaimer {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn reclaim_loop(
    store: Arc<ExpiringStore>,
    config: ReclaimConfig,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(config.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            result = shutdown_rx.changed() => {
                if result.is_err() || *shutdown_rx.borrow() {
                    debug!("Reclamation loop received shutdown signal");
                    return;
                }
                continue;
            }
        }

        let expired = store.sweep();
        if expired > 0 {
            debug!(
                expired = expired,
                keys_remaining = store.len(),
                "Expired keys reclaimed"
            );
        }
    }
}
