//! Background maintenance scheduler.

use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::time::interval;
use tracing::{debug, info, warn};

use super::MaintenanceState;
use crate::registry::Registry;

/// Handle for controlling a running maintenance loop.
///
/// Dropping the handle stops the loop.
#[derive(Debug)]
pub struct MaintenanceHandle {
    shutdown_tx: watch::Sender<bool>,
}

impl MaintenanceHandle {
    /// Signals the loop to stop.
    pub fn stop(&self) {
        let _ = self.shutdown_tx.send(true);
    }
}

impl Drop for MaintenanceHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Periodically verifies the indexes of every registered manager.
///
/// A pass never evicts; it reports counts, logs invariant violations and
/// refreshes the entry gauges.
pub(crate) struct MaintenanceScheduler {
    registry: Arc<Registry>,
    state: Arc<MaintenanceState>,
    interval: Duration,
}

impl MaintenanceScheduler {
    pub(crate) fn new(
        registry: Arc<Registry>,
        state: Arc<MaintenanceState>,
        interval: Duration,
    ) -> Self {
        Self {
            registry,
            state,
            interval,
        }
    }

    /// Spawns the loop on `runtime`.
    pub(crate) fn start(self, runtime: &Handle) -> MaintenanceHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = MaintenanceHandle { shutdown_tx };

        runtime.spawn(self.run(shutdown_rx));

        handle
    }

    async fn run(self, mut shutdown_rx: watch::Receiver<bool>) {
        let mut timer = interval(self.interval);

        info!("Starting cache maintenance with interval {:?}", self.interval);

        loop {
            tokio::select! {
                _ = timer.tick() => {
                    self.run_pass();
                }
                result = shutdown_rx.changed() => {
                    if result.is_err() || *shutdown_rx.borrow() {
                        info!("Cache maintenance shutting down");
                        break;
                    }
                }
            }
        }
    }

    /// Runs one pass and records it.
    pub(crate) fn run_pass(&self) {
        debug!(managers = self.registry.len(), "Starting maintenance pass");

        match self.registry.maintain_all() {
            Ok(reports) => {
                let violations: usize = reports.iter().map(|r| r.violations).sum();
                self.state.record_pass(violations);
                if violations > 0 {
                    warn!(violations, "Maintenance pass found index violations");
                }
            },
            Err(e) => {
                self.state.record_failure(e.to_string());
                warn!("Maintenance pass failed: {}", e);
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handle_stop() {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = MaintenanceHandle { shutdown_tx };

        assert!(!*shutdown_rx.borrow());
        handle.stop();
        assert!(*shutdown_rx.borrow());
    }

    #[test]
    fn test_pass_over_empty_registry() {
        let state = Arc::new(MaintenanceState::new());
        let scheduler = MaintenanceScheduler::new(
            Arc::new(Registry::new()),
            Arc::clone(&state),
            Duration::from_secs(1),
        );

        scheduler.run_pass();

        assert_eq!(state.runs(), 1);
        assert!(state.is_healthy());
    }

    #[tokio::test(start_paused = true)]
    async fn test_loop_runs_until_stopped() {
        let state = Arc::new(MaintenanceState::new());
        let handle = MaintenanceScheduler::new(
            Arc::new(Registry::new()),
            Arc::clone(&state),
            Duration::from_secs(10),
        )
        .start(&Handle::current());

        // First tick fires immediately, then every 10s.
        tokio::time::sleep(Duration::from_secs(25)).await;
        assert_eq!(state.runs(), 3);

        drop(handle);
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(state.runs(), 3);
    }
}
