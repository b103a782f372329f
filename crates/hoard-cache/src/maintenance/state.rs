//! Maintenance pass bookkeeping.

use std::time::{Duration, Instant};

use parking_lot::RwLock;

/// Tracks the outcome of maintenance passes.
#[derive(Debug)]
pub struct MaintenanceState {
    /// Completed passes.
    runs: RwLock<u64>,
    /// When the last pass completed.
    last_run: RwLock<Option<Instant>>,
    /// Violations found by the last pass.
    last_violations: RwLock<usize>,
    /// Error of the last failed pass, cleared by a successful one.
    last_error: RwLock<Option<String>>,
}

impl MaintenanceState {
    pub fn new() -> Self {
        Self {
            runs: RwLock::new(0),
            last_run: RwLock::new(None),
            last_violations: RwLock::new(0),
            last_error: RwLock::new(None),
        }
    }

    /// Returns the number of completed passes.
    pub fn runs(&self) -> u64 {
        *self.runs.read()
    }

    /// Returns when the last pass completed.
    pub fn last_run(&self) -> Option<Instant> {
        *self.last_run.read()
    }

    /// Returns the duration since the last pass.
    pub fn time_since_run(&self) -> Option<Duration> {
        self.last_run.read().map(|t| t.elapsed())
    }

    /// Returns the violations found by the last pass.
    pub fn last_violations(&self) -> usize {
        *self.last_violations.read()
    }

    /// Returns the error of the last failed pass.
    pub fn last_error(&self) -> Option<String> {
        self.last_error.read().clone()
    }

    /// Records a completed pass.
    pub fn record_pass(&self, violations: usize) {
        let mut runs = self.runs.write();
        let mut last_run = self.last_run.write();
        let mut last_violations = self.last_violations.write();
        let mut last_error = self.last_error.write();

        *runs += 1;
        *last_run = Some(Instant::now());
        *last_violations = violations;
        *last_error = None;
    }

    /// Records a pass that could not run.
    pub fn record_failure(&self, error: impl Into<String>) {
        *self.last_error.write() = Some(error.into());
    }

    /// True when the last pass completed and found no violations.
    pub fn is_healthy(&self) -> bool {
        self.last_error.read().is_none() && *self.last_violations.read() == 0
    }

    /// Resets all state.
    pub fn reset(&self) {
        let mut runs = self.runs.write();
        let mut last_run = self.last_run.write();
        let mut last_violations = self.last_violations.write();
        let mut last_error = self.last_error.write();

        *runs = 0;
        *last_run = None;
        *last_violations = 0;
        *last_error = None;
    }
}

impl Default for MaintenanceState {
    fn default() -> Self {
        Self::new()
    }
}
