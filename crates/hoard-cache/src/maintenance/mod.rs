//! Periodic maintenance of registered managers.
//!
//! Maintenance runs on the Tokio runtime the service was started in. It
//! checks the index invariant of every manager and refreshes gauges; it
//! never removes cached instances.

mod scheduler;
mod state;

pub use scheduler::MaintenanceHandle;
pub(crate) use scheduler::MaintenanceScheduler;
pub use state::MaintenanceState;
