//! Service lifecycle shared by a service and its managers.

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

use hoard_core::{HoardError, Result};

/// State of a `CacheService`.
///
/// Transitions only move forward: `Created -> Running -> Stopped`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ServiceState {
    /// Built but not started; managers can be registered.
    Created = 0,
    /// Serving operations.
    Running = 1,
    /// Terminal; every managed structure has been released.
    Stopped = 2,
}

impl ServiceState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => Self::Created,
            1 => Self::Running,
            _ => Self::Stopped,
        }
    }

    /// Returns the lowercase state name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Running => "running",
            Self::Stopped => "stopped",
        }
    }
}

impl fmt::Display for ServiceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Atomic lifecycle flag checked by every manager operation.
#[derive(Debug)]
pub(crate) struct Lifecycle {
    state: AtomicU8,
}

impl Lifecycle {
    pub(crate) fn new() -> Self {
        Self {
            state: AtomicU8::new(ServiceState::Created as u8),
        }
    }

    pub(crate) fn state(&self) -> ServiceState {
        ServiceState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Moves `Created -> Running`.
    ///
    /// Returns `Ok(false)` if the service was already running.
    pub(crate) fn start(&self) -> Result<bool> {
        match self.state.compare_exchange(
            ServiceState::Created as u8,
            ServiceState::Running as u8,
            Ordering::AcqRel,
            Ordering::Acquire,
        ) {
            Ok(_) => Ok(true),
            Err(current) => match ServiceState::from_u8(current) {
                ServiceState::Stopped => Err(HoardError::ServiceStopped),
                _ => Ok(false),
            },
        }
    }

    /// Moves to `Stopped`; returns false if it already was.
    pub(crate) fn stop(&self) -> bool {
        let previous = self.state.swap(ServiceState::Stopped as u8, Ordering::AcqRel);
        ServiceState::from_u8(previous) != ServiceState::Stopped
    }

    pub(crate) fn ensure_running(&self) -> Result<()> {
        match self.state() {
            ServiceState::Running => Ok(()),
            ServiceState::Created => Err(HoardError::ServiceNotStarted),
            ServiceState::Stopped => Err(HoardError::ServiceStopped),
        }
    }
}
