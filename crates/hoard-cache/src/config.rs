//! Cache service settings.

use std::time::Duration;

use hoard_core::{HoardError, Result};
use serde::{Deserialize, Serialize};

/// Settings shared by every manager of a `CacheService`.
///
/// Deserializes from camelCase keys so it can be loaded straight out of a
/// configuration file:
///
/// ```toml
/// maintenanceIntervalSecs = 30
/// initialCapacity = 256
/// recordMetrics = true
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CacheSettings {
    /// Seconds between background maintenance passes; `None` disables them.
    pub maintenance_interval_secs: Option<u64>,
    /// Capacity reserved for each manager's primary map.
    pub initial_capacity: usize,
    /// Whether managers report to the global `metrics` recorder.
    pub record_metrics: bool,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            maintenance_interval_secs: None,
            initial_capacity: 64,
            record_metrics: true,
        }
    }
}

impl CacheSettings {
    /// Creates a new builder.
    pub fn builder() -> CacheSettingsBuilder {
        CacheSettingsBuilder::default()
    }

    /// Returns the maintenance interval, if maintenance is enabled.
    pub fn maintenance_interval(&self) -> Option<Duration> {
        self.maintenance_interval_secs.map(Duration::from_secs)
    }

    /// Returns the initial capacity of each primary map.
    pub fn initial_capacity(&self) -> usize {
        self.initial_capacity
    }

    /// Returns true if metrics are exported.
    pub fn record_metrics(&self) -> bool {
        self.record_metrics
    }

    /// Checks values that deserialization alone cannot reject.
    ///
    /// # Errors
    ///
    /// `HoardError::Configuration` for a zero maintenance interval.
    pub fn validate(&self) -> Result<()> {
        if self.maintenance_interval_secs == Some(0) {
            return Err(HoardError::configuration(
                "maintenanceIntervalSecs must be greater than zero",
            ));
        }
        Ok(())
    }
}

/// Builder for CacheSettings.
#[derive(Debug, Default)]
pub struct CacheSettingsBuilder {
    settings: CacheSettings,
}

impl CacheSettingsBuilder {
    /// Enables periodic maintenance.
    pub fn maintenance_interval(mut self, interval: Duration) -> Self {
        self.settings.maintenance_interval_secs = Some(interval.as_secs());
        self
    }

    /// Sets the initial capacity of each primary map.
    pub fn initial_capacity(mut self, capacity: usize) -> Self {
        self.settings.initial_capacity = capacity;
        self
    }

    /// Enables or disables metrics export.
    pub fn record_metrics(mut self, enabled: bool) -> Self {
        self.settings.record_metrics = enabled;
        self
    }

    /// Builds the settings.
    ///
    /// # Errors
    ///
    /// Returns an error if an interval below one second was given.
    pub fn build(self) -> Result<CacheSettings> {
        self.settings.validate()?;
        Ok(self.settings)
    }
}
