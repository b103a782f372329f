//! Demo settings, layered from an optional `hoard.*` file and `HOARD_*`
//! environment variables.

use config::{Config, ConfigError, Environment, File};
use hoard_cache::CacheSettings;
use serde::Deserialize;

/// Largest `size` whose region ids still fit in an `i32`.
const MAX_SIZE: i32 = 46_340;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DemoSettings {
    /// Owners created by the scenario; each gets as many regions.
    pub size: i32,
    pub maintenance_interval_secs: Option<u64>,
    pub initial_capacity: usize,
    pub record_metrics: bool,
}

impl Default for DemoSettings {
    fn default() -> Self {
        let cache = CacheSettings::default();
        Self {
            size: 5,
            maintenance_interval_secs: Some(1),
            initial_capacity: cache.initial_capacity,
            record_metrics: cache.record_metrics,
        }
    }
}

impl DemoSettings {
    /// Loads settings; later sources override earlier ones.
    pub fn load() -> Result<Self, ConfigError> {
        let settings: Self = Config::builder()
            .add_source(File::with_name("hoard").required(false))
            .add_source(Environment::with_prefix("HOARD").try_parsing(true))
            .build()?
            .try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Rejects sizes whose region ids (up to `size * (size + 1)`) overflow.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let largest_id = self
            .size
            .checked_add(1)
            .and_then(|next| next.checked_mul(self.size));
        match largest_id {
            Some(_) if self.size > 0 => Ok(()),
            _ => Err(ConfigError::Message(format!(
                "size must be between 1 and {}, got {}",
                MAX_SIZE, self.size
            ))),
        }
    }

    pub fn cache(&self) -> CacheSettings {
        CacheSettings {
            maintenance_interval_secs: self.maintenance_interval_secs,
            initial_capacity: self.initial_capacity,
            record_metrics: self.record_metrics,
        }
    }
}
