use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use thiserror::Error;

use crate::temporal::{Duration, TimeUnit};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid value: {0}")]
    InvalidValue(String),
}

/// Tunables for the scheduling strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    /// Window after the desired date over which slot utilization is compared.
    pub utilization_horizon: Duration,
    /// How far past a blocking job's end a new job is pushed.
    pub collision_step: Duration,
    /// Spread the runs of parallelizable templates over several slots.
    pub split_parallel_runs: bool,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            utilization_horizon: Duration::seconds(TimeUnit::Month.seconds()),
            collision_step: Duration::seconds(1),
            split_parallel_runs: true,
        }
    }
}

impl PlannerConfig {
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let config: PlannerConfig = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let file = File::open(path)?;
        let config: PlannerConfig = serde_json::from_reader(BufReader::new(file))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("utilization_horizon", self.utilization_horizon),
            ("collision_step", self.collision_step),
        ] {
            if value.is_unknown() || value.is_zero() {
                return Err(ConfigError::InvalidValue(format!(
                    "{field} must be a known, non-zero duration (got {value})"
                )));
            }
        }
        Ok(())
    }
}
