use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;

use crate::EngineError;
use crate::Result;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct HealthConfig {
    /// Minimum delay between two probes of the same context
    #[serde(default = "default_probe_interval_in_ms")]
    pub probe_interval_in_ms: u64,

    /// A probe not completing within this window counts as a failure
    #[serde(default = "default_probe_timeout_in_ms")]
    pub probe_timeout_in_ms: u64,

    /// Random jitter added to the re-probe delay to avoid probe alignment
    /// across contexts
    #[serde(default = "default_probe_jitter_in_ms")]
    pub probe_jitter_in_ms: u64,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            probe_interval_in_ms: default_probe_interval_in_ms(),
            probe_timeout_in_ms: default_probe_timeout_in_ms(),
            probe_jitter_in_ms: default_probe_jitter_in_ms(),
        }
    }
}

impl HealthConfig {
    /// Validates probing configuration
    /// # Errors
    /// Returns `EngineError::InvalidConfig` when:
    /// - probe interval or timeout is zero (would hot-loop)
    pub fn validate(&self) -> Result<()> {
        if self.probe_interval_in_ms == 0 {
            return Err(EngineError::InvalidConfig("probe_interval_in_ms cannot be 0".into()).into());
        }
        if self.probe_timeout_in_ms == 0 {
            return Err(EngineError::InvalidConfig("probe_timeout_in_ms cannot be 0".into()).into());
        }
        Ok(())
    }

    pub fn probe_interval(&self) -> Duration {
        Duration::from_millis(self.probe_interval_in_ms)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_in_ms)
    }
}

fn default_probe_interval_in_ms() -> u64 {
    5000
}

fn default_probe_timeout_in_ms() -> u64 {
    5000
}

fn default_probe_jitter_in_ms() -> u64 {
    500
}
