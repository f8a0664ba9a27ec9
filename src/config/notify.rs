use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;

use crate::EngineError;
use crate::Result;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct NotifyConfig {
    /// Quiet window after the last trigger before a publish fires
    #[serde(default = "default_debounce_in_ms")]
    pub debounce_in_ms: u64,

    /// Latency ceiling: at least one publish per window under continuous
    /// triggering
    #[serde(default = "default_throttle_in_ms")]
    pub throttle_in_ms: u64,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            debounce_in_ms: default_debounce_in_ms(),
            throttle_in_ms: default_throttle_in_ms(),
        }
    }
}

impl NotifyConfig {
    /// Validates coalescing windows
    /// # Errors
    /// Returns `EngineError::InvalidConfig` when the throttle ceiling is
    /// shorter than the debounce window (the ceiling would never apply).
    pub fn validate(&self) -> Result<()> {
        if self.throttle_in_ms < self.debounce_in_ms {
            return Err(EngineError::InvalidConfig(format!(
                "throttle_in_ms ({}) must be >= debounce_in_ms ({})",
                self.throttle_in_ms, self.debounce_in_ms
            ))
            .into());
        }
        Ok(())
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_in_ms)
    }

    pub fn throttle(&self) -> Duration {
        Duration::from_millis(self.throttle_in_ms)
    }
}

fn default_debounce_in_ms() -> u64 {
    100
}

fn default_throttle_in_ms() -> u64 {
    200
}
