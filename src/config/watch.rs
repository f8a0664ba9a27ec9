use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;

use crate::EngineError;
use crate::Result;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct WatchConfig {
    /// Upper bound for the initial bootstrap list of a watch cache
    #[serde(default = "default_bootstrap_timeout_in_ms")]
    pub bootstrap_timeout_in_ms: u64,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            bootstrap_timeout_in_ms: default_bootstrap_timeout_in_ms(),
        }
    }
}

impl WatchConfig {
    pub fn validate(&self) -> Result<()> {
        if self.bootstrap_timeout_in_ms == 0 {
            return Err(EngineError::InvalidConfig("bootstrap_timeout_in_ms cannot be 0".into()).into());
        }
        Ok(())
    }

    pub fn bootstrap_timeout(&self) -> Duration {
        Duration::from_millis(self.bootstrap_timeout_in_ms)
    }
}

fn default_bootstrap_timeout_in_ms() -> u64 {
    30_000
}
