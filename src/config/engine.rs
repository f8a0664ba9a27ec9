use serde::Deserialize;
use serde::Serialize;

use crate::EngineError;
use crate::Result;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct EngineConfig {
    /// Bounded capacity of the coordinator event channel
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,

    /// Capacity of the broadcast channel carrying public signals
    #[serde(default = "default_signal_channel_capacity")]
    pub signal_channel_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            event_channel_capacity: default_event_channel_capacity(),
            signal_channel_capacity: default_signal_channel_capacity(),
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<()> {
        if self.event_channel_capacity == 0 {
            return Err(EngineError::InvalidConfig("event_channel_capacity cannot be 0".into()).into());
        }
        if self.signal_channel_capacity == 0 {
            return Err(EngineError::InvalidConfig("signal_channel_capacity cannot be 0".into()).into());
        }
        Ok(())
    }
}

fn default_event_channel_capacity() -> usize {
    1024
}

fn default_signal_channel_capacity() -> usize {
    1024
}
