//! Configuration management for the synchronization engine.
//!
//! Provides hierarchical configuration loading with priority:
//! 1. Default values (hardcoded)
//! 2. Optional TOML config file
//! 3. Environment variables (highest priority)

mod engine;
mod health;
mod notify;
mod watch;
pub use engine::*;
pub use health::*;
pub use notify::*;
pub use watch::*;


//---
use std::env;

use config::Config;
use config::Environment;
use config::File;
use serde::Deserialize;

use crate::Result;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Settings {
    /// Health probing cadence and timeouts
    #[serde(default)]
    pub health: HealthConfig,
    /// Watch cache stream parameters
    #[serde(default)]
    pub watch: WatchConfig,
    /// Notification coalescing windows
    #[serde(default)]
    pub notify: NotifyConfig,
    /// Engine dispatch parameters
    #[serde(default)]
    pub engine: EngineConfig,
}

impl Settings {
    /// Load configuration with priority:
    /// 1. Defaults
    /// 2. Optional config file (explicit path or `CONFIG_PATH`)
    /// 3. `SYNC`-prefixed environment variables
    pub fn load(path: Option<&str>) -> Result<Self> {
        let mut config = Config::builder();

        // 1. Optional config file
        if let Some(path) = path {
            config = config.add_source(File::with_name(path).required(true));
        } else if let Ok(path) = env::var("CONFIG_PATH") {
            config = config.add_source(File::with_name(&path).required(false));
        }

        // 2. Environment variables (highest priority)
        config = config.add_source(
            Environment::with_prefix("SYNC")
                .separator("__")
                .ignore_empty(true)
                .try_parsing(true),
        );

        let settings: Settings = config.build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Validates every section.
    pub fn validate(&self) -> Result<()> {
        self.health.validate()?;
        self.watch.validate()?;
        self.notify.validate()?;
        self.engine.validate()?;
        Ok(())
    }
}
