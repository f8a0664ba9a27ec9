//! Context state-synchronization engine.
//!
//! Keeps a dashboard-style control plane in sync with one remote cluster
//! endpoint at a time: probes the current context's health, checks which
//! resource kinds the credentials may watch, maintains live object caches for
//! the permitted ones and coalesces change notifications for observers.
//!
//! All transports are injected: [`HealthProbe`], [`AccessReviewer`],
//! [`WatchSource`] and the per-kind mutation operations in the
//! [`CapabilityTable`] are traits the embedding application implements.

mod capability;
mod config;
mod context;
mod engine;
mod errors;
mod health;
mod notify;
mod permission;
mod registry;
mod watch;

#[cfg(test)]
pub mod test_utils;

pub use capability::*;
pub use config::*;
pub use context::*;
pub use engine::*;
pub use errors::*;
pub use health::*;
pub use notify::*;
pub use permission::*;
pub use registry::*;
pub use watch::*;
