//! Root synchronization engine.
//!
//! A single event-loop task owns all monitoring state; probers and watch
//! caches report into it over one bounded channel, and query surfaces read
//! lock-free mirrors the loop maintains.

mod coordinator;
#[allow(clippy::module_inception)]
mod engine;
mod event;


pub use engine::SyncEngine;
pub use event::EngineSignal;
pub use event::SignalKind;
pub(crate) use coordinator::Coordinator;
pub(crate) use event::EngineEvent;

#[cfg(test)]
use mockall::automock;

use async_trait::async_trait;
use serde::Deserialize;
use serde::Serialize;

/// Asked before any destructive mutation proceeds. Wire this to a UI
/// confirmation dialog; returning false aborts the deletion silently.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ConfirmDeletion: Send + Sync {
    async fn confirm<'a>(
        &self,
        kind: &str,
        name: &str,
        namespace: Option<&'a str>,
    ) -> bool;
}

/// Cached object count for one (context, kind) pair. `active` is populated
/// only for kinds registered with an activity predicate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceCount {
    pub context_name: String,
    pub kind: String,
    pub count: usize,
    pub active: Option<usize>,
}
