use tokio::sync::oneshot;

use crate::ConfigSnapshot;
use crate::Context;
use crate::HealthState;
use crate::PermissionResult;
use crate::Result;

/// Everything that can happen to the coordinator loop: configuration pushes
/// from the caller plus reports from probers and watch caches. All monitor
/// mutation is serialized through this one channel.
#[derive(Debug)]
pub(crate) enum EngineEvent {
    /// Caller replaced the configuration; acked once the outgoing context is
    /// fully stopped and the incoming one started.
    ConfigUpdated(ConfigSnapshot, oneshot::Sender<Result<()>>),

    /// Every health probe result
    HealthChanged(HealthState),

    /// Edge-triggered: fired only on the false→true reachability transition
    ContextReachable(Context),

    /// One permitted/denied group from a permission-probe round
    PermissionResult {
        round: u64,
        result: PermissionResult,
    },

    /// A watch cache changed; `count_changed` is true only for membership
    /// changes (add/delete), not in-place updates
    CacheUpdated {
        context_name: String,
        kind: String,
        count_changed: bool,
    },

    /// Fired in addition to `CacheUpdated` for deletions, so observers
    /// tracking a single object by identity can react
    ObjectDeleted {
        context_name: String,
        kind: String,
        name: String,
        namespace: Option<String>,
    },

    /// A watch stream errored (offline=true) or was reconnected
    WatchOffline {
        context_name: String,
        kind: String,
        offline: bool,
        reason: Option<String>,
    },
}

/// Signals republished to observers through the notification hub and the
/// broadcast channel. An external publication layer forwards these to UI
/// subscribers.
#[derive(Debug, Clone)]
pub enum EngineSignal {
    HealthChanged(HealthState),
    PermissionResult(PermissionResult),
    ResourceUpdated {
        context_name: String,
        kind: String,
    },
    ResourceCountUpdated {
        context_name: String,
        kind: String,
    },
    ObjectDeleted {
        context_name: String,
        kind: String,
        name: String,
        namespace: Option<String>,
    },
    ContextAdded(String),
    ContextDeleted(String),
    CurrentContextChanged {
        previous: Option<String>,
        current: Option<String>,
    },
    OfflineChanged {
        context_name: String,
        offline: bool,
    },
}

/// Discriminant used to key hub subscriptions per signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignalKind {
    HealthChanged,
    PermissionResult,
    ResourceUpdated,
    ResourceCountUpdated,
    ObjectDeleted,
    ContextAdded,
    ContextDeleted,
    CurrentContextChanged,
    OfflineChanged,
}

impl EngineSignal {
    pub fn kind(&self) -> SignalKind {
        match self {
            EngineSignal::HealthChanged(_) => SignalKind::HealthChanged,
            EngineSignal::PermissionResult(_) => SignalKind::PermissionResult,
            EngineSignal::ResourceUpdated { .. } => SignalKind::ResourceUpdated,
            EngineSignal::ResourceCountUpdated { .. } => SignalKind::ResourceCountUpdated,
            EngineSignal::ObjectDeleted { .. } => SignalKind::ObjectDeleted,
            EngineSignal::ContextAdded(_) => SignalKind::ContextAdded,
            EngineSignal::ContextDeleted(_) => SignalKind::ContextDeleted,
            EngineSignal::CurrentContextChanged { .. } => SignalKind::CurrentContextChanged,
            EngineSignal::OfflineChanged { .. } => SignalKind::OfflineChanged,
        }
    }
}
