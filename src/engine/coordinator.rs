use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::mpsc;
use tracing::debug;
use tracing::info;
use tracing::warn;

use super::EngineEvent;
use super::EngineSignal;
use crate::AccessReviewer;
use crate::CapabilityTable;
use crate::ConfigSnapshot;
use crate::Context;
use crate::HealthProbe;
use crate::HealthProber;
use crate::HealthState;
use crate::KeyedRegistry;
use crate::ObjectStore;
use crate::PermissionProber;
use crate::PermissionResult;
use crate::PermissionVerdict;
use crate::Settings;
use crate::SnapshotDiff;
use crate::WatchCache;

/// Per-context monitoring phase. Absence from the monitor map is the
/// Unmonitored state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MonitorPhase {
    HealthPending,
    PermissionPending,
    Active,
}

/// One monitoring session: the probers and phase of a single context.
/// At most one session exists per context name at any time.
pub(crate) struct ContextMonitor {
    context: Context,
    phase: MonitorPhase,
    health: Arc<HealthProber>,
    probers: Vec<Arc<PermissionProber>>,
    /// Permission round whose verdicts are currently being consumed;
    /// 0 means no round started yet
    round: u64,
}

/// Drives the Unmonitored → HealthPending → PermissionPending → Active state
/// machine for the currently-selected context, and tears sessions down on
/// configuration changes. Mutated only from the engine's event-loop task;
/// the registries and mirrors it writes are read lock-free elsewhere.
pub(crate) struct Coordinator {
    capabilities: Arc<CapabilityTable>,
    probe: Arc<dyn HealthProbe>,
    reviewer: Arc<dyn AccessReviewer>,
    settings: Arc<Settings>,
    event_tx: mpsc::Sender<EngineEvent>,

    informers: Arc<KeyedRegistry<Arc<WatchCache>>>,
    snapshots: Arc<KeyedRegistry<Arc<ObjectStore>>>,
    health_states: Arc<DashMap<String, HealthState>>,
    permissions: Arc<DashMap<String, Vec<PermissionVerdict>>>,

    monitors: HashMap<String, ContextMonitor>,
    config: ConfigSnapshot,
    next_round: u64,
}

impl Coordinator {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        capabilities: Arc<CapabilityTable>,
        probe: Arc<dyn HealthProbe>,
        reviewer: Arc<dyn AccessReviewer>,
        settings: Arc<Settings>,
        event_tx: mpsc::Sender<EngineEvent>,
        informers: Arc<KeyedRegistry<Arc<WatchCache>>>,
        snapshots: Arc<KeyedRegistry<Arc<ObjectStore>>>,
        health_states: Arc<DashMap<String, HealthState>>,
        permissions: Arc<DashMap<String, Vec<PermissionVerdict>>>,
    ) -> Self {
        Self {
            capabilities,
            probe,
            reviewer,
            settings,
            event_tx,
            informers,
            snapshots,
            health_states,
            permissions,
            monitors: HashMap::new(),
            config: ConfigSnapshot::default(),
            next_round: 0,
        }
    }

    /// Applies a replacement configuration snapshot. Stops every invalidated
    /// or no-longer-current session before any new monitoring starts.
    /// An unchanged snapshot is a complete no-op.
    pub(crate) fn apply_config(
        &mut self,
        new: ConfigSnapshot,
    ) -> Vec<EngineSignal> {
        let diff = SnapshotDiff::between(&self.config, &new);
        if diff.is_empty() {
            debug!("configuration unchanged, nothing to do");
            return Vec::new();
        }

        let mut signals = Vec::new();
        for name in &diff.added {
            signals.push(EngineSignal::ContextAdded(name.clone()));
        }
        for name in &diff.removed {
            signals.push(EngineSignal::ContextDeleted(name.clone()));
        }

        // Step 1: stop outgoing sessions first
        let monitored: Vec<String> = self.monitors.keys().cloned().collect();
        for name in monitored {
            let still_current = new.current.as_deref() == Some(name.as_str());
            if !still_current || diff.invalidates(&name) {
                self.stop_monitoring(&name);
            }
        }

        // Step 2: start the incoming current context
        if let Some(current) = new.current_context() {
            if !self.monitors.contains_key(&current.name) {
                self.start_monitoring(current.clone());
            }
        }

        if diff.current_changed {
            signals.push(EngineSignal::CurrentContextChanged {
                previous: self.config.current.clone(),
                current: new.current.clone(),
            });
        }

        self.config = new;
        signals
    }

    fn start_monitoring(
        &mut self,
        context: Context,
    ) {
        info!("start monitoring context {}", context.name);
        let prober = Arc::new(HealthProber::new(
            context.clone(),
            self.probe.clone(),
            self.settings.health.clone(),
            self.event_tx.clone(),
        ));
        prober.start(self.settings.health.probe_timeout());

        self.health_states
            .insert(context.name.clone(), HealthState::unknown(&context.name));

        self.monitors.insert(
            context.name.clone(),
            ContextMonitor {
                context,
                phase: MonitorPhase::HealthPending,
                health: prober,
                probers: Vec::new(),
                round: 0,
            },
        );
    }

    /// Disposes every prober and cache of a context and evicts its registry
    /// entries. Safe to call for unmonitored names.
    fn stop_monitoring(
        &mut self,
        context_name: &str,
    ) {
        let Some(monitor) = self.monitors.remove(context_name) else {
            return;
        };
        info!("stop monitoring context {}", context_name);

        monitor.health.dispose();
        for prober in &monitor.probers {
            prober.dispose();
        }

        for (_, cache) in self.informers.remove_for_context(context_name) {
            cache.dispose();
        }
        self.snapshots.remove_for_context(context_name);
        self.health_states.remove(context_name);
        self.permissions.remove(context_name);
    }

    pub(crate) fn on_health_changed(
        &mut self,
        state: HealthState,
    ) -> Vec<EngineSignal> {
        if !self.monitors.contains_key(&state.context_name) {
            // Late report from a disposed prober
            return Vec::new();
        }
        self.health_states.insert(state.context_name.clone(), state.clone());
        vec![EngineSignal::HealthChanged(state)]
    }

    /// Reachability edge: starts a fresh permission round, disposing any
    /// previous round for this context first. Namespaced and cluster-scoped
    /// requests go to separate probers sharing one round number.
    pub(crate) fn on_context_reachable(
        &mut self,
        context: Context,
    ) -> Vec<EngineSignal> {
        let Some(monitor) = self.monitors.get_mut(&context.name) else {
            return Vec::new();
        };
        if monitor.context != context {
            debug!("reachable edge for stale context value of {}", context.name);
            return Vec::new();
        }

        for prober in monitor.probers.drain(..) {
            prober.dispose();
        }
        // Verdicts are replaced per round, never merged
        self.permissions.insert(context.name.clone(), Vec::new());

        let groups = self.capabilities.requests_by_scope();
        if groups.is_empty() {
            monitor.phase = MonitorPhase::Active;
            return Vec::new();
        }

        self.next_round += 1;
        monitor.round = self.next_round;
        debug!(
            "starting permission round {} for {} ({} request groups)",
            monitor.round,
            context.name,
            groups.len()
        );

        for (_, requests) in groups {
            let prober = Arc::new(PermissionProber::new(
                context.clone(),
                monitor.round,
                requests,
                self.reviewer.clone(),
                self.event_tx.clone(),
            ));
            prober.start();
            monitor.probers.push(prober);
        }
        monitor.phase = MonitorPhase::PermissionPending;
        Vec::new()
    }

    /// Consumes one permitted/denied group. Permitted kinds with a registered
    /// watch capability get a watch cache; denied kinds are simply skipped.
    pub(crate) fn on_permission_result(
        &mut self,
        round: u64,
        result: PermissionResult,
    ) -> Vec<EngineSignal> {
        let Some(monitor) = self.monitors.get_mut(&result.context_name) else {
            return Vec::new();
        };
        if monitor.round != round {
            debug!(
                "dropping permission result from superseded round {} (current {})",
                round, monitor.round
            );
            return Vec::new();
        }

        let context = monitor.context.clone();
        monitor.phase = MonitorPhase::Active;

        self.permissions
            .entry(result.context_name.clone())
            .or_default()
            .extend(result.resources.iter().map(|resource| PermissionVerdict {
                context_name: result.context_name.clone(),
                resource: resource.clone(),
                permitted: result.permitted,
                reason: result.reason.clone(),
            }));

        if result.permitted {
            for resource in &result.resources {
                self.start_watch(&context, resource);
            }
        }

        vec![EngineSignal::PermissionResult(result)]
    }

    fn start_watch(
        &self,
        context: &Context,
        kind: &str,
    ) {
        let Some(entry) = self.capabilities.get(kind) else {
            return;
        };
        let Some(factory) = entry.watch.as_ref() else {
            // Permitted but not watchable; nothing to cache
            return;
        };
        if self.informers.get(&context.name, kind).is_some() {
            return;
        }

        debug!("starting {} watch cache for {}", kind, context.name);
        let source = factory(context);
        let cache = Arc::new(WatchCache::new(
            context,
            kind,
            source,
            self.settings.watch.bootstrap_timeout(),
            self.event_tx.clone(),
        ));
        cache.start();

        self.snapshots.set(&context.name, kind, cache.store());
        self.informers.set(&context.name, kind, cache);
    }

    pub(crate) fn on_cache_updated(
        &mut self,
        context_name: String,
        kind: String,
        count_changed: bool,
    ) -> Vec<EngineSignal> {
        if self.informers.get(&context_name, &kind).is_none() {
            // Event from an evicted cache
            return Vec::new();
        }

        let mut signals = vec![EngineSignal::ResourceUpdated {
            context_name: context_name.clone(),
            kind: kind.clone(),
        }];
        if count_changed {
            signals.push(EngineSignal::ResourceCountUpdated { context_name, kind });
        }
        signals
    }

    pub(crate) fn on_object_deleted(
        &mut self,
        context_name: String,
        kind: String,
        name: String,
        namespace: Option<String>,
    ) -> Vec<EngineSignal> {
        vec![EngineSignal::ObjectDeleted {
            context_name,
            kind,
            name,
            namespace,
        }]
    }

    /// A single kind losing its watch counts as context-wide connectivity
    /// loss: the watch transport is shared, so every snapshot of the context
    /// is evicted, not just the failing kind's.
    pub(crate) fn on_watch_offline(
        &mut self,
        context_name: String,
        kind: String,
        offline: bool,
        reason: Option<String>,
    ) -> Vec<EngineSignal> {
        if !self.monitors.contains_key(&context_name) {
            return Vec::new();
        }

        if offline {
            warn!(
                "{} watch for {} reported offline ({:?}), evicting all cached snapshots",
                kind, context_name, reason
            );
            self.snapshots.remove_for_context(&context_name);
        } else {
            // Reconnected: re-expose the live informers' snapshots
            for (kind, cache) in self.informers.get_for_context(&context_name) {
                self.snapshots.set(&context_name, &kind, cache.store());
            }
        }

        vec![EngineSignal::OfflineChanged { context_name, offline }]
    }

    #[cfg(test)]
    pub(crate) fn phase(
        &self,
        context_name: &str,
    ) -> Option<MonitorPhase> {
        self.monitors.get(context_name).map(|m| m.phase)
    }

    #[cfg(test)]
    pub(crate) fn monitored_contexts(&self) -> Vec<String> {
        self.monitors.keys().cloned().collect()
    }

    /// Tears down every session; used on engine disposal.
    pub(crate) fn dispose_all(&mut self) {
        let monitored: Vec<String> = self.monitors.keys().cloned().collect();
        for name in monitored {
            self.stop_monitoring(&name);
        }
    }
}
