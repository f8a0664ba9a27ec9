use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use dashmap::DashMap;
use parking_lot::Mutex;
use tokio::sync::broadcast;
use tokio::sync::mpsc;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::info;
use tracing::warn;

use super::ConfirmDeletion;
use super::Coordinator;
use super::EngineEvent;
use super::EngineSignal;
use super::ResourceCount;
use super::SignalKind;
use crate::AccessReviewer;
use crate::ApiError;
use crate::ApiObject;
use crate::CapabilityTable;
use crate::ConfigSnapshot;
use crate::Context;
use crate::EngineError;
use crate::Error;
use crate::HealthProbe;
use crate::HealthState;
use crate::KeyedRegistry;
use crate::NotificationHub;
use crate::ObjectStore;
use crate::Observer;
use crate::PermissionVerdict;
use crate::Result;
use crate::Settings;
use crate::StatusPayload;
use crate::WatchCache;

/// The root synchronization engine.
///
/// Owns one event-loop task through which every monitoring decision flows;
/// queries never touch that task and read the loop's lock-free mirrors
/// instead. Construct with [`SyncEngine::new`], call [`SyncEngine::init`]
/// once, push configuration via [`SyncEngine::update`].
pub struct SyncEngine {
    capabilities: Arc<CapabilityTable>,
    confirm: Arc<dyn ConfirmDeletion>,
    event_tx: mpsc::Sender<EngineEvent>,

    current: ArcSwap<ConfigSnapshot>,
    informers: Arc<KeyedRegistry<Arc<WatchCache>>>,
    snapshots: Arc<KeyedRegistry<Arc<ObjectStore>>>,
    health_states: Arc<DashMap<String, HealthState>>,
    permissions: Arc<DashMap<String, Vec<PermissionVerdict>>>,

    hub: Arc<NotificationHub<SignalKind, EngineSignal>>,
    signal_tx: broadcast::Sender<EngineSignal>,

    loop_parts: Mutex<Option<(Coordinator, mpsc::Receiver<EngineEvent>)>>,
    cancel: CancellationToken,
}

impl SyncEngine {
    pub fn new(
        capabilities: Arc<CapabilityTable>,
        probe: Arc<dyn HealthProbe>,
        reviewer: Arc<dyn AccessReviewer>,
        confirm: Arc<dyn ConfirmDeletion>,
        settings: Arc<Settings>,
    ) -> Self {
        let (event_tx, event_rx) = mpsc::channel(settings.engine.event_channel_capacity);
        let (signal_tx, _) = broadcast::channel(settings.engine.signal_channel_capacity);

        let informers = Arc::new(KeyedRegistry::new());
        let snapshots = Arc::new(KeyedRegistry::new());
        let health_states = Arc::new(DashMap::new());
        let permissions = Arc::new(DashMap::new());

        let coordinator = Coordinator::new(
            capabilities.clone(),
            probe,
            reviewer,
            settings.clone(),
            event_tx.clone(),
            informers.clone(),
            snapshots.clone(),
            health_states.clone(),
            permissions.clone(),
        );

        Self {
            capabilities,
            confirm,
            event_tx,
            current: ArcSwap::from_pointee(ConfigSnapshot::default()),
            informers,
            snapshots,
            health_states,
            permissions,
            hub: Arc::new(NotificationHub::new(settings.notify.clone())),
            signal_tx,
            loop_parts: Mutex::new(Some((coordinator, event_rx))),
            cancel: CancellationToken::new(),
        }
    }

    /// Spawns the event loop. Call once after construction; repeated calls
    /// are logged and ignored.
    pub fn init(self: &Arc<Self>) {
        let Some((mut coordinator, mut event_rx)) = self.loop_parts.lock().take() else {
            warn!("engine already initialized");
            return;
        };

        let engine = self.clone();
        tokio::spawn(async move {
            info!("synchronization engine event loop started");
            loop {
                tokio::select! {
                    biased;
                    _ = engine.cancel.cancelled() => break,
                    event = event_rx.recv() => match event {
                        Some(event) => engine.handle(&mut coordinator, event),
                        None => break,
                    },
                }
            }
            coordinator.dispose_all();
            engine.hub.dispose();
            info!("synchronization engine event loop stopped");
        });
    }

    fn handle(
        &self,
        coordinator: &mut Coordinator,
        event: EngineEvent,
    ) {
        let signals = match event {
            EngineEvent::ConfigUpdated(snapshot, ack) => {
                let signals = coordinator.apply_config(snapshot.clone());
                self.current.store(Arc::new(snapshot));
                // Caller may have dropped the waiting future; fine either way
                let _ = ack.send(Ok(()));
                signals
            }
            EngineEvent::HealthChanged(state) => coordinator.on_health_changed(state),
            EngineEvent::ContextReachable(context) => coordinator.on_context_reachable(context),
            EngineEvent::PermissionResult { round, result } => {
                coordinator.on_permission_result(round, result)
            }
            EngineEvent::CacheUpdated {
                context_name,
                kind,
                count_changed,
            } => coordinator.on_cache_updated(context_name, kind, count_changed),
            EngineEvent::ObjectDeleted {
                context_name,
                kind,
                name,
                namespace,
            } => coordinator.on_object_deleted(context_name, kind, name, namespace),
            EngineEvent::WatchOffline {
                context_name,
                kind,
                offline,
                reason,
            } => coordinator.on_watch_offline(context_name, kind, offline, reason),
        };

        for signal in signals {
            self.hub.publish(&signal.kind(), signal.clone());
            // No receivers is not an error
            let _ = self.signal_tx.send(signal);
        }
    }

    /// Replaces the configuration snapshot. Resolves only after the outgoing
    /// context (if any) is fully stopped and the incoming one is started, so
    /// callers can sequence updates deterministically.
    pub async fn update(
        &self,
        snapshot: ConfigSnapshot,
    ) -> Result<()> {
        let (ack_tx, ack_rx) = oneshot::channel();
        self.event_tx
            .send(EngineEvent::ConfigUpdated(snapshot, ack_tx))
            .await
            .map_err(|_| Error::from(EngineError::Disposed))?;
        ack_rx.await.map_err(|_| Error::from(EngineError::Disposed))?
    }

    // ============== Queries ============== //

    /// Cached objects of one kind across the given contexts. Contexts without
    /// a snapshot (offline, denied, or never monitored) contribute nothing.
    pub fn get_resources(
        &self,
        context_names: &[String],
        kind: &str,
    ) -> Vec<ApiObject> {
        self.snapshots
            .get_for_contexts_and_kind(context_names, kind)
            .into_iter()
            .flat_map(|(_, store)| store.list())
            .collect()
    }

    /// Single cached object lookup; `context_name: None` uses the current
    /// context.
    pub fn get_resource(
        &self,
        context_name: Option<&str>,
        kind: &str,
        name: &str,
        namespace: Option<&str>,
    ) -> Option<ApiObject> {
        let context = self.resolve_context(context_name).ok()?;
        self.snapshots
            .get(&context.name, kind)
            .and_then(|store| store.get(name, namespace))
    }

    /// Object counts for every live snapshot, with active counts where the
    /// kind registered an activity predicate.
    pub fn resource_counts(&self) -> Vec<ResourceCount> {
        self.snapshots
            .get_all()
            .into_iter()
            .map(|(context_name, kind, store)| {
                let active = self
                    .capabilities
                    .get(&kind)
                    .and_then(|entry| entry.is_active.clone())
                    .map(|predicate| store.list().into_iter().filter(|object| predicate(object)).count());
                ResourceCount {
                    context_name,
                    kind,
                    count: store.len(),
                    active,
                }
            })
            .collect()
    }

    pub fn health_state(
        &self,
        context_name: &str,
    ) -> Option<HealthState> {
        self.health_states.get(context_name).map(|entry| entry.value().clone())
    }

    /// Verdicts of the latest completed (or in-flight) permission round.
    pub fn get_permissions(
        &self,
        context_name: &str,
    ) -> Vec<PermissionVerdict> {
        self.permissions
            .get(context_name)
            .map(|entry| entry.value().clone())
            .unwrap_or_default()
    }

    /// The most recently applied configuration snapshot.
    pub fn current_snapshot(&self) -> ConfigSnapshot {
        (**self.current.load()).clone()
    }

    // ============== Observation ============== //

    /// Registers a coalesced observer for one signal kind.
    pub fn observe(
        &self,
        kind: SignalKind,
        observer_id: &str,
        observer: Observer<EngineSignal>,
    ) {
        self.hub.subscribe(kind, observer_id, observer);
    }

    pub fn unobserve(
        &self,
        kind: &SignalKind,
        observer_id: &str,
    ) {
        self.hub.unsubscribe(kind, observer_id);
    }

    pub fn unobserve_all(
        &self,
        observer_id: &str,
    ) {
        self.hub.unsubscribe_observer(observer_id);
    }

    /// Raw, uncoalesced signal feed. Slow receivers may observe `Lagged`.
    pub fn subscribe_signals(&self) -> broadcast::Receiver<EngineSignal> {
        self.signal_tx.subscribe()
    }

    // ============== Mutations ============== //

    /// Deletes one remote object after confirmation. Unknown kinds, kinds
    /// without a delete capability and declined confirmations are quiet
    /// no-ops; a rejection carrying a status body goes to the status hook
    /// instead of the caller.
    pub async fn delete_object(
        &self,
        kind: &str,
        name: &str,
        namespace: Option<&str>,
        context_name: Option<&str>,
    ) -> Result<()> {
        let Some(entry) = self.capabilities.get(kind) else {
            warn!("delete refused: unknown kind {}", kind);
            return Ok(());
        };
        let Some(op) = entry.delete.clone() else {
            warn!("delete refused: kind {} is not deletable", kind);
            return Ok(());
        };

        if !self.confirm.confirm(kind, name, namespace).await {
            info!("deletion of {}/{} declined", kind, name);
            return Ok(());
        }

        let context = self.resolve_context(context_name)?;
        let namespace = namespace.or(context.namespace.as_deref());

        match op.delete(&context, name, namespace).await {
            Ok(()) => Ok(()),
            Err(Error::Api(ApiError::Status(payload))) => {
                self.handle_status(payload);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Bulk deletion; one failing item never aborts the rest.
    pub async fn delete_objects(
        &self,
        kind: &str,
        items: &[(String, Option<String>)],
    ) -> Result<()> {
        for (name, namespace) in items {
            if let Err(e) = self.delete_object(kind, name, namespace.as_deref(), None).await {
                warn!("deletion of {}/{} failed: {}", kind, name, e);
            }
        }
        Ok(())
    }

    /// Restart is non-destructive and skips confirmation.
    pub async fn restart_object(
        &self,
        kind: &str,
        name: &str,
        namespace: Option<&str>,
        context_name: Option<&str>,
    ) -> Result<()> {
        let Some(entry) = self.capabilities.get(kind) else {
            warn!("restart refused: unknown kind {}", kind);
            return Ok(());
        };
        let Some(op) = entry.restart.clone() else {
            warn!("restart refused: kind {} is not restartable", kind);
            return Ok(());
        };

        let context = self.resolve_context(context_name)?;
        let namespace = namespace.or(context.namespace.as_deref());

        match op.restart(&context, name, namespace).await {
            Ok(()) => Ok(()),
            Err(Error::Api(ApiError::Status(payload))) => {
                self.handle_status(payload);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Label-selector search against the live API, bypassing the cache.
    /// Kinds without a search capability return an empty result.
    pub async fn search_by_selector(
        &self,
        kind: &str,
        selector: &str,
        namespace: Option<&str>,
        context_name: Option<&str>,
    ) -> Result<Vec<ApiObject>> {
        let Some(op) = self.capabilities.get(kind).and_then(|entry| entry.search.clone()) else {
            debug!("selector search unsupported for kind {}", kind);
            return Ok(Vec::new());
        };

        let context = self.resolve_context(context_name)?;
        let namespace = namespace.or(context.namespace.as_deref());
        op.search(&context, selector, namespace).await
    }

    /// Resolves true once the object is observed gone, false on timeout.
    ///
    /// Subscribes to deletion signals before looking anywhere, so a deletion
    /// landing between the snapshot check and the wait is never missed.
    pub async fn wait_for_object_deletion(
        &self,
        kind: &str,
        name: &str,
        namespace: Option<&str>,
        wait: Duration,
        context_name: Option<&str>,
    ) -> Result<bool> {
        let mut signals = self.subscribe_signals();
        let context = self.resolve_context(context_name)?;

        // Fast path 1: a live cache that no longer holds the object
        if let Some(store) = self.snapshots.get(&context.name, kind) {
            if store.get(name, namespace).is_none() {
                return Ok(true);
            }
        } else if let Some(op) = self.capabilities.get(kind).and_then(|entry| entry.read.clone()) {
            // Fast path 2: no cache for this kind, ask the API directly
            let ns = namespace.or(context.namespace.as_deref());
            match op.read(&context, name, ns).await {
                Err(e) if e.is_object_not_found() => return Ok(true),
                Err(e) if e.is_kind_not_found() => return Ok(true),
                _ => {}
            }
        }

        let deadline = tokio::time::sleep(wait);
        tokio::pin!(deadline);
        loop {
            tokio::select! {
                _ = &mut deadline => return Ok(false),
                received = signals.recv() => match received {
                    Ok(EngineSignal::ObjectDeleted {
                        context_name: ctx,
                        kind: k,
                        name: n,
                        namespace: ns,
                    }) if ctx == context.name
                        && k == kind
                        && n == name
                        && (namespace.is_none() || ns.as_deref() == namespace) =>
                    {
                        return Ok(true);
                    }
                    Ok(_) => {}
                    Err(broadcast::error::RecvError::Lagged(_)) => {
                        // Missed signals; fall back to the cache state
                        if let Some(store) = self.snapshots.get(&context.name, kind) {
                            if store.get(name, namespace).is_none() {
                                return Ok(true);
                            }
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => return Ok(false),
                }
            }
        }
    }

    /// Restarts every offline watch of a context after connectivity returns.
    /// Caches that are still online are untouched.
    pub fn reconnect_context(
        &self,
        context_name: Option<&str>,
    ) -> Result<()> {
        let context = self.resolve_context(context_name)?;
        for (kind, cache) in self.informers.get_for_context(&context.name) {
            debug!("reconnect requested for {} watch on {}", kind, context.name);
            cache.reconnect();
        }
        Ok(())
    }

    /// Hook for machine-readable rejection bodies.
    // TODO: surface these to observers once a dedicated status signal exists
    pub fn handle_status(
        &self,
        payload: StatusPayload,
    ) {
        warn!(
            "remote API rejected a request: code={:?} reason={:?} message={:?}",
            payload.code, payload.reason, payload.message
        );
    }

    fn resolve_context(
        &self,
        name: Option<&str>,
    ) -> Result<Context> {
        let snapshot = self.current.load();
        let context = match name {
            Some(name) => snapshot.get(name),
            None => snapshot.current_context(),
        };
        context.cloned().ok_or_else(|| {
            EngineError::InvalidConfig(match name {
                Some(name) => format!("unknown context: {name}"),
                None => "no current context selected".to_string(),
            })
            .into()
        })
    }

    /// Stops the event loop and every monitored context. Idempotent; the
    /// engine cannot be restarted afterwards.
    pub fn dispose(&self) {
        info!("disposing synchronization engine");
        self.cancel.cancel();
    }
}

impl Drop for SyncEngine {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
