use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::error;
use tracing::warn;

use super::ObjectStore;
use super::WatchDelta;
use super::WatchSource;
use crate::engine::EngineEvent;
use crate::ApiObject;
use crate::ConnectivityError;
use crate::Context;
use crate::Error;
use crate::ObjectRef;

/// Live object cache for one (context, resource-kind) pair.
///
/// `start()` bootstraps the snapshot with a list call and then consumes the
/// watch stream on a spawned task. A 404-style "kind not found" from either
/// step is a normal empty-result condition and is swallowed; any other stream
/// failure marks the cache offline until [`WatchCache::reconnect`].
pub struct WatchCache {
    context_name: String,
    kind: String,
    source: Arc<dyn WatchSource>,
    bootstrap_timeout: Duration,
    store: Arc<ObjectStore>,
    offline: AtomicBool,
    event_tx: mpsc::Sender<EngineEvent>,
    cancel: CancellationToken,
    session: Mutex<CancellationToken>,
}

impl WatchCache {
    pub(crate) fn new(
        context: &Context,
        kind: impl Into<String>,
        source: Arc<dyn WatchSource>,
        bootstrap_timeout: Duration,
        event_tx: mpsc::Sender<EngineEvent>,
    ) -> Self {
        let cancel = CancellationToken::new();
        let session = Mutex::new(cancel.child_token());
        Self {
            context_name: context.name.clone(),
            kind: kind.into(),
            source,
            bootstrap_timeout,
            store: Arc::new(ObjectStore::new()),
            offline: AtomicBool::new(false),
            event_tx,
            cancel,
            session,
        }
    }

    /// Starts the bootstrap list and the continuous watch on a spawned task.
    pub(crate) fn start(self: &Arc<Self>) {
        let session = self.session.lock().clone();
        let cache = self.clone();
        tokio::spawn(async move {
            cache.run_session(session).await;
        });
    }

    async fn run_session(
        self: Arc<Self>,
        session: CancellationToken,
    ) {
        // Initial bootstrap list
        let bootstrapped = match timeout(self.bootstrap_timeout, self.source.bootstrap()).await {
            Ok(result) => result,
            Err(_) => Err(ConnectivityError::StreamClosed(format!(
                "bootstrap timed out after {:?}",
                self.bootstrap_timeout
            ))
            .into()),
        };
        match bootstrapped {
            Ok(objects) => {
                debug!(
                    "bootstrap listed {} {} objects for {}",
                    objects.len(),
                    self.kind,
                    self.context_name
                );
                for object in objects {
                    self.store.apply(object);
                }
                self.emit_cache_updated(&session, true).await;
            }
            Err(e) if e.is_kind_not_found() => {
                // Kind absent on this endpoint: an empty cache, not a fault
                debug!("kind {} not served by {}", self.kind, self.context_name);
                return;
            }
            Err(e) => {
                self.go_offline(&session, e).await;
                return;
            }
        }

        // Continuous watch
        let mut stream = match self.source.subscribe().await {
            Ok(stream) => stream,
            Err(e) if e.is_kind_not_found() => {
                debug!("kind {} not watchable on {}", self.kind, self.context_name);
                return;
            }
            Err(e) => {
                self.go_offline(&session, e).await;
                return;
            }
        };

        loop {
            tokio::select! {
                _ = session.cancelled() => return,
                item = stream.next() => match item {
                    Some(Ok(WatchDelta::Applied(object))) => {
                        let added = self.store.apply(object);
                        self.emit_cache_updated(&session, added).await;
                    }
                    Some(Ok(WatchDelta::Deleted(object_ref))) => {
                        if self.store.remove(&object_ref).is_some() {
                            self.emit_cache_updated(&session, true).await;
                            self.emit_object_deleted(&session, object_ref).await;
                        }
                    }
                    Some(Err(e)) if e.is_kind_not_found() => {
                        warn!("swallowing kind-not-found on {} watch for {}", self.kind, self.context_name);
                    }
                    Some(Err(e)) => {
                        self.go_offline(&session, e).await;
                        return;
                    }
                    None => {
                        let e = ConnectivityError::StreamClosed("watch stream ended".into());
                        self.go_offline(&session, e.into()).await;
                        return;
                    }
                }
            }
        }
    }

    async fn emit_cache_updated(
        &self,
        session: &CancellationToken,
        count_changed: bool,
    ) {
        let event = EngineEvent::CacheUpdated {
            context_name: self.context_name.clone(),
            kind: self.kind.clone(),
            count_changed,
        };
        self.emit(session, event).await;
    }

    async fn emit_object_deleted(
        &self,
        session: &CancellationToken,
        object_ref: ObjectRef,
    ) {
        let event = EngineEvent::ObjectDeleted {
            context_name: self.context_name.clone(),
            kind: self.kind.clone(),
            name: object_ref.name,
            namespace: object_ref.namespace,
        };
        self.emit(session, event).await;
    }

    async fn go_offline(
        &self,
        session: &CancellationToken,
        error: Error,
    ) {
        warn!(
            "{} watch for {} went offline: {}",
            self.kind, self.context_name, error
        );
        self.offline.store(true, Ordering::SeqCst);
        let event = EngineEvent::WatchOffline {
            context_name: self.context_name.clone(),
            kind: self.kind.clone(),
            offline: true,
            reason: Some(error.to_string()),
        };
        self.emit(session, event).await;
    }

    async fn emit(
        &self,
        session: &CancellationToken,
        event: EngineEvent,
    ) {
        tokio::select! {
            _ = session.cancelled() => {}
            sent = self.event_tx.send(event) => {
                if let Err(e) = sent {
                    error!("watch cache event send failed: {:?}", e);
                }
            }
        }
    }

    /// No-op unless currently offline: clears the flag, announces
    /// `offline: false` and restarts the underlying watch with a fresh
    /// bootstrap.
    pub fn reconnect(self: &Arc<Self>) {
        if !self.offline.swap(false, Ordering::SeqCst) {
            return;
        }

        let session = {
            let mut guard = self.session.lock();
            *guard = self.cancel.child_token();
            guard.clone()
        };

        let cache = self.clone();
        tokio::spawn(async move {
            let event = EngineEvent::WatchOffline {
                context_name: cache.context_name.clone(),
                kind: cache.kind.clone(),
                offline: false,
                reason: None,
            };
            cache.emit(&session, event).await;

            cache.store.clear();
            cache.clone().run_session(session).await;
        });
    }

    /// Shared queryable snapshot; registered in the engine's snapshot
    /// registry beside this cache.
    pub fn store(&self) -> Arc<ObjectStore> {
        self.store.clone()
    }

    pub fn list(&self) -> Vec<ApiObject> {
        self.store.list()
    }

    pub fn get(
        &self,
        name: &str,
        namespace: Option<&str>,
    ) -> Option<ApiObject> {
        self.store.get(name, namespace)
    }

    pub fn is_offline(&self) -> bool {
        self.offline.load(Ordering::SeqCst)
    }

    pub fn context_name(&self) -> &str {
        &self.context_name
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Stops the watch and every pending emit. Idempotent.
    pub fn dispose(&self) {
        self.cancel.cancel();
    }
}
