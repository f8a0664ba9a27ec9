//! Shared fixtures for engine tests: scripted transports standing in for the
//! external probe, reviewer, confirmation and watch-source contracts.

use std::collections::HashMap;
use std::collections::HashSet;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::StreamExt;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;

use crate::AccessReviewer;
use crate::ApiError;
use crate::ApiObject;
use crate::ConfigSnapshot;
use crate::ConfirmDeletion;
use crate::ConnectivityError;
use crate::Context;
use crate::HealthProbe;
use crate::KindCapabilities;
use crate::PermissionRequest;
use crate::Result;
use crate::Scope;
use crate::Settings;
use crate::WatchDelta;
use crate::WatchSource;

/// Probe whose reachability is flipped by the test; counts invocations so
/// no-op assertions can verify probing was not restarted.
#[derive(Default)]
pub struct ScriptedProbe {
    reachable: AtomicBool,
    probes: AtomicUsize,
}

impl ScriptedProbe {
    pub fn reachable() -> Arc<Self> {
        let probe = Self::default();
        probe.reachable.store(true, Ordering::SeqCst);
        Arc::new(probe)
    }

    pub fn unreachable() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_reachable(
        &self,
        reachable: bool,
    ) {
        self.reachable.store(reachable, Ordering::SeqCst);
    }

    pub fn probe_count(&self) -> usize {
        self.probes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HealthProbe for ScriptedProbe {
    async fn probe(
        &self,
        _context: &Context,
    ) -> Result<()> {
        self.probes.fetch_add(1, Ordering::SeqCst);
        if self.reachable.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(ConnectivityError::Unreachable("scripted failure".into()).into())
        }
    }
}

/// Reviewer answering from a fixed grant table. Resources absent from the
/// table are denied; resources in the failing set error out instead.
#[derive(Default)]
pub struct StaticReviewer {
    grants: HashMap<String, bool>,
    failing: HashSet<String>,
}

impl StaticReviewer {
    pub fn new(grants: &[(&str, bool)]) -> Arc<Self> {
        Arc::new(Self {
            grants: grants.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
            failing: HashSet::new(),
        })
    }

    pub fn with_failing(
        grants: &[(&str, bool)],
        failing: &[&str],
    ) -> Arc<Self> {
        Arc::new(Self {
            grants: grants.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
            failing: failing.iter().map(|k| k.to_string()).collect(),
        })
    }
}

#[async_trait]
impl AccessReviewer for StaticReviewer {
    async fn review(
        &self,
        _context: &Context,
        request: &PermissionRequest,
    ) -> Result<bool> {
        if self.failing.contains(&request.resource) {
            return Err(ApiError::Request("scripted review failure".into()).into());
        }
        Ok(self.grants.get(&request.resource).copied().unwrap_or(false))
    }
}

pub struct AlwaysConfirm;

#[async_trait]
impl ConfirmDeletion for AlwaysConfirm {
    async fn confirm<'a>(
        &self,
        _kind: &str,
        _name: &str,
        _namespace: Option<&'a str>,
    ) -> bool {
        true
    }
}

pub struct NeverConfirm;

#[async_trait]
impl ConfirmDeletion for NeverConfirm {
    async fn confirm<'a>(
        &self,
        _kind: &str,
        _name: &str,
        _namespace: Option<&'a str>,
    ) -> bool {
        false
    }
}

/// Outcome scripted for the next bootstrap call.
#[derive(Debug, Clone)]
pub enum BootstrapOutcome {
    Ok,
    KindNotFound(String),
    Fail(String),
}

/// Watch source driven by the test: fixed bootstrap objects plus a delta
/// channel the test pushes into. Re-armable for reconnect scenarios.
pub struct ScriptedWatchSource {
    objects: Mutex<Vec<ApiObject>>,
    outcome: Mutex<BootstrapOutcome>,
    deltas: Mutex<Option<mpsc::UnboundedReceiver<Result<WatchDelta>>>>,
    bootstraps: AtomicUsize,
}

impl ScriptedWatchSource {
    pub fn new(objects: Vec<ApiObject>) -> (Arc<Self>, mpsc::UnboundedSender<Result<WatchDelta>>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let source = Arc::new(Self {
            objects: Mutex::new(objects),
            outcome: Mutex::new(BootstrapOutcome::Ok),
            deltas: Mutex::new(Some(rx)),
            bootstraps: AtomicUsize::new(0),
        });
        (source, tx)
    }

    pub fn with_outcome(
        objects: Vec<ApiObject>,
        outcome: BootstrapOutcome,
    ) -> (Arc<Self>, mpsc::UnboundedSender<Result<WatchDelta>>) {
        let (source, tx) = Self::new(objects);
        *source.outcome.lock() = outcome;
        (source, tx)
    }

    /// Prepares the source for one more bootstrap+subscribe cycle.
    pub fn rearm(
        &self,
        objects: Vec<ApiObject>,
    ) -> mpsc::UnboundedSender<Result<WatchDelta>> {
        let (tx, rx) = mpsc::unbounded_channel();
        *self.objects.lock() = objects;
        *self.outcome.lock() = BootstrapOutcome::Ok;
        *self.deltas.lock() = Some(rx);
        tx
    }

    pub fn bootstrap_count(&self) -> usize {
        self.bootstraps.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WatchSource for ScriptedWatchSource {
    async fn bootstrap(&self) -> Result<Vec<ApiObject>> {
        self.bootstraps.fetch_add(1, Ordering::SeqCst);
        match self.outcome.lock().clone() {
            BootstrapOutcome::Ok => Ok(self.objects.lock().clone()),
            BootstrapOutcome::KindNotFound(kind) => Err(ApiError::KindNotFound { kind }.into()),
            BootstrapOutcome::Fail(reason) => Err(ConnectivityError::Unreachable(reason).into()),
        }
    }

    async fn subscribe(&self) -> Result<BoxStream<'static, Result<WatchDelta>>> {
        match self.deltas.lock().take() {
            Some(rx) => Ok(UnboundedReceiverStream::new(rx).boxed()),
            None => Err(ConnectivityError::StreamClosed("delta channel already taken".into()).into()),
        }
    }
}

// ============== Fixtures ============== //

pub fn context(name: &str) -> Context {
    Context::new(name, format!("{name}-cluster"), format!("{name}-user")).with_namespace("default")
}

pub fn snapshot(
    names: &[&str],
    current: Option<&str>,
) -> ConfigSnapshot {
    ConfigSnapshot::new(names.iter().map(|n| context(n)).collect(), current.map(String::from))
}

pub fn object(
    name: &str,
    namespace: Option<&str>,
) -> ApiObject {
    ApiObject::new(name, namespace.map(String::from))
}

/// Watchable kind whose factory hands out the one scripted source regardless
/// of context.
pub fn watchable_kind(
    kind: &str,
    source: Arc<ScriptedWatchSource>,
) -> KindCapabilities {
    KindCapabilities::new(kind, vec![PermissionRequest::watch(kind, Scope::Namespaced)])
        .with_watch(Arc::new(move |_: &Context| source.clone() as Arc<dyn WatchSource>))
}

/// Settings with probe cadence tightened for paused-clock tests.
pub fn fast_settings() -> Settings {
    let mut settings = Settings::default();
    settings.health.probe_interval_in_ms = 50;
    settings.health.probe_timeout_in_ms = 50;
    settings.health.probe_jitter_in_ms = 0;
    settings
}
