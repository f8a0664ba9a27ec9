use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;

use crate::ApiObject;
use crate::Context;
use crate::PermissionRequest;
use crate::Result;
use crate::Scope;
use crate::WatchSource;

/// Builds the list+watch source for one (context, kind) pair.
pub type WatchSourceFactory = Arc<dyn Fn(&Context) -> Arc<dyn WatchSource> + Send + Sync>;

/// Predicate deciding whether an object counts as "active" in count
/// aggregates (e.g. a running pod-like entity).
pub type IsActiveFn = Arc<dyn Fn(&ApiObject) -> bool + Send + Sync>;

#[async_trait]
pub trait DeleteOp: Send + Sync {
    async fn delete(
        &self,
        context: &Context,
        name: &str,
        namespace: Option<&str>,
    ) -> Result<()>;
}

#[async_trait]
pub trait RestartOp: Send + Sync {
    async fn restart(
        &self,
        context: &Context,
        name: &str,
        namespace: Option<&str>,
    ) -> Result<()>;
}

#[async_trait]
pub trait ReadOp: Send + Sync {
    async fn read(
        &self,
        context: &Context,
        name: &str,
        namespace: Option<&str>,
    ) -> Result<ApiObject>;
}

#[async_trait]
pub trait SelectorSearchOp: Send + Sync {
    async fn search(
        &self,
        context: &Context,
        selector: &str,
        namespace: Option<&str>,
    ) -> Result<Vec<ApiObject>>;
}

/// Everything the engine knows about one resource kind.
///
/// Every capability is optional; the engine skips what is not set.
#[derive(Clone)]
pub struct KindCapabilities {
    /// Pluralized kind identifier used for permission and watch requests
    pub kind: String,
    /// Permission requests that gate watching this kind
    pub permissions: Vec<PermissionRequest>,
    pub watch: Option<WatchSourceFactory>,
    pub delete: Option<Arc<dyn DeleteOp>>,
    pub restart: Option<Arc<dyn RestartOp>>,
    pub read: Option<Arc<dyn ReadOp>>,
    pub search: Option<Arc<dyn SelectorSearchOp>>,
    pub is_active: Option<IsActiveFn>,
}

impl Debug for KindCapabilities {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("KindCapabilities")
            .field("kind", &self.kind)
            .field("watchable", &self.watch.is_some())
            .field("deletable", &self.delete.is_some())
            .field("restartable", &self.restart.is_some())
            .field("readable", &self.read.is_some())
            .field("searchable", &self.search.is_some())
            .finish()
    }
}

impl KindCapabilities {
    pub fn new(
        kind: impl Into<String>,
        permissions: Vec<PermissionRequest>,
    ) -> Self {
        Self {
            kind: kind.into(),
            permissions,
            watch: None,
            delete: None,
            restart: None,
            read: None,
            search: None,
            is_active: None,
        }
    }

    pub fn with_watch(
        mut self,
        factory: WatchSourceFactory,
    ) -> Self {
        self.watch = Some(factory);
        self
    }

    pub fn with_delete(
        mut self,
        op: Arc<dyn DeleteOp>,
    ) -> Self {
        self.delete = Some(op);
        self
    }

    pub fn with_restart(
        mut self,
        op: Arc<dyn RestartOp>,
    ) -> Self {
        self.restart = Some(op);
        self
    }

    pub fn with_read(
        mut self,
        op: Arc<dyn ReadOp>,
    ) -> Self {
        self.read = Some(op);
        self
    }

    pub fn with_search(
        mut self,
        op: Arc<dyn SelectorSearchOp>,
    ) -> Self {
        self.search = Some(op);
        self
    }

    pub fn with_is_active(
        mut self,
        predicate: IsActiveFn,
    ) -> Self {
        self.is_active = Some(predicate);
        self
    }
}

/// Immutable lookup over every registered resource kind, supplied at engine
/// construction. Never mutated by the engine.
#[derive(Debug, Clone, Default)]
pub struct CapabilityTable {
    kinds: HashMap<String, Arc<KindCapabilities>>,
}

impl CapabilityTable {
    pub fn new(entries: Vec<KindCapabilities>) -> Self {
        let kinds = entries.into_iter().map(|e| (e.kind.clone(), Arc::new(e))).collect();
        Self { kinds }
    }

    pub fn get(
        &self,
        kind: &str,
    ) -> Option<Arc<KindCapabilities>> {
        self.kinds.get(kind).cloned()
    }

    pub fn kinds(&self) -> impl Iterator<Item = &Arc<KindCapabilities>> {
        self.kinds.values()
    }

    /// Kinds with a registered watch-source factory.
    pub fn watchable_kinds(&self) -> Vec<Arc<KindCapabilities>> {
        self.kinds.values().filter(|e| e.watch.is_some()).cloned().collect()
    }

    /// All permission requests across the table, grouped by scope.
    /// Namespaced and cluster-scoped requests are probed separately.
    pub fn requests_by_scope(&self) -> HashMap<Scope, Vec<PermissionRequest>> {
        let mut groups: HashMap<Scope, Vec<PermissionRequest>> = HashMap::new();
        for entry in self.kinds.values() {
            for request in &entry.permissions {
                let group = groups.entry(request.scope).or_default();
                if !group.contains(request) {
                    group.push(request.clone());
                }
            }
        }
        groups
    }
}
