//! Context and configuration-snapshot model.
//!
//! A [`Context`] identifies one remote cluster endpoint plus the credentials
//! and default namespace needed to reach it. A [`ConfigSnapshot`] is the full
//! set of known contexts plus which one, if any, is current; every
//! configuration update replaces the previous snapshot wholesale and the
//! engine reacts to the [`SnapshotDiff`] between the two.

#[cfg(test)]
mod snapshot_test;

use std::collections::HashMap;

use serde::Deserialize;
use serde::Serialize;

/// One addressable cluster endpoint. Immutable once resolved for a given
/// configuration snapshot; a new value is produced whenever the configuration
/// changes, even for the same logical context name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Context {
    /// Identity key, unique within a snapshot
    pub name: String,
    /// Endpoint/cluster identifier
    pub cluster: String,
    /// Credentials identifier
    pub user: String,
    /// Default namespace for namespaced operations
    pub namespace: Option<String>,
}

impl Context {
    pub fn new(
        name: impl Into<String>,
        cluster: impl Into<String>,
        user: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            cluster: cluster.into(),
            user: user.into(),
            namespace: None,
        }
    }

    pub fn with_namespace(
        mut self,
        namespace: impl Into<String>,
    ) -> Self {
        self.namespace = Some(namespace.into());
        self
    }
}

/// The full set of known contexts plus the current one.
///
/// Exactly one context may be current at a time, or none.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ConfigSnapshot {
    pub contexts: Vec<Context>,
    pub current: Option<String>,
}

impl ConfigSnapshot {
    pub fn new(
        contexts: Vec<Context>,
        current: Option<String>,
    ) -> Self {
        Self { contexts, current }
    }

    pub fn get(
        &self,
        name: &str,
    ) -> Option<&Context> {
        self.contexts.iter().find(|c| c.name == name)
    }

    /// The context the `current` pointer names, if it exists in the snapshot.
    pub fn current_context(&self) -> Option<&Context> {
        self.current.as_deref().and_then(|name| self.get(name))
    }
}

/// Difference between two configuration snapshots.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SnapshotDiff {
    /// Context names present only in the new snapshot
    pub added: Vec<String>,
    /// Context names present only in the old snapshot
    pub removed: Vec<String>,
    /// Context names whose cluster/user/namespace changed
    pub modified: Vec<String>,
    /// True when the `current` pointer moved
    pub current_changed: bool,
}

impl SnapshotDiff {
    pub fn between(
        old: &ConfigSnapshot,
        new: &ConfigSnapshot,
    ) -> Self {
        let old_by_name: HashMap<&str, &Context> = old.contexts.iter().map(|c| (c.name.as_str(), c)).collect();
        let new_by_name: HashMap<&str, &Context> = new.contexts.iter().map(|c| (c.name.as_str(), c)).collect();

        let mut added = Vec::new();
        let mut modified = Vec::new();
        for ctx in &new.contexts {
            match old_by_name.get(ctx.name.as_str()) {
                None => added.push(ctx.name.clone()),
                Some(prev) if *prev != ctx => modified.push(ctx.name.clone()),
                Some(_) => {}
            }
        }

        let removed: Vec<String> = old
            .contexts
            .iter()
            .filter(|c| !new_by_name.contains_key(c.name.as_str()))
            .map(|c| c.name.clone())
            .collect();

        Self {
            added,
            removed,
            modified,
            current_changed: old.current != new.current,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.modified.is_empty() && !self.current_changed
    }

    /// True when the named context was removed or had its value changed.
    pub fn invalidates(
        &self,
        name: &str,
    ) -> bool {
        self.removed.iter().any(|n| n == name) || self.modified.iter().any(|n| n == name)
    }
}
