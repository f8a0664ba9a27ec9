//! Generic two-level store keyed by (context, resource-kind).
//!
//! Used twice by the engine: once for live watch caches (informer lifecycle)
//! and once for their read-only snapshots (current cache contents), so the
//! two lifecycles can be reasoned about independently — an informer may be
//! mid-teardown while its last snapshot is still being read.


use std::collections::HashMap;

use dashmap::DashMap;

/// Two-level concurrent store: context name → resource kind → value.
///
/// The per-context map lives inside one DashMap entry, so
/// [`KeyedRegistry::remove_for_context`] swaps out everything under a context
/// in a single shard operation — concurrent readers observe either the full
/// prior state or the fully-evicted state, never a partial mix.
#[derive(Debug)]
pub struct KeyedRegistry<V> {
    entries: DashMap<String, HashMap<String, V>>,
}

impl<V> Default for KeyedRegistry<V> {
    fn default() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }
}

impl<V: Clone> KeyedRegistry<V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(
        &self,
        context_name: &str,
        kind: &str,
        value: V,
    ) {
        self.entries
            .entry(context_name.to_string())
            .or_default()
            .insert(kind.to_string(), value);
    }

    pub fn get(
        &self,
        context_name: &str,
        kind: &str,
    ) -> Option<V> {
        self.entries.get(context_name).and_then(|kinds| kinds.get(kind).cloned())
    }

    /// Flattened view with context/kind tags attached.
    pub fn get_all(&self) -> Vec<(String, String, V)> {
        self.entries
            .iter()
            .flat_map(|entry| {
                let context_name = entry.key().clone();
                entry
                    .value()
                    .iter()
                    .map(|(kind, value)| (context_name.clone(), kind.clone(), value.clone()))
                    .collect::<Vec<_>>()
            })
            .collect()
    }

    pub fn get_for_context(
        &self,
        context_name: &str,
    ) -> Vec<(String, V)> {
        self.entries
            .get(context_name)
            .map(|kinds| kinds.iter().map(|(kind, value)| (kind.clone(), value.clone())).collect())
            .unwrap_or_default()
    }

    pub fn get_for_contexts_and_kind(
        &self,
        context_names: &[String],
        kind: &str,
    ) -> Vec<(String, V)> {
        context_names
            .iter()
            .filter_map(|name| self.get(name, kind).map(|value| (name.clone(), value)))
            .collect()
    }

    /// Removes every entry under one context atomically with respect to
    /// readers and returns them; the caller disposes disposable values.
    pub fn remove_for_context(
        &self,
        context_name: &str,
    ) -> Vec<(String, V)> {
        self.entries
            .remove(context_name)
            .map(|(_, kinds)| kinds.into_iter().collect())
            .unwrap_or_default()
    }

    pub fn remove(
        &self,
        context_name: &str,
        kind: &str,
    ) -> Option<V> {
        self.entries.get_mut(context_name).and_then(|mut kinds| kinds.remove(kind))
    }

    pub fn len(&self) -> usize {
        self.entries.iter().map(|entry| entry.value().len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
