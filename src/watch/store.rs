use dashmap::DashMap;

use crate::ApiObject;
use crate::ObjectRef;

/// Queryable snapshot of one (context, kind) cache.
///
/// Shared between the owning [`super::WatchCache`] and the engine's snapshot
/// registry; the registry owner decides when the snapshot stops being
/// visible, the cache only mutates it.
#[derive(Debug, Default)]
pub struct ObjectStore {
    objects: DashMap<ObjectRef, ApiObject>,
}

impl ObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true when the object was not present before (membership
    /// change, as opposed to an in-place update).
    pub fn apply(
        &self,
        object: ApiObject,
    ) -> bool {
        self.objects.insert(object.object_ref(), object).is_none()
    }

    pub fn remove(
        &self,
        object_ref: &ObjectRef,
    ) -> Option<ApiObject> {
        self.objects.remove(object_ref).map(|(_, obj)| obj)
    }

    pub fn list(&self) -> Vec<ApiObject> {
        self.objects.iter().map(|entry| entry.value().clone()).collect()
    }

    /// Exact lookup when a namespace is given, first name match otherwise.
    pub fn get(
        &self,
        name: &str,
        namespace: Option<&str>,
    ) -> Option<ApiObject> {
        match namespace {
            Some(ns) => self
                .objects
                .get(&ObjectRef::new(name, Some(ns.to_string())))
                .map(|entry| entry.value().clone()),
            None => self
                .objects
                .iter()
                .find(|entry| entry.key().name == name)
                .map(|entry| entry.value().clone()),
        }
    }

    pub fn contains(
        &self,
        object_ref: &ObjectRef,
    ) -> bool {
        self.objects.contains_key(object_ref)
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn clear(&self) {
        self.objects.clear();
    }
}
