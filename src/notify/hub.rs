use std::hash::Hash;
use std::sync::Arc;

use dashmap::DashMap;
use tracing::debug;

use super::Coalescer;
use super::Observer;
use crate::NotifyConfig;

/// Fan-out point between the engine and an external publication layer.
///
/// One [`Coalescer`] per (signal kind, observer id) pair: a burst of
/// publishes for one kind yields exactly one callback per subscribed
/// observer, carrying the latest payload.
pub struct NotificationHub<K, T> {
    config: NotifyConfig,
    pairs: DashMap<(K, String), Arc<Coalescer<T>>>,
}

impl<K, T> NotificationHub<K, T>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    T: Clone + Send + 'static,
{
    pub fn new(config: NotifyConfig) -> Self {
        Self {
            config,
            pairs: DashMap::new(),
        }
    }

    /// Registers an observer callback for one signal kind. Re-subscribing
    /// the same (kind, observer) pair replaces the previous callback.
    pub fn subscribe(
        &self,
        kind: K,
        observer_id: &str,
        observer: Observer<T>,
    ) {
        let coalescer = Arc::new(Coalescer::new(&self.config, observer));
        if let Some(previous) = self.pairs.insert((kind, observer_id.to_string()), coalescer) {
            previous.dispose();
        }
    }

    pub fn unsubscribe(
        &self,
        kind: &K,
        observer_id: &str,
    ) {
        if let Some((_, coalescer)) = self.pairs.remove(&(kind.clone(), observer_id.to_string())) {
            coalescer.dispose();
        }
    }

    /// Removes every subscription of one observer.
    pub fn unsubscribe_observer(
        &self,
        observer_id: &str,
    ) {
        self.pairs.retain(|(_, id), coalescer| {
            if id == observer_id {
                coalescer.dispose();
                false
            } else {
                true
            }
        });
    }

    /// Dispatches the payload to every observer of this kind, coalesced
    /// per pair.
    pub fn publish(
        &self,
        kind: &K,
        payload: T,
    ) {
        for entry in self.pairs.iter() {
            if &entry.key().0 == kind {
                entry.value().dispatch(payload.clone());
            }
        }
    }

    pub fn subscription_count(&self) -> usize {
        self.pairs.len()
    }

    /// Drops all subscriptions and pending publishes. Idempotent.
    pub fn dispose(&self) {
        debug!("disposing notification hub with {} subscriptions", self.pairs.len());
        self.pairs.retain(|_, coalescer| {
            coalescer.dispose();
            false
        });
    }
}
