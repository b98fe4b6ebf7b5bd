//! ConsumerRegistry - weakly-keyed consumer/forwarder map
//!
//! Maps each attached consumer to its forwarder. Consumers are held weakly;
//! an entry whose consumer was dropped without detach disappears from
//! enumeration lazily and is surfaced through [`ConsumerRegistry::take_defunct`]
//! so its backend registration can be retracted.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::{Arc, RwLock, Weak};

use contracts::{ConsumerId, FrameConsumer};
use tracing::debug;

use crate::error::HubError;
use crate::forwarder::ConsumerForwarder;

/// One registered consumer.
pub(crate) struct RegistryEntry {
    pub(crate) consumer: Weak<dyn FrameConsumer>,
    pub(crate) forwarder: Arc<ConsumerForwarder>,
}

impl RegistryEntry {
    fn is_live(&self) -> bool {
        self.consumer.strong_count() > 0
    }
}

impl std::fmt::Debug for RegistryEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistryEntry")
            .field("consumer_id", self.forwarder.consumer_id())
            .field("registration", &self.forwarder.registration())
            .field("live", &self.is_live())
            .finish()
    }
}

/// Registry of attached consumers, keyed by consumer id.
///
/// Mutation (attach/detach) is caller-serialized; reads during backend event
/// delivery take snapshots, so enumeration tolerates concurrent attach and
/// detach traffic.
#[derive(Default)]
pub struct ConsumerRegistry {
    entries: RwLock<HashMap<ConsumerId, RegistryEntry>>,
}

impl ConsumerRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a consumer/forwarder pair.
    ///
    /// Fails with [`HubError::AlreadyAttached`] if a live entry with the
    /// same id exists, leaving prior state untouched. A dead entry under the
    /// same id is displaced and returned so the caller can retract its
    /// backend registration.
    pub(crate) fn register(
        &self,
        consumer: &Arc<dyn FrameConsumer>,
        forwarder: Arc<ConsumerForwarder>,
    ) -> Result<Option<RegistryEntry>, HubError> {
        let id = consumer.consumer_id().clone();
        let mut entries = self.entries.write().unwrap();

        match entries.entry(id.clone()) {
            Entry::Occupied(mut occupied) => {
                if occupied.get().is_live() {
                    return Err(HubError::already_attached(id));
                }
                debug!(consumer = %id, "displacing defunct registry entry");
                let stale = occupied.insert(RegistryEntry {
                    consumer: Arc::downgrade(consumer),
                    forwarder,
                });
                Ok(Some(stale))
            }
            Entry::Vacant(vacant) => {
                vacant.insert(RegistryEntry {
                    consumer: Arc::downgrade(consumer),
                    forwarder,
                });
                Ok(None)
            }
        }
    }

    /// Remove the entry for `id`, returning it for symmetric backend
    /// teardown. `None` if absent; idempotent.
    pub(crate) fn unregister(&self, id: &str) -> Option<RegistryEntry> {
        self.entries.write().unwrap().remove(id)
    }

    /// Forwarder for a live consumer, if attached.
    pub fn lookup(&self, id: &str) -> Option<Arc<ConsumerForwarder>> {
        let entries = self.entries.read().unwrap();
        entries
            .get(id)
            .filter(|entry| entry.is_live())
            .map(|entry| Arc::clone(&entry.forwarder))
    }

    /// Whether a live consumer with this id is attached.
    pub fn contains(&self, id: &str) -> bool {
        self.lookup(id).is_some()
    }

    /// Snapshot of all live consumers. Entries whose consumers were dropped
    /// are skipped; they are not removed here (see [`Self::take_defunct`]).
    pub fn consumers(&self) -> Vec<Arc<dyn FrameConsumer>> {
        let entries = self.entries.read().unwrap();
        entries
            .values()
            .filter_map(|entry| entry.consumer.upgrade())
            .collect()
    }

    /// Number of live entries.
    pub fn attached_count(&self) -> usize {
        let entries = self.entries.read().unwrap();
        entries.values().filter(|entry| entry.is_live()).count()
    }

    /// Snapshot of live forwarders with their consumer ids.
    pub fn forwarders(&self) -> Vec<(ConsumerId, Arc<ConsumerForwarder>)> {
        let entries = self.entries.read().unwrap();
        entries
            .iter()
            .filter(|(_, entry)| entry.is_live())
            .map(|(id, entry)| (id.clone(), Arc::clone(&entry.forwarder)))
            .collect()
    }

    /// Remove and return every entry whose consumer died without detach.
    pub(crate) fn take_defunct(&self) -> Vec<RegistryEntry> {
        let mut entries = self.entries.write().unwrap();
        let dead_ids: Vec<ConsumerId> = entries
            .iter()
            .filter(|(_, entry)| !entry.is_live())
            .map(|(id, _)| id.clone())
            .collect();

        dead_ids
            .into_iter()
            .filter_map(|id| entries.remove(id.as_str()))
            .collect()
    }

    /// Remove and return every entry, live or dead.
    pub(crate) fn drain(&self) -> Vec<RegistryEntry> {
        let mut entries = self.entries.write().unwrap();
        entries.drain().map(|(_, entry)| entry).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ExecutionContext;
    use crate::resolver::SurfaceResolver;
    use contracts::{DamageRect, SurfaceHandle, SurfaceLookup, TransportToken};

    struct NullLookup;

    impl SurfaceLookup for NullLookup {
        fn lookup_surface(&self, _token: TransportToken) -> Option<SurfaceHandle> {
            None
        }
    }

    struct NamedConsumer {
        id: ConsumerId,
    }

    impl NamedConsumer {
        fn arc(id: &str) -> Arc<dyn FrameConsumer> {
            Arc::new(Self { id: id.into() })
        }
    }

    impl FrameConsumer for NamedConsumer {
        fn consumer_id(&self) -> &ConsumerId {
            &self.id
        }

        fn on_surface_changed(&self, _surface: Option<SurfaceHandle>) {}

        fn on_damage_rect(&self, _rect: DamageRect) {}
    }

    fn forwarder_for(consumer: &Arc<dyn FrameConsumer>) -> Arc<ConsumerForwarder> {
        Arc::new(ConsumerForwarder::new(
            consumer,
            ExecutionContext::spawn("registry_test"),
            SurfaceResolver::new(Arc::new(NullLookup)),
        ))
    }

    #[tokio::test]
    async fn test_register_and_lookup() {
        let registry = ConsumerRegistry::new();
        let consumer = NamedConsumer::arc("a");

        registry
            .register(&consumer, forwarder_for(&consumer))
            .unwrap();

        assert!(registry.contains("a"));
        assert!(registry.lookup("a").is_some());
        assert!(registry.lookup("b").is_none());
        assert_eq!(registry.attached_count(), 1);
    }

    #[tokio::test]
    async fn test_double_register_rejected_state_unchanged() {
        let registry = ConsumerRegistry::new();
        let consumer = NamedConsumer::arc("dup");

        let first = forwarder_for(&consumer);
        let first_registration = first.registration();
        registry.register(&consumer, first).unwrap();

        let err = registry
            .register(&consumer, forwarder_for(&consumer))
            .unwrap_err();
        assert!(matches!(err, HubError::AlreadyAttached { .. }));

        // Original entry survives the rejected call
        let kept = registry.lookup("dup").unwrap();
        assert_eq!(kept.registration(), first_registration);
        assert_eq!(registry.attached_count(), 1);
    }

    #[tokio::test]
    async fn test_unregister_is_idempotent() {
        let registry = ConsumerRegistry::new();
        let consumer = NamedConsumer::arc("once");

        registry
            .register(&consumer, forwarder_for(&consumer))
            .unwrap();

        assert!(registry.unregister("once").is_some());
        assert!(registry.unregister("once").is_none());
        assert_eq!(registry.attached_count(), 0);
    }

    #[tokio::test]
    async fn test_dropped_consumer_leaves_enumeration() {
        let registry = ConsumerRegistry::new();
        let consumer = NamedConsumer::arc("ghost");

        registry
            .register(&consumer, forwarder_for(&consumer))
            .unwrap();
        assert_eq!(registry.consumers().len(), 1);

        drop(consumer);

        assert!(registry.consumers().is_empty());
        assert!(!registry.contains("ghost"));
        assert_eq!(registry.attached_count(), 0);
    }

    #[tokio::test]
    async fn test_dead_entry_displaced_on_reregister() {
        let registry = ConsumerRegistry::new();
        let first = NamedConsumer::arc("reuse");
        let stale_forwarder = forwarder_for(&first);
        let stale_registration = stale_forwarder.registration();

        registry.register(&first, stale_forwarder).unwrap();
        drop(first);

        let second = NamedConsumer::arc("reuse");
        let displaced = registry
            .register(&second, forwarder_for(&second))
            .unwrap()
            .expect("dead entry should be displaced");

        assert_eq!(displaced.forwarder.registration(), stale_registration);
        assert!(registry.contains("reuse"));
    }

    #[tokio::test]
    async fn test_take_defunct_returns_only_dead_entries() {
        let registry = ConsumerRegistry::new();
        let live = NamedConsumer::arc("live");
        let dead = NamedConsumer::arc("dead");

        registry.register(&live, forwarder_for(&live)).unwrap();
        registry.register(&dead, forwarder_for(&dead)).unwrap();
        drop(dead);

        let defunct = registry.take_defunct();
        assert_eq!(defunct.len(), 1);
        assert_eq!(defunct[0].forwarder.consumer_id().as_str(), "dead");

        assert!(registry.contains("live"));
        assert!(registry.lookup("dead").is_none());
    }

    #[tokio::test]
    async fn test_snapshot_set_matches_attach_detach_history() {
        let registry = ConsumerRegistry::new();
        let a = NamedConsumer::arc("a");
        let b = NamedConsumer::arc("b");
        let c = NamedConsumer::arc("c");

        for consumer in [&a, &b, &c] {
            registry.register(consumer, forwarder_for(consumer)).unwrap();
        }
        registry.unregister("b");

        let mut ids: Vec<String> = registry
            .consumers()
            .iter()
            .map(|consumer| consumer.consumer_id().to_string())
            .collect();
        ids.sort();
        assert_eq!(ids, vec!["a", "c"]);
    }
}
