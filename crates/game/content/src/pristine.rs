//! Frozen snapshots of entities taken before their first mutation.

use std::collections::BTreeMap;

use patchkit_core::{EntityHandle, EntityKey, Namespace};

/// Write-once map from identifier to the handle of an inactive, persistent
/// copy of the entity as it was before any template touched it.
#[derive(Clone, Debug, Default)]
pub struct PristineCache {
    snapshots: BTreeMap<(Namespace, EntityKey), EntityHandle>,
}

impl PristineCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, namespace: Namespace, key: &EntityKey) -> Option<EntityHandle> {
        self.snapshots.get(&(namespace, key.clone())).copied()
    }

    pub fn contains(&self, namespace: Namespace, key: &EntityKey) -> bool {
        self.get(namespace, key).is_some()
    }

    /// Stores `snapshot` unless one is already cached. Returns true if stored.
    pub fn insert_once(
        &mut self,
        namespace: Namespace,
        key: EntityKey,
        snapshot: EntityHandle,
    ) -> bool {
        match self.snapshots.entry((namespace, key)) {
            std::collections::btree_map::Entry::Occupied(_) => false,
            std::collections::btree_map::Entry::Vacant(slot) => {
                slot.insert(snapshot);
                true
            }
        }
    }

    pub fn entries(&self) -> impl Iterator<Item = (Namespace, &EntityKey, EntityHandle)> {
        self.snapshots
            .iter()
            .map(|((ns, key), handle)| (*ns, key, *handle))
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_snapshot_wins() {
        let mut cache = PristineCache::new();
        assert!(cache.insert_once(Namespace::Item, EntityKey::Id(100), EntityHandle(3)));
        assert!(!cache.insert_once(Namespace::Item, EntityKey::Id(100), EntityHandle(9)));

        assert_eq!(
            cache.get(Namespace::Item, &EntityKey::Id(100)),
            Some(EntityHandle(3))
        );
        assert_eq!(cache.len(), 1);
    }
}
