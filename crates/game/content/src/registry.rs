//! Identifier registry: `(namespace, id) -> handle`.

use std::collections::{BTreeMap, HashMap};

use patchkit_core::{EntityHandle, EntityKey, Namespace};
use tracing::debug;

use crate::error::ApplyError;

/// One table per namespace plus a reverse index used by extraction.
///
/// Overwriting an identifier only repoints the table. Objects that copied the
/// old handle keep pointing at the old object.
#[derive(Clone, Debug, Default)]
pub struct Registry {
    tables: BTreeMap<Namespace, BTreeMap<EntityKey, EntityHandle>>,
    reverse: HashMap<EntityHandle, (Namespace, EntityKey)>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn resolve(&self, namespace: Namespace, key: &EntityKey) -> Option<EntityHandle> {
        self.tables.get(&namespace)?.get(key).copied()
    }

    pub fn contains(&self, namespace: Namespace, key: &EntityKey) -> bool {
        self.resolve(namespace, key).is_some()
    }

    /// Maps `key` to `handle`.
    ///
    /// Without `overwrite` an existing entry fails with `DuplicateIdentifier`
    /// and the table is left unchanged. With it the previous handle is
    /// returned.
    pub fn register(
        &mut self,
        namespace: Namespace,
        key: EntityKey,
        handle: EntityHandle,
        overwrite: bool,
    ) -> Result<Option<EntityHandle>, ApplyError> {
        let table = self.tables.entry(namespace).or_default();
        if !overwrite && table.contains_key(&key) {
            return Err(ApplyError::DuplicateIdentifier { namespace, id: key });
        }

        let previous = table.insert(key.clone(), handle);
        if let Some(old) = previous {
            if self.reverse.get(&old).is_some_and(|(ns, k)| *ns == namespace && *k == key) {
                self.reverse.remove(&old);
            }
        }
        debug!(
            target: "content::registry",
            namespace = %namespace,
            id = %key,
            handle = %handle,
            replaced = previous.is_some(),
            "registered identifier"
        );
        self.reverse.insert(handle, (namespace, key));
        Ok(previous)
    }

    /// Identifier currently registered for `handle`, if any.
    pub fn key_of(&self, handle: EntityHandle) -> Option<(Namespace, &EntityKey)> {
        self.reverse.get(&handle).map(|(ns, key)| (*ns, key))
    }

    /// All entries, ordered by namespace then identifier.
    pub fn entries(&self) -> impl Iterator<Item = (Namespace, &EntityKey, EntityHandle)> {
        self.tables.iter().flat_map(|(ns, table)| {
            table.iter().map(move |(key, handle)| (*ns, key, *handle))
        })
    }

    /// Number of entries in one namespace.
    pub fn len(&self, namespace: Namespace) -> usize {
        self.tables.get(&namespace).map_or(0, BTreeMap::len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_without_overwrite_is_rejected() {
        let mut registry = Registry::new();
        registry
            .register(Namespace::Item, EntityKey::Id(100), EntityHandle(0), false)
            .unwrap();

        let err = registry
            .register(Namespace::Item, EntityKey::Id(100), EntityHandle(1), false)
            .unwrap_err();

        assert!(matches!(err, ApplyError::DuplicateIdentifier { .. }));
        assert_eq!(
            registry.resolve(Namespace::Item, &EntityKey::Id(100)),
            Some(EntityHandle(0))
        );
    }

    #[test]
    fn overwrite_repoints_and_updates_reverse_index() {
        let mut registry = Registry::new();
        registry
            .register(Namespace::Item, EntityKey::Id(100), EntityHandle(0), false)
            .unwrap();
        let previous = registry
            .register(Namespace::Item, EntityKey::Id(100), EntityHandle(5), true)
            .unwrap();

        assert_eq!(previous, Some(EntityHandle(0)));
        assert!(registry.key_of(EntityHandle(0)).is_none());
        assert_eq!(
            registry.key_of(EntityHandle(5)),
            Some((Namespace::Item, &EntityKey::Id(100)))
        );
    }

    #[test]
    fn namespaces_are_independent() {
        let mut registry = Registry::new();
        registry
            .register(Namespace::Item, EntityKey::Id(1), EntityHandle(0), false)
            .unwrap();
        registry
            .register(Namespace::EffectPreset, EntityKey::Id(1), EntityHandle(1), false)
            .unwrap();

        assert_eq!(registry.len(Namespace::Item), 1);
        assert_eq!(registry.len(Namespace::EffectPreset), 1);
        assert_eq!(registry.entries().count(), 2);
    }
}
