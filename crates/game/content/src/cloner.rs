//! Obtains the mutable object a template writes onto.
//!
//! Two paths exist:
//!
//! - **In place** (`new == target`): the live object itself is patched. Before
//!   the first patch an inactive, persistent copy is cached as the pristine
//!   original.
//! - **Derived** (`new != target`): a fresh copy of the original (pristine when
//!   cached, live otherwise) is registered under the new identifier.

use patchkit_core::{EntityHandle, EntityKey, HostError, Localization, Namespace, PrefabHost, TagCatalog};
use tracing::debug;

use crate::context::PatchContext;
use crate::error::ApplyError;

impl<H, T, L> PatchContext<H, T, L>
where
    H: PrefabHost,
    T: TagCatalog,
    L: Localization,
{
    /// Object to copy from: the pristine snapshot when cached, else the live one.
    pub fn source_handle(
        &self,
        namespace: Namespace,
        target: &EntityKey,
    ) -> Result<EntityHandle, ApplyError> {
        self.pristine
            .get(namespace, target)
            .or_else(|| self.registry.resolve(namespace, target))
            .ok_or_else(|| ApplyError::UnknownTarget {
                namespace,
                id: target.clone(),
            })
    }

    /// Pristine snapshot of `key`, if one was taken.
    pub fn original(&self, namespace: Namespace, key: &EntityKey) -> Option<EntityHandle> {
        self.pristine.get(namespace, key)
    }

    /// Returns the handle a template for `target` should be applied to.
    pub fn obtain_mutable(
        &mut self,
        namespace: Namespace,
        target: &EntityKey,
        new: &EntityKey,
    ) -> Result<EntityHandle, ApplyError> {
        for key in [target, new] {
            if !namespace.accepts(key) {
                return Err(ApplyError::malformed(
                    format!("{namespace} '{key}'"),
                    "identifier has the wrong shape for its namespace",
                ));
            }
        }

        let source = self.source_handle(namespace, target)?;
        if let Some(live) = self.registry.resolve(namespace, target) {
            self.snapshot_once(namespace, target, live)?;
        }

        let handle = if new == target {
            self.registry
                .resolve(namespace, target)
                .ok_or_else(|| ApplyError::UnknownTarget {
                    namespace,
                    id: target.clone(),
                })?
        } else {
            self.derive(namespace, source, new)?
        };

        if let Some(prefab) = self.host.prefab_mut(handle) {
            if prefab.ensure_tag_source() {
                debug!(
                    target: "content::cloner",
                    namespace = %namespace,
                    id = %new,
                    "attached empty tag source"
                );
            }
        }
        Ok(handle)
    }

    /// Caches an inactive, persistent copy of `live` unless one exists.
    fn snapshot_once(
        &mut self,
        namespace: Namespace,
        key: &EntityKey,
        live: EntityHandle,
    ) -> Result<(), ApplyError> {
        if self.pristine.contains(namespace, key) {
            return Ok(());
        }

        let copy = self
            .host
            .clone_prefab(live)
            .map_err(|e| clone_failed(namespace, key, e))?;
        let frozen = self
            .host
            .set_active(copy, false)
            .and_then(|()| self.host.mark_persistent(copy));
        if let Err(e) = frozen {
            let _ = self.host.destroy(copy);
            return Err(clone_failed(namespace, key, e));
        }

        self.pristine.insert_once(namespace, key.clone(), copy);
        debug!(
            target: "content::cloner",
            namespace = %namespace,
            id = %key,
            snapshot = %copy,
            "cached pristine original"
        );
        Ok(())
    }

    fn derive(
        &mut self,
        namespace: Namespace,
        source: EntityHandle,
        new: &EntityKey,
    ) -> Result<EntityHandle, ApplyError> {
        let copy = self
            .host
            .clone_prefab(source)
            .map_err(|e| clone_failed(namespace, new, e))?;

        if let Err(e) = self.prepare_derived(namespace, copy, new) {
            let _ = self.host.destroy(copy);
            return Err(clone_failed(namespace, new, e));
        }

        self.registry.register(namespace, new.clone(), copy, true)?;
        debug!(
            target: "content::cloner",
            namespace = %namespace,
            id = %new,
            source = %source,
            handle = %copy,
            "derived new entity"
        );
        Ok(copy)
    }

    fn prepare_derived(
        &mut self,
        namespace: Namespace,
        copy: EntityHandle,
        new: &EntityKey,
    ) -> Result<(), HostError> {
        self.host.set_active(copy, false)?;

        let object = self
            .host
            .object_mut(copy)
            .ok_or(HostError::MissingObject(copy))?;
        if !object.data.set_key(new) {
            return Err(HostError::IdentifierRejected {
                handle: copy,
                namespace,
            });
        }
        object.object_name = format!("{new}_{}", object.data.display_name());
        object.active = false;

        // The copy carries the source's display text; publish it under the new id.
        self.localization.set_text(
            namespace,
            new,
            object.data.display_name(),
            object.data.description(),
        );

        self.host.mark_persistent(copy)
    }
}

fn clone_failed(namespace: Namespace, key: &EntityKey, source: HostError) -> ApplyError {
    ApplyError::CloneFailed {
        namespace,
        id: key.clone(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use patchkit_core::{
        Item, LocalizationTable, Prefab, PrefabWorld, TagTable,
    };

    use super::*;

    fn context() -> PatchContext<PrefabWorld> {
        let world = PrefabWorld::new().with(Prefab::Item(
            Item::new(100, "Sword").with_description("A plain blade"),
        ));
        let mut cx = PatchContext::new(world, TagTable::new(), LocalizationTable::new());
        cx.index_host();
        cx
    }

    #[test]
    fn in_place_returns_live_handle_and_snapshots_once() {
        let mut cx = context();
        let live = cx.registry.resolve(Namespace::Item, &EntityKey::Id(100)).unwrap();

        let first = cx
            .obtain_mutable(Namespace::Item, &EntityKey::Id(100), &EntityKey::Id(100))
            .unwrap();
        cx.host.item_mut(first).unwrap().value = 10;
        let second = cx
            .obtain_mutable(Namespace::Item, &EntityKey::Id(100), &EntityKey::Id(100))
            .unwrap();

        assert_eq!(first, live);
        assert_eq!(second, live);
        assert_eq!(cx.pristine.len(), 1);

        let original = cx.original(Namespace::Item, &EntityKey::Id(100)).unwrap();
        let frozen = cx.host.object(original).unwrap();
        assert!(!frozen.active);
        assert!(frozen.persistent);
        assert_eq!(cx.host.item(original).unwrap().value, 0);
    }

    #[test]
    fn derived_clone_is_registered_and_named() {
        let mut cx = context();
        let handle = cx
            .obtain_mutable(Namespace::Item, &EntityKey::Id(100), &EntityKey::Id(200))
            .unwrap();

        let object = cx.host.object(handle).unwrap();
        assert_eq!(object.object_name, "200_Sword");
        assert!(!object.active);
        assert_eq!(cx.host.item(handle).unwrap().id, 200);
        assert!(cx.host.item(handle).unwrap().tag_source.is_some());
        assert_eq!(
            cx.registry.resolve(Namespace::Item, &EntityKey::Id(200)),
            Some(handle)
        );
        let text = cx
            .localization
            .text(Namespace::Item, &EntityKey::Id(200))
            .unwrap();
        assert_eq!(text.description, "A plain blade");
    }

    #[test]
    fn derive_copies_pristine_after_in_place_patch() {
        let mut cx = context();
        let live = cx
            .obtain_mutable(Namespace::Item, &EntityKey::Id(100), &EntityKey::Id(100))
            .unwrap();
        cx.host.item_mut(live).unwrap().value = 99;

        let derived = cx
            .obtain_mutable(Namespace::Item, &EntityKey::Id(100), &EntityKey::Id(300))
            .unwrap();

        assert_eq!(cx.host.item(derived).unwrap().value, 0);
    }

    #[test]
    fn unknown_target_registers_nothing() {
        let mut cx = context();
        let err = cx
            .obtain_mutable(Namespace::Item, &EntityKey::Id(7), &EntityKey::Id(8))
            .unwrap_err();

        assert!(matches!(err, ApplyError::UnknownTarget { .. }));
        assert!(!cx.registry.contains(Namespace::Item, &EntityKey::Id(8)));
    }

    #[test]
    fn wrong_key_shape_is_malformed() {
        let mut cx = context();
        let err = cx
            .obtain_mutable(Namespace::Item, &EntityKey::Id(100), &EntityKey::from("x"))
            .unwrap_err();
        assert!(matches!(err, ApplyError::MalformedDocument { .. }));
    }
}
