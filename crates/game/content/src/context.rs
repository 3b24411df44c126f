//! Explicit state shared by every template operation.

use patchkit_core::{
    EntityHandle, EntityKey, Localization, LocalizationTable, Namespace, Prefab, PrefabHost,
    TagCatalog, TagHandle, TagTable,
};
use tracing::warn;

use crate::error::ApplyError;
use crate::pristine::PristineCache;
use crate::registry::Registry;

/// Default nesting limit for effect groups in one document.
pub const DEFAULT_MAX_EFFECT_DEPTH: usize = 16;

/// Host collaborators plus the registry and pristine cache.
///
/// Everything the engine mutates is reachable from here, so a session can be
/// captured or torn down without hidden globals.
pub struct PatchContext<H, T = TagTable, L = LocalizationTable> {
    pub host: H,
    pub registry: Registry,
    pub pristine: PristineCache,
    pub tags: T,
    pub localization: L,
    pub max_effect_depth: usize,
}

impl<H, T, L> PatchContext<H, T, L>
where
    H: PrefabHost,
    T: TagCatalog,
    L: Localization,
{
    pub fn new(host: H, tags: T, localization: L) -> Self {
        Self {
            host,
            registry: Registry::new(),
            pristine: PristineCache::new(),
            tags,
            localization,
            max_effect_depth: DEFAULT_MAX_EFFECT_DEPTH,
        }
    }

    /// Registers every live object under the identifier stored on it.
    ///
    /// Objects whose identifier is already taken are skipped with a warning.
    pub fn index_host(&mut self) -> usize {
        let mut indexed = 0;
        for handle in self.host.handles() {
            let Some(prefab) = self.host.prefab(handle) else {
                continue;
            };
            let (namespace, key) = (prefab.namespace(), prefab.key());
            match self.registry.register(namespace, key, handle, false) {
                Ok(_) => indexed += 1,
                Err(e) => warn!(
                    target: "content::registry",
                    handle = %handle,
                    error = %e,
                    "skipping object with a duplicate identifier"
                ),
            }
        }
        indexed
    }

    /// Splits the context into the prefab behind `handle` and an
    /// [`ApplyContext`] borrowing the rest.
    pub fn target(
        &mut self,
        handle: EntityHandle,
    ) -> Result<(&mut Prefab, ApplyContext<'_>), ApplyError> {
        let prefab = self
            .host
            .prefab_mut(handle)
            .ok_or(ApplyError::MissingHandle(handle))?;
        let cx = ApplyContext {
            registry: &self.registry,
            tags: &self.tags,
            localization: &mut self.localization,
            max_depth: self.max_effect_depth,
        };
        Ok((prefab, cx))
    }

    /// Read-only view used by extraction.
    pub fn extract_context(&self) -> ExtractContext<'_> {
        ExtractContext {
            registry: &self.registry,
            tags: &self.tags,
        }
    }
}

/// Collaborators available while a template writes onto a live prefab.
pub struct ApplyContext<'a> {
    pub registry: &'a Registry,
    pub tags: &'a dyn TagCatalog,
    pub localization: &'a mut dyn Localization,
    pub max_depth: usize,
}

impl ApplyContext<'_> {
    /// Resolves a cross-reference. Unresolved references are logged and
    /// reported as `None` so the caller skips only the dependent field.
    pub fn resolve_ref(
        &self,
        namespace: Namespace,
        key: &EntityKey,
        field: &'static str,
    ) -> Option<EntityHandle> {
        let handle = self.registry.resolve(namespace, key);
        if handle.is_none() {
            warn!(
                target: "content::template",
                namespace = %namespace,
                id = %key,
                field,
                "unresolved reference, field skipped"
            );
        }
        handle
    }

    /// Resolves a tag name, logging unknown tags.
    pub fn resolve_tag(&self, name: &str) -> Option<TagHandle> {
        let handle = self.tags.resolve_tag(name);
        if handle.is_none() {
            warn!(target: "content::template", tag = name, "unknown tag skipped");
        }
        handle
    }
}

/// Collaborators available while a live prefab is turned back into a template.
pub struct ExtractContext<'a> {
    pub registry: &'a Registry,
    pub tags: &'a dyn TagCatalog,
}

impl ExtractContext<'_> {
    /// Identifier of a referenced entity.
    pub fn key_of(&self, handle: EntityHandle) -> Option<&EntityKey> {
        let key = self.registry.key_of(handle).map(|(_, key)| key);
        if key.is_none() {
            warn!(
                target: "content::template",
                handle = %handle,
                "reference to an unregistered object extracted as empty"
            );
        }
        key
    }

    /// String identifier of a referenced entity, or `""` when unknown.
    pub fn name_of(&self, handle: Option<EntityHandle>) -> String {
        handle
            .and_then(|h| self.key_of(h))
            .and_then(EntityKey::as_name)
            .unwrap_or_default()
            .to_owned()
    }

    /// Integer identifier of a referenced entity, or `-1` when unknown.
    pub fn id_of(&self, handle: Option<EntityHandle>) -> i32 {
        handle
            .and_then(|h| self.key_of(h))
            .and_then(EntityKey::as_id)
            .unwrap_or(-1)
    }

    pub fn tag_name(&self, handle: TagHandle) -> Option<String> {
        self.tags.tag_name(handle).map(str::to_owned)
    }
}
