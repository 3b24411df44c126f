//! World snapshots: a [`PrefabWorld`] plus everything a session knows about it.
//!
//! A snapshot written after loading can be read back and loaded again as a
//! hot reload: the registry and pristine originals survive the round trip.

use std::path::Path;

use patchkit_core::{
    EntityHandle, EntityKey, LocalizationTable, LocalizedText, Namespace, PrefabWorld, TagTable,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::context::PatchContext;
use crate::loaders::{LoadResult, read_file};
use crate::session::ContentSession;

/// Serializable state of an in-memory session.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldSnapshot {
    pub world: PrefabWorld,
    pub tags: TagTable,
    /// Empty when the world was never loaded; objects are indexed on restore.
    pub registry: Vec<(Namespace, EntityKey, EntityHandle)>,
    pub pristine: Vec<(Namespace, EntityKey, EntityHandle)>,
    pub localization: Vec<(Namespace, EntityKey, LocalizedText)>,
}

impl WorldSnapshot {
    /// Snapshot of a bare world with no session state.
    pub fn from_world(world: PrefabWorld, tags: TagTable) -> Self {
        Self {
            world,
            tags,
            ..Self::default()
        }
    }

    pub fn capture(context: &PatchContext<PrefabWorld>) -> Self {
        Self {
            world: context.host.clone(),
            tags: context.tags.clone(),
            registry: context
                .registry
                .entries()
                .map(|(namespace, key, handle)| (namespace, key.clone(), handle))
                .collect(),
            pristine: context
                .pristine
                .entries()
                .map(|(namespace, key, handle)| (namespace, key.clone(), handle))
                .collect(),
            localization: context
                .localization
                .entries()
                .map(|(namespace, key, text)| (namespace, key.clone(), text.clone()))
                .collect(),
        }
    }

    /// Rebuilds a session. A snapshot carrying registry entries resumes as a
    /// hot reload; a bare world starts an initial load.
    pub fn restore(self) -> ContentSession<PrefabWorld> {
        let localization = LocalizationTable::from_entries(self.localization);
        if self.registry.is_empty() {
            return ContentSession::new(self.world, self.tags, localization);
        }

        let mut context = PatchContext::new(self.world, self.tags, localization);
        for (namespace, key, handle) in self.registry {
            if let Err(e) = context.registry.register(namespace, key, handle, true) {
                debug!(target: "content::snapshot", error = %e, "registry entry not restored");
            }
        }
        for (namespace, key, handle) in self.pristine {
            context.pristine.insert_once(namespace, key, handle);
        }
        ContentSession::from_context(context).with_hot_reload(true)
    }

    pub fn load(path: &Path) -> LoadResult<Self> {
        let content = read_file(path)?;
        ron::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Failed to parse world snapshot RON: {}", e))
    }

    pub fn save(&self, path: &Path) -> LoadResult<()> {
        let text = ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .map_err(|e| anyhow::anyhow!("Failed to write world snapshot RON: {}", e))?;
        std::fs::write(path, text)
            .map_err(|e| anyhow::anyhow!("Failed to write {}: {}", path.display(), e))
    }
}

#[cfg(test)]
mod tests {
    use patchkit_core::{Item, Prefab};

    use super::*;
    use crate::template::ItemTemplate;

    #[test]
    fn restored_session_keeps_registry_and_originals() {
        let world = PrefabWorld::new().with(Prefab::Item(Item::new(100, "Sword")));
        let mut session = ContentSession::new(world, TagTable::new(), LocalizationTable::new());
        let mut template = ItemTemplate::new(100).derive_as(200);
        template.name = Some("Fire Sword".into());
        session.load_item(template).unwrap();
        session.load_item(ItemTemplate::new(100)).unwrap();
        session.finish_loading();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("world.ron");
        WorldSnapshot::capture(session.context()).save(&path).unwrap();
        let restored = WorldSnapshot::load(&path).unwrap().restore();

        assert!(restored.is_hot_reload());
        let key = EntityKey::Id(200);
        assert_eq!(
            restored.get(Namespace::Item, &key).unwrap().display_name(),
            "Fire Sword"
        );
        assert!(restored.original(Namespace::Item, &EntityKey::Id(100)).is_some());
    }

    #[test]
    fn bare_world_is_indexed() {
        let world = PrefabWorld::new().with(Prefab::Item(Item::new(100, "Sword")));

        let session = WorldSnapshot::from_world(world, TagTable::new()).restore();

        assert!(!session.is_hot_reload());
        assert!(session.resolve(Namespace::Item, &EntityKey::Id(100)).is_some());
    }
}
