//! Contracts of the host engine collaborators.
//!
//! The content engine never owns live objects. It reaches them through
//! [`PrefabHost`], pushes display text through [`Localization`], resolves tag
//! names through [`TagCatalog`], and hands raw asset files to [`AssetSink`].
//! [`world`] provides in-memory implementations used by tools and tests.
mod world;

pub use world::{
    AssetManifest, LoadedAsset, LocalizationTable, LocalizedText, PrefabWorld, TagTable,
};

use std::path::Path;

use crate::entity::{ImbuePreset, Item, Prefab, PrefabObject, Recipe, StatusEffect};
use crate::error::HostError;
use crate::ids::{EntityHandle, EntityKey, Namespace, TagHandle};

/// Object store of the host engine.
pub trait PrefabHost {
    fn object(&self, handle: EntityHandle) -> Option<&PrefabObject>;

    fn object_mut(&mut self, handle: EntityHandle) -> Option<&mut PrefabObject>;

    /// Adds a new object and returns its handle.
    fn spawn(&mut self, object: PrefabObject) -> EntityHandle;

    /// Instantiates an independent deep copy of `source`.
    fn clone_prefab(&mut self, source: EntityHandle) -> Result<EntityHandle, HostError>;

    fn set_active(&mut self, handle: EntityHandle, active: bool) -> Result<(), HostError>;

    fn mark_persistent(&mut self, handle: EntityHandle) -> Result<(), HostError>;

    fn destroy(&mut self, handle: EntityHandle) -> Result<(), HostError>;

    /// Handles of every live object, in spawn order.
    fn handles(&self) -> Vec<EntityHandle>;

    fn prefab(&self, handle: EntityHandle) -> Option<&Prefab> {
        self.object(handle).map(|object| &object.data)
    }

    fn prefab_mut(&mut self, handle: EntityHandle) -> Option<&mut Prefab> {
        self.object_mut(handle).map(|object| &mut object.data)
    }

    fn item(&self, handle: EntityHandle) -> Option<&Item> {
        self.prefab(handle).and_then(Prefab::as_item)
    }

    fn item_mut(&mut self, handle: EntityHandle) -> Option<&mut Item> {
        self.prefab_mut(handle).and_then(Prefab::as_item_mut)
    }

    fn status_effect(&self, handle: EntityHandle) -> Option<&StatusEffect> {
        self.prefab(handle).and_then(Prefab::as_status_effect)
    }

    fn imbue_preset(&self, handle: EntityHandle) -> Option<&ImbuePreset> {
        self.prefab(handle).and_then(Prefab::as_imbue_preset)
    }

    fn recipe(&self, handle: EntityHandle) -> Option<&Recipe> {
        self.prefab(handle).and_then(Prefab::as_recipe)
    }
}

/// Display text store keyed by namespace and identifier.
pub trait Localization {
    fn set_text(&mut self, namespace: Namespace, key: &EntityKey, name: &str, description: &str);

    fn text(&self, namespace: Namespace, key: &EntityKey) -> Option<&LocalizedText>;
}

/// Tag name lookup.
pub trait TagCatalog {
    fn resolve_tag(&self, name: &str) -> Option<TagHandle>;

    fn tag_name(&self, handle: TagHandle) -> Option<&str>;
}

/// Raw asset kinds a pack can ship.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display, strum::EnumString, strum::AsRefStr,
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AssetKind {
    AssetBundle,
    AudioClip,
    Texture,
}

/// Receives asset files found in a pack. Decoding them is the host's concern.
pub trait AssetSink {
    fn load_asset(&mut self, kind: AssetKind, path: &Path) -> Result<(), HostError>;
}
