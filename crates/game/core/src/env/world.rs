//! In-memory collaborator implementations.
//!
//! These back the CLI and the test suites. A real host swaps them for its own
//! scene, localization and tag systems.
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use super::{AssetKind, AssetSink, Localization, PrefabHost, TagCatalog};
use crate::entity::{Prefab, PrefabObject};
use crate::error::HostError;
use crate::ids::{EntityHandle, EntityKey, Namespace, TagHandle};

/// Slot-based object store. Handles are slot indices and are never reused.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PrefabWorld {
    slots: Vec<Option<PrefabObject>>,
}

impl PrefabWorld {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: spawn an active object around `data`.
    pub fn with(mut self, data: Prefab) -> Self {
        self.spawn(PrefabObject::new(data));
        self
    }

    /// Number of live objects.
    pub fn len(&self) -> usize {
        self.slots.iter().flatten().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterates over live objects with their handles.
    pub fn iter(&self) -> impl Iterator<Item = (EntityHandle, &PrefabObject)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| slot.as_ref().map(|o| (EntityHandle(index as u32), o)))
    }

    fn slot_mut(&mut self, handle: EntityHandle) -> Result<&mut PrefabObject, HostError> {
        self.object_mut(handle)
            .ok_or(HostError::MissingObject(handle))
    }
}

impl PrefabHost for PrefabWorld {
    fn object(&self, handle: EntityHandle) -> Option<&PrefabObject> {
        self.slots.get(handle.0 as usize).and_then(Option::as_ref)
    }

    fn object_mut(&mut self, handle: EntityHandle) -> Option<&mut PrefabObject> {
        self.slots.get_mut(handle.0 as usize).and_then(Option::as_mut)
    }

    fn spawn(&mut self, object: PrefabObject) -> EntityHandle {
        let handle = EntityHandle(self.slots.len() as u32);
        self.slots.push(Some(object));
        handle
    }

    fn clone_prefab(&mut self, source: EntityHandle) -> Result<EntityHandle, HostError> {
        let copy = self
            .object(source)
            .cloned()
            .ok_or(HostError::InstantiateFailed(source))?;
        Ok(self.spawn(copy))
    }

    fn set_active(&mut self, handle: EntityHandle, active: bool) -> Result<(), HostError> {
        self.slot_mut(handle)?.active = active;
        Ok(())
    }

    fn mark_persistent(&mut self, handle: EntityHandle) -> Result<(), HostError> {
        self.slot_mut(handle)?.persistent = true;
        Ok(())
    }

    fn destroy(&mut self, handle: EntityHandle) -> Result<(), HostError> {
        let slot = self
            .slots
            .get_mut(handle.0 as usize)
            .ok_or(HostError::MissingObject(handle))?;
        slot.take().map(|_| ()).ok_or(HostError::MissingObject(handle))
    }

    fn handles(&self) -> Vec<EntityHandle> {
        self.iter().map(|(handle, _)| handle).collect()
    }
}

/// Display name and description of one entity.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LocalizedText {
    pub name: String,
    pub description: String,
}

/// Localization store keyed by `(namespace, id)`.
#[derive(Clone, Debug, Default)]
pub struct LocalizationTable {
    entries: BTreeMap<(Namespace, EntityKey), LocalizedText>,
}

impl LocalizationTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds a table from flattened entries.
    pub fn from_entries(
        entries: impl IntoIterator<Item = (Namespace, EntityKey, LocalizedText)>,
    ) -> Self {
        Self {
            entries: entries
                .into_iter()
                .map(|(namespace, key, text)| ((namespace, key), text))
                .collect(),
        }
    }

    /// Flattened entries in key order.
    pub fn entries(&self) -> impl Iterator<Item = (Namespace, &EntityKey, &LocalizedText)> {
        self.entries
            .iter()
            .map(|((namespace, key), text)| (*namespace, key, text))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Localization for LocalizationTable {
    fn set_text(&mut self, namespace: Namespace, key: &EntityKey, name: &str, description: &str) {
        self.entries.insert(
            (namespace, key.clone()),
            LocalizedText {
                name: name.to_owned(),
                description: description.to_owned(),
            },
        );
    }

    fn text(&self, namespace: Namespace, key: &EntityKey) -> Option<&LocalizedText> {
        self.entries.get(&(namespace, key.clone()))
    }
}

/// Tag catalog backed by a name list. A tag's handle is its list position.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TagTable {
    names: Vec<String>,
}

impl TagTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_names<I, S>(names: I) -> Result<Self, HostError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut table = Self::new();
        for name in names {
            table.create_tag(name)?;
        }
        Ok(table)
    }

    /// Returns the handle of `name`, registering it when unknown.
    ///
    /// Fails once every `u16` handle is taken.
    pub fn create_tag(&mut self, name: impl Into<String>) -> Result<TagHandle, HostError> {
        let name = name.into();
        if let Some(handle) = self.resolve_tag(&name) {
            return Ok(handle);
        }
        let Ok(index) = u16::try_from(self.names.len()) else {
            return Err(HostError::TagCapacity(name));
        };
        self.names.push(name);
        Ok(TagHandle(index))
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }
}

impl TagCatalog for TagTable {
    fn resolve_tag(&self, name: &str) -> Option<TagHandle> {
        self.names
            .iter()
            .position(|n| n == name)
            .and_then(|index| u16::try_from(index).ok())
            .map(TagHandle)
    }

    fn tag_name(&self, handle: TagHandle) -> Option<&str> {
        self.names.get(handle.0 as usize).map(String::as_str)
    }
}

/// Asset file handed to an [`AssetManifest`].
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LoadedAsset {
    pub kind: AssetKind,
    pub path: PathBuf,
}

/// Asset sink that records which files were offered and checks they exist.
#[derive(Clone, Debug, Default)]
pub struct AssetManifest {
    loaded: Vec<LoadedAsset>,
}

impl AssetManifest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn loaded(&self) -> &[LoadedAsset] {
        &self.loaded
    }
}

impl AssetSink for AssetManifest {
    fn load_asset(&mut self, kind: AssetKind, path: &Path) -> Result<(), HostError> {
        if !path.is_file() {
            return Err(HostError::Asset {
                path: path.display().to_string(),
                reason: "not a regular file".to_owned(),
            });
        }
        self.loaded.push(LoadedAsset {
            kind,
            path: path.to_path_buf(),
        });
        Ok(())
    }
}
