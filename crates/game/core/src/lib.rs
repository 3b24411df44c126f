//! Live entity graph and host contracts shared by the content engine and tools.
//!
//! `patchkit-core` describes what the host engine owns: prefab objects
//! (items, status effects, imbue presets, recipes, enchantments, characters),
//! their nested effect trees, and the collaborator traits the content engine
//! uses to reach them. It contains no template logic; see `patchkit-content`.
pub mod entity;
pub mod env;
pub mod error;
pub mod ids;

pub use entity::{
    AbsorbEntry, ActivationCondition, AmmunitionData, ArmorData, Character, ConditionKind,
    CounterAbsorb, CraftingStation, DamageEntry, DamageKind, Effect, EffectCondition,
    EffectTransform, Enchantment, EquipmentSlot, ExtensionKind, ImbuePreset, Ingredient, Item,
    ItemAddOn, ItemExtension, ItemKind, ItemKindTag, ItemRequirement, Prefab, PrefabObject,
    PreservedElement, Preserver, ROOT_TRANSFORM, Recipe, RecipeItemData, RecipeResult, SkillData,
    StatusEffect, TagSource, VfxKind, WeaponData, WeaponSlot, WeaponType,
};
pub use env::{
    AssetKind, AssetManifest, AssetSink, LoadedAsset, Localization, LocalizationTable,
    LocalizedText, PrefabHost, PrefabWorld, TagCatalog, TagTable,
};
pub use error::{ContentError, ErrorSeverity, HostError};
pub use ids::{EntityHandle, EntityKey, Namespace, TagHandle};
