//! Live object graph owned by the host.
//!
//! Every object the host manages is a [`PrefabObject`]: host-level flags (name,
//! active, persistent) wrapped around one [`Prefab`] variant. Templates never
//! see host flags; they mutate the prefab data through the typed accessors.
mod effect;
mod item;
mod recipe;
mod status;

pub use effect::{
    ConditionKind, Effect, EffectCondition, EffectTransform, ROOT_TRANSFORM, WeaponSlot,
};
pub use item::{
    AbsorbEntry, ActivationCondition, AmmunitionData, ArmorData, CounterAbsorb, DamageEntry,
    DamageKind, EquipmentSlot, ExtensionKind, Item, ItemAddOn, ItemExtension, ItemKind,
    ItemKindTag, ItemRequirement, PreservedElement, Preserver, RecipeItemData, SkillData,
    TagSource, VfxKind, WeaponData, WeaponType,
};
pub use recipe::{Character, CraftingStation, Enchantment, Ingredient, Recipe, RecipeResult};
pub use status::{ImbuePreset, StatusEffect};

use crate::ids::{EntityKey, Namespace};

/// Object as stored by the host: scene flags plus prefab data.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PrefabObject {
    /// Scene object name. Derived clones are named `"{new_id}_{name}"`.
    pub object_name: String,
    pub active: bool,
    /// Persistent objects survive scene unloads.
    pub persistent: bool,
    pub data: Prefab,
}

impl PrefabObject {
    /// Wraps prefab data in an active, non-persistent object named after it.
    pub fn new(data: Prefab) -> Self {
        Self {
            object_name: data.display_name().to_owned(),
            active: true,
            persistent: false,
            data,
        }
    }
}

/// Prefab data, one variant per identifier namespace.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Prefab {
    Item(Item),
    StatusEffect(StatusEffect),
    ImbuePreset(ImbuePreset),
    Recipe(Recipe),
    Enchantment(Enchantment),
    Character(Character),
}

impl Prefab {
    /// Namespace whose registry table holds this prefab.
    pub const fn namespace(&self) -> Namespace {
        match self {
            Self::Item(_) => Namespace::Item,
            Self::StatusEffect(_) => Namespace::StatusEffect,
            Self::ImbuePreset(_) => Namespace::EffectPreset,
            Self::Recipe(_) => Namespace::Recipe,
            Self::Enchantment(_) => Namespace::Enchantment,
            Self::Character(_) => Namespace::Character,
        }
    }

    /// Human-readable variant name used in error messages.
    pub const fn kind_name(&self) -> &'static str {
        match self {
            Self::Item(item) => match item.kind.tag() {
                ItemKindTag::Basic => "Item",
                ItemKindTag::Skill => "Skill",
                ItemKindTag::Weapon => "Weapon",
                ItemKindTag::Ammunition => "Ammunition",
                ItemKindTag::Armor => "Armor",
                ItemKindTag::RecipeItem => "RecipeItem",
            },
            Self::StatusEffect(_) => "StatusEffect",
            Self::ImbuePreset(_) => "ImbuePreset",
            Self::Recipe(_) => "Recipe",
            Self::Enchantment(_) => "Enchantment",
            Self::Character(_) => "Character",
        }
    }

    /// Identifier stored on the prefab itself.
    pub fn key(&self) -> EntityKey {
        match self {
            Self::Item(item) => EntityKey::Id(item.id),
            Self::StatusEffect(status) => EntityKey::Name(status.identifier.clone()),
            Self::ImbuePreset(preset) => EntityKey::Id(preset.preset_id),
            Self::Recipe(recipe) => EntityKey::Name(recipe.uid.clone()),
            Self::Enchantment(enchantment) => EntityKey::Id(enchantment.id),
            Self::Character(character) => EntityKey::Name(character.uid.clone()),
        }
    }

    /// Writes `key` into the prefab. Returns false when the key has the wrong
    /// shape for this namespace; the prefab is left untouched in that case.
    pub fn set_key(&mut self, key: &EntityKey) -> bool {
        match (self, key) {
            (Self::Item(item), EntityKey::Id(id)) => item.id = *id,
            (Self::ImbuePreset(preset), EntityKey::Id(id)) => preset.preset_id = *id,
            (Self::Enchantment(enchantment), EntityKey::Id(id)) => enchantment.id = *id,
            (Self::StatusEffect(status), EntityKey::Name(name)) => {
                status.identifier = name.clone()
            }
            (Self::Recipe(recipe), EntityKey::Name(name)) => recipe.uid = name.clone(),
            (Self::Character(character), EntityKey::Name(name)) => {
                character.uid = name.clone()
            }
            _ => return false,
        }
        true
    }

    pub fn display_name(&self) -> &str {
        match self {
            Self::Item(item) => &item.name,
            Self::StatusEffect(status) => &status.name,
            Self::ImbuePreset(preset) => &preset.name,
            Self::Recipe(recipe) => &recipe.name,
            Self::Enchantment(enchantment) => &enchantment.name,
            Self::Character(character) => &character.name,
        }
    }

    /// Description, empty for prefabs that carry none.
    pub fn description(&self) -> &str {
        match self {
            Self::Item(item) => &item.description,
            Self::StatusEffect(status) => &status.description,
            Self::ImbuePreset(preset) => &preset.description,
            Self::Enchantment(enchantment) => &enchantment.description,
            Self::Recipe(_) | Self::Character(_) => "",
        }
    }

    /// Attaches an empty tag source to tag-bearing kinds that have none.
    /// Returns true if one was added.
    pub fn ensure_tag_source(&mut self) -> bool {
        let slot = match self {
            Self::Item(item) => &mut item.tag_source,
            Self::StatusEffect(status) => &mut status.tag_source,
            _ => return false,
        };
        if slot.is_some() {
            return false;
        }
        *slot = Some(TagSource::default());
        true
    }

    pub fn as_item(&self) -> Option<&Item> {
        match self {
            Self::Item(item) => Some(item),
            _ => None,
        }
    }

    pub fn as_item_mut(&mut self) -> Option<&mut Item> {
        match self {
            Self::Item(item) => Some(item),
            _ => None,
        }
    }

    pub fn as_status_effect(&self) -> Option<&StatusEffect> {
        match self {
            Self::StatusEffect(status) => Some(status),
            _ => None,
        }
    }

    pub fn as_status_effect_mut(&mut self) -> Option<&mut StatusEffect> {
        match self {
            Self::StatusEffect(status) => Some(status),
            _ => None,
        }
    }

    pub fn as_imbue_preset(&self) -> Option<&ImbuePreset> {
        match self {
            Self::ImbuePreset(preset) => Some(preset),
            _ => None,
        }
    }

    pub fn as_imbue_preset_mut(&mut self) -> Option<&mut ImbuePreset> {
        match self {
            Self::ImbuePreset(preset) => Some(preset),
            _ => None,
        }
    }

    pub fn as_recipe(&self) -> Option<&Recipe> {
        match self {
            Self::Recipe(recipe) => Some(recipe),
            _ => None,
        }
    }

    pub fn as_recipe_mut(&mut self) -> Option<&mut Recipe> {
        match self {
            Self::Recipe(recipe) => Some(recipe),
            _ => None,
        }
    }

    pub fn as_enchantment_mut(&mut self) -> Option<&mut Enchantment> {
        match self {
            Self::Enchantment(enchantment) => Some(enchantment),
            _ => None,
        }
    }

    pub fn as_character_mut(&mut self) -> Option<&mut Character> {
        match self {
            Self::Character(character) => Some(character),
            _ => None,
        }
    }
}
