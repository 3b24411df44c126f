//! Crafting recipes, enchantments and characters.

use crate::entity::effect::EffectTransform;
use crate::ids::{EntityHandle, TagHandle};

/// Crafting recipe keyed by a string UID.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Recipe {
    pub uid: String,
    pub name: String,
    pub station: CraftingStation,
    pub ingredients: Vec<Ingredient>,
    pub results: Vec<RecipeResult>,
}

impl Recipe {
    pub fn new(uid: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            ..Self::default()
        }
    }
}

/// Station a recipe is crafted at.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CraftingStation {
    #[default]
    Survival,
    Cooking,
    Alchemy,
}

/// One ingredient slot. Either a specific item or any item carrying a tag.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Ingredient {
    Item(EntityHandle),
    Tag(TagHandle),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RecipeResult {
    pub item: EntityHandle,
    pub quantity: i32,
}

/// Enchantment applied to compatible equipment.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Enchantment {
    pub id: i32,
    pub name: String,
    pub description: String,
    pub compatible_items: Vec<EntityHandle>,
    pub damage_bonus: f32,
    pub effects: EffectTransform,
}

/// Spawnable character definition.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Character {
    pub uid: String,
    pub name: String,
    pub health: f32,
    pub faction: String,
    pub equipment: Vec<EntityHandle>,
}
