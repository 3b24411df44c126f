//! Live item prefabs.
//!
//! # Design: Base + Kind Pattern
//!
//! - [`Item`] holds the fields every item has (display text, value, tags, effects)
//! - [`ItemKind`] holds type-specific data (skill costs, weapon damage, ...)
//! - [`ItemExtension`] holds optional components attached to the item's children
//!
//! Template variants target exactly one [`ItemKindTag`], so a skill template is
//! never applied to armor.

use crate::entity::effect::{EffectCondition, EffectTransform};
use crate::ids::{EntityHandle, TagHandle};

/// Item prefab with common fields and type-specific data.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Item {
    pub id: i32,
    pub name: String,
    pub description: String,
    pub value: i32,
    pub weight: f32,
    pub max_durability: i32,
    pub is_pickable: bool,
    pub is_usable: bool,
    pub qty_removed_on_use: i32,
    /// Classification component. Recipe filtering and display assume it exists
    /// on every item the engine touched.
    pub tag_source: Option<TagSource>,
    pub effects: EffectTransform,
    #[cfg_attr(feature = "serde", serde(default))]
    pub extensions: Vec<ItemExtension>,
    pub kind: ItemKind,
}

impl Item {
    /// Creates a basic item with neutral stats.
    pub fn new(id: i32, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            description: String::new(),
            value: 0,
            weight: 0.0,
            max_durability: -1,
            is_pickable: true,
            is_usable: false,
            qty_removed_on_use: 0,
            tag_source: None,
            effects: EffectTransform::default(),
            extensions: Vec::new(),
            kind: ItemKind::Basic,
        }
    }

    /// Builder: set the kind-specific data.
    pub fn with_kind(mut self, kind: ItemKind) -> Self {
        self.kind = kind;
        self
    }

    /// Builder: set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Returns the extension of the given kind, if attached.
    pub fn extension(&self, kind: ExtensionKind) -> Option<&ItemExtension> {
        self.extensions.iter().find(|e| e.kind() == kind)
    }
}

/// Set of tags attached to a tag-bearing entity.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TagSource {
    pub tags: Vec<TagHandle>,
}

/// Item type with type-specific data.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ItemKind {
    /// Plain item without kind-specific data.
    #[default]
    Basic,

    /// Learnable active skill.
    Skill(SkillData),

    /// Equippable weapon.
    Weapon(WeaponData),

    /// Arrows, bullets and other pooled projectiles.
    Ammunition(AmmunitionData),

    /// Equippable armor.
    Armor(ArmorData),

    /// Consumable that teaches a crafting recipe.
    RecipeItem(RecipeItemData),
}

impl ItemKind {
    /// Returns the discriminant used to dispatch templates.
    pub const fn tag(&self) -> ItemKindTag {
        match self {
            Self::Basic => ItemKindTag::Basic,
            Self::Skill(_) => ItemKindTag::Skill,
            Self::Weapon(_) => ItemKindTag::Weapon,
            Self::Ammunition(_) => ItemKindTag::Ammunition,
            Self::Armor(_) => ItemKindTag::Armor,
            Self::RecipeItem(_) => ItemKindTag::RecipeItem,
        }
    }
}

/// Discriminant of [`ItemKind`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display, strum::AsRefStr)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ItemKindTag {
    Basic,
    Skill,
    Weapon,
    Ammunition,
    Armor,
    RecipeItem,
}

/// Skill-specific data.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SkillData {
    pub cooldown: f32,
    pub stamina_cost: f32,
    pub mana_cost: f32,
    pub health_cost: f32,
    pub durability_cost: f32,
    pub durability_cost_percent: f32,
    pub vfx_on_start: bool,
    pub stop_vfx: bool,
    pub start_vfx: Option<VfxKind>,
    pub required_items: Vec<ItemRequirement>,
    /// Rebuilt from the `Activation` groups of the effect tree on every apply.
    pub activation_conditions: Vec<ActivationCondition>,
}

/// Item the skill needs in the caster's inventory.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ItemRequirement {
    pub item: EntityHandle,
    pub quantity: i32,
    pub consume: bool,
}

/// Condition the skill checks before activating.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ActivationCondition {
    /// Name of the effect group the condition was found in.
    pub group: String,
    pub condition: EffectCondition,
    /// Localization key of the "cannot activate" notification.
    pub message_key: String,
}

/// Visual effect systems a skill can play on start.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum VfxKind {
    Fire,
    Frost,
    Lightning,
    Decay,
    Ethereal,
    Heal,
    Smoke,
}

/// Weapon-specific data.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WeaponData {
    pub weapon_type: WeaponType,
    pub damage: Vec<DamageEntry>,
    pub impact: f32,
    pub attack_speed: f32,
    pub health_leech: f32,
}

/// One typed damage amount.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DamageEntry {
    pub kind: DamageKind,
    pub amount: f32,
}

/// Damage types.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, strum::Display, strum::EnumString,
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DamageKind {
    #[default]
    Physical,
    Ethereal,
    Decay,
    Electric,
    Frost,
    Fire,
}

/// Weapon archetypes.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, strum::Display, strum::EnumString,
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum WeaponType {
    #[default]
    Sword1H,
    Sword2H,
    Axe1H,
    Axe2H,
    Mace1H,
    Mace2H,
    Spear,
    Halberd,
    Dagger,
    Bow,
    Pistol,
    Arrow,
    Bullet,
}

/// Ammunition-specific data.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AmmunitionData {
    pub weapon: WeaponData,
    pub pool_capacity: i32,
}

/// Armor-specific data.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ArmorData {
    pub slot: EquipmentSlot,
    pub damage_resistance: f32,
    pub protection: f32,
    pub movement_penalty: f32,
}

/// Equipment slots for armor.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, strum::Display, strum::EnumString,
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EquipmentSlot {
    Helmet,
    #[default]
    Chest,
    Legs,
    Feet,
    Back,
}

/// Recipe item data.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RecipeItemData {
    pub recipe: Option<EntityHandle>,
}

/// Optional components attached to an item's child objects.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ItemExtension {
    Preserver(Preserver),
    CounterAbsorb(CounterAbsorb),
    AddOn(ItemAddOn),
}

impl ItemExtension {
    pub const fn kind(&self) -> ExtensionKind {
        match self {
            Self::Preserver(_) => ExtensionKind::Preserver,
            Self::CounterAbsorb(_) => ExtensionKind::CounterAbsorb,
            Self::AddOn(_) => ExtensionKind::AddOn,
        }
    }
}

/// Discriminant of [`ItemExtension`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display)]
pub enum ExtensionKind {
    Preserver,
    CounterAbsorb,
    AddOn,
}

/// Slows perishing of the items stored in a container.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Preserver {
    pub nullify_perish: bool,
    pub preserved_elements: Vec<PreservedElement>,
}

#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PreservedElement {
    /// Percentage of perishing removed for items with `tag`.
    pub preservation: f32,
    pub tag: TagHandle,
}

/// Counter skill component that soaks incoming damage of some types.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CounterAbsorb {
    pub absorbs: Vec<AbsorbEntry>,
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AbsorbEntry {
    /// Always a boolean condition.
    pub condition: EffectCondition,
    pub damage_types: Vec<DamageKind>,
}

/// Deployable that snaps onto a compatible item and turns into another.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ItemAddOn {
    pub compatible_item: Option<EntityHandle>,
    /// Item the pair becomes once snapped together.
    pub state_item: Option<EntityHandle>,
    pub snapping_radius: f32,
}

impl Default for ItemAddOn {
    fn default() -> Self {
        Self {
            compatible_item: None,
            state_item: None,
            snapping_radius: 1.0,
        }
    }
}
