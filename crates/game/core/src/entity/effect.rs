//! Live effect and condition trees.
//!
//! An entity carries one root [`EffectTransform`]. The root holds named child
//! groups (for example `"Effects"`, `"Activation"`, `"Hit"`), groups may nest,
//! and every group holds its own leaf effects and conditions in insertion order.

use crate::ids::EntityHandle;

/// Name given to the root transform of every entity.
pub const ROOT_TRANSFORM: &str = "Root";

/// A named node of the live effect tree.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EffectTransform {
    pub name: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub effects: Vec<Effect>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub conditions: Vec<EffectCondition>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub children: Vec<EffectTransform>,
}

impl Default for EffectTransform {
    fn default() -> Self {
        Self::new(ROOT_TRANSFORM)
    }
}

impl EffectTransform {
    /// Creates an empty group.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            effects: Vec::new(),
            conditions: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Returns the first direct child group with the given name.
    pub fn child(&self, name: &str) -> Option<&EffectTransform> {
        self.children.iter().find(|c| c.name == name)
    }

    /// Returns the child group with the given name, creating it at the end
    /// of the child list when it does not exist.
    pub fn child_or_insert(&mut self, name: &str) -> &mut EffectTransform {
        let index = match self.children.iter().position(|c| c.name == name) {
            Some(index) => index,
            None => {
                self.children.push(EffectTransform::new(name));
                self.children.len() - 1
            }
        };
        &mut self.children[index]
    }

    /// Number of leaves (effects and conditions) held directly by this group.
    pub fn leaf_count(&self) -> usize {
        self.effects.len() + self.conditions.len()
    }

    /// Removes the leaves held directly by this group. Child groups are kept.
    pub fn clear_leaves(&mut self) {
        self.effects.clear();
        self.conditions.clear();
    }

    /// Returns true if neither this group nor any descendant holds a leaf.
    pub fn is_empty(&self) -> bool {
        self.leaf_count() == 0 && self.children.iter().all(EffectTransform::is_empty)
    }

    /// Collects every condition held by this group and its descendants,
    /// depth-first, in document order.
    pub fn conditions_in_children(&self) -> Vec<&EffectCondition> {
        let mut out: Vec<&EffectCondition> = self.conditions.iter().collect();
        for child in &self.children {
            out.extend(child.conditions_in_children());
        }
        out
    }
}

/// Leaf effect attached to a group.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Effect {
    /// Applies a status effect outright.
    AddStatusEffect {
        status: Option<EntityHandle>,
        chance_to_contract: i32,
    },

    /// Adds build-up towards a status effect.
    AddStatusEffectBuildUp {
        status: Option<EntityHandle>,
        buildup: f32,
    },

    /// Removes a status effect from the affected character.
    RemoveStatusEffect { status: Option<EntityHandle> },

    /// Restores or drains health.
    AffectHealth { quantity: f32 },

    /// Restores or drains stamina.
    AffectStamina { quantity: f32 },

    /// Restores or drains the fatigue need.
    AffectFatigue { quantity: f32 },

    /// Imbues the wielded weapon with an effect preset.
    AddImbue {
        preset: Option<EntityHandle>,
        lifespan: f32,
    },
}

/// Weapon slot inspected by imbue conditions.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, strum::Display, strum::EnumString,
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum WeaponSlot {
    #[default]
    MainHand,
    OffHand,
}

/// Leaf condition attached to a group.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EffectCondition {
    pub invert: bool,
    pub kind: ConditionKind,
}

/// Condition variants.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ConditionKind {
    /// Holds when the checked weapon carries `preset` (or any imbue).
    ImbueEffect {
        preset: Option<EntityHandle>,
        any_imbue: bool,
        weapon_to_check: WeaponSlot,
    },

    /// Holds when the character has the status effect.
    StatusEffect { status: Option<EntityHandle> },

    /// Holds with the given percent chance.
    Probability { chance_percent: i32 },

    /// Constant condition.
    Boolean { valid: bool },

    /// Holds once the wind altar has been activated.
    WindAltarActivated,
}
