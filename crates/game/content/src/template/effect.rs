//! Effect and condition templates.
//!
//! Leaves are never patched in place: the merge engine builds a fresh leaf
//! with [`EffectTemplate::new_leaf`] and writes the template onto it. Fields
//! left out of a leaf therefore keep the defaults of a new component.

use patchkit_core::{ConditionKind, Effect, EffectCondition, EffectTransform, Namespace, WeaponSlot};
use serde::{Deserialize, Serialize};

use super::{TemplateNode, assign};
use crate::context::{ApplyContext, ExtractContext};
use crate::error::ApplyError;

/// One named group of the effect tree.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct EffectTransformTemplate {
    pub transform_name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub effects: Vec<EffectTemplate>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub effect_conditions: Vec<ConditionTemplate>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub child_effects: Vec<EffectTransformTemplate>,
}

impl EffectTransformTemplate {
    pub fn new(transform_name: impl Into<String>) -> Self {
        Self {
            transform_name: transform_name.into(),
            ..Self::default()
        }
    }

    /// Nesting depth, counting this group as one.
    pub fn depth(&self) -> usize {
        1 + self
            .child_effects
            .iter()
            .map(EffectTransformTemplate::depth)
            .max()
            .unwrap_or(0)
    }

    /// Serializes a live group. Empty child groups are dropped.
    pub fn extract(source: &EffectTransform, cx: &ExtractContext<'_>) -> Self {
        Self {
            transform_name: source.name.clone(),
            effects: source
                .effects
                .iter()
                .map(|e| EffectTemplate::extract(e, cx))
                .collect(),
            effect_conditions: source
                .conditions
                .iter()
                .map(|c| ConditionTemplate::extract(c, cx))
                .collect(),
            child_effects: source
                .children
                .iter()
                .filter(|child| !child.is_empty())
                .map(|child| Self::extract(child, cx))
                .collect(),
        }
    }
}

/// Leaf effect templates.
///
/// Status references use the status identifier (`""` means none). Imbue
/// references use the preset id (`-1` means none).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum EffectTemplate {
    AddStatusEffect {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        status_identifier: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        chance_to_contract: Option<i32>,
    },
    AddStatusEffectBuildUp {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        status_identifier: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        buildup: Option<f32>,
    },
    RemoveStatusEffect {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        status_identifier: Option<String>,
    },
    AffectHealth {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        affect_quantity: Option<f32>,
    },
    AffectStamina {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        affect_quantity: Option<f32>,
    },
    AffectFatigue {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        affect_quantity: Option<f32>,
    },
    AddImbue {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        imbue_effect_preset_id: Option<i32>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        lifespan: Option<f32>,
    },
}

impl EffectTemplate {
    /// Fresh live leaf of the matching variant, with component defaults.
    pub fn new_leaf(&self) -> Effect {
        match self {
            Self::AddStatusEffect { .. } => Effect::AddStatusEffect {
                status: None,
                chance_to_contract: 100,
            },
            Self::AddStatusEffectBuildUp { .. } => Effect::AddStatusEffectBuildUp {
                status: None,
                buildup: 0.0,
            },
            Self::RemoveStatusEffect { .. } => Effect::RemoveStatusEffect { status: None },
            Self::AffectHealth { .. } => Effect::AffectHealth { quantity: 0.0 },
            Self::AffectStamina { .. } => Effect::AffectStamina { quantity: 0.0 },
            Self::AffectFatigue { .. } => Effect::AffectFatigue { quantity: 0.0 },
            Self::AddImbue { .. } => Effect::AddImbue {
                preset: None,
                lifespan: 0.0,
            },
        }
    }

    const fn name(&self) -> &'static str {
        match self {
            Self::AddStatusEffect { .. } => "AddStatusEffect",
            Self::AddStatusEffectBuildUp { .. } => "AddStatusEffectBuildUp",
            Self::RemoveStatusEffect { .. } => "RemoveStatusEffect",
            Self::AffectHealth { .. } => "AffectHealth",
            Self::AffectStamina { .. } => "AffectStamina",
            Self::AffectFatigue { .. } => "AffectFatigue",
            Self::AddImbue { .. } => "AddImbue",
        }
    }
}

const fn effect_name(effect: &Effect) -> &'static str {
    match effect {
        Effect::AddStatusEffect { .. } => "AddStatusEffect",
        Effect::AddStatusEffectBuildUp { .. } => "AddStatusEffectBuildUp",
        Effect::RemoveStatusEffect { .. } => "RemoveStatusEffect",
        Effect::AffectHealth { .. } => "AffectHealth",
        Effect::AffectStamina { .. } => "AffectStamina",
        Effect::AffectFatigue { .. } => "AffectFatigue",
        Effect::AddImbue { .. } => "AddImbue",
    }
}

/// Writes a status reference. `""` clears it, an unknown identifier leaves it.
fn apply_status_ref(
    slot: &mut Option<patchkit_core::EntityHandle>,
    identifier: &Option<String>,
    cx: &ApplyContext<'_>,
) {
    match identifier.as_deref() {
        None => {}
        Some("") => *slot = None,
        Some(name) => {
            if let Some(handle) =
                cx.resolve_ref(Namespace::StatusEffect, &name.into(), "status_identifier")
            {
                *slot = Some(handle);
            }
        }
    }
}

/// Writes an imbue preset reference. `-1` clears it, an unknown id leaves it.
fn apply_preset_ref(
    slot: &mut Option<patchkit_core::EntityHandle>,
    preset_id: Option<i32>,
    cx: &ApplyContext<'_>,
) {
    match preset_id {
        None => {}
        Some(-1) => *slot = None,
        Some(id) => {
            if let Some(handle) =
                cx.resolve_ref(Namespace::EffectPreset, &id.into(), "imbue_effect_preset_id")
            {
                *slot = Some(handle);
            }
        }
    }
}

impl TemplateNode for EffectTemplate {
    type Live = Effect;

    fn apply(&self, target: &mut Effect, cx: &mut ApplyContext<'_>) -> Result<(), ApplyError> {
        match (self, target) {
            (
                Self::AddStatusEffect {
                    status_identifier,
                    chance_to_contract,
                },
                Effect::AddStatusEffect {
                    status,
                    chance_to_contract: chance,
                },
            ) => {
                apply_status_ref(status, status_identifier, cx);
                assign(chance, chance_to_contract);
            }
            (
                Self::AddStatusEffectBuildUp {
                    status_identifier,
                    buildup,
                },
                Effect::AddStatusEffectBuildUp {
                    status,
                    buildup: live,
                },
            ) => {
                apply_status_ref(status, status_identifier, cx);
                assign(live, buildup);
            }
            (
                Self::RemoveStatusEffect { status_identifier },
                Effect::RemoveStatusEffect { status },
            ) => apply_status_ref(status, status_identifier, cx),
            (Self::AffectHealth { affect_quantity }, Effect::AffectHealth { quantity })
            | (Self::AffectStamina { affect_quantity }, Effect::AffectStamina { quantity })
            | (Self::AffectFatigue { affect_quantity }, Effect::AffectFatigue { quantity }) => {
                assign(quantity, affect_quantity)
            }
            (
                Self::AddImbue {
                    imbue_effect_preset_id,
                    lifespan,
                },
                Effect::AddImbue {
                    preset,
                    lifespan: live,
                },
            ) => {
                apply_preset_ref(preset, *imbue_effect_preset_id, cx);
                assign(live, lifespan);
            }
            (template, live) => {
                return Err(ApplyError::KindMismatch {
                    expected: template.name(),
                    found: effect_name(live),
                });
            }
        }
        Ok(())
    }

    fn extract(source: &Effect, cx: &ExtractContext<'_>) -> Self {
        match source {
            Effect::AddStatusEffect {
                status,
                chance_to_contract,
            } => Self::AddStatusEffect {
                status_identifier: Some(cx.name_of(*status)),
                chance_to_contract: Some(*chance_to_contract),
            },
            Effect::AddStatusEffectBuildUp { status, buildup } => Self::AddStatusEffectBuildUp {
                status_identifier: Some(cx.name_of(*status)),
                buildup: Some(*buildup),
            },
            Effect::RemoveStatusEffect { status } => Self::RemoveStatusEffect {
                status_identifier: Some(cx.name_of(*status)),
            },
            Effect::AffectHealth { quantity } => Self::AffectHealth {
                affect_quantity: Some(*quantity),
            },
            Effect::AffectStamina { quantity } => Self::AffectStamina {
                affect_quantity: Some(*quantity),
            },
            Effect::AffectFatigue { quantity } => Self::AffectFatigue {
                affect_quantity: Some(*quantity),
            },
            Effect::AddImbue { preset, lifespan } => Self::AddImbue {
                imbue_effect_preset_id: Some(cx.id_of(*preset)),
                lifespan: Some(*lifespan),
            },
        }
    }
}

/// Leaf condition templates. Every variant carries `invert`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ConditionTemplate {
    ImbueEffectCondition {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        invert: Option<bool>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        imbue_effect_preset_id: Option<i32>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        any_imbue: Option<bool>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        weapon_to_check: Option<WeaponSlot>,
    },
    StatusEffectCondition {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        invert: Option<bool>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        status_identifier: Option<String>,
    },
    ProbabilityCondition {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        invert: Option<bool>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        chance_percent: Option<i32>,
    },
    BooleanCondition {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        invert: Option<bool>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        valid: Option<bool>,
    },
    WindAltarActivatedCondition {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        invert: Option<bool>,
    },
}

impl ConditionTemplate {
    pub fn new_leaf(&self) -> EffectCondition {
        let kind = match self {
            Self::ImbueEffectCondition { .. } => ConditionKind::ImbueEffect {
                preset: None,
                any_imbue: false,
                weapon_to_check: WeaponSlot::MainHand,
            },
            Self::StatusEffectCondition { .. } => ConditionKind::StatusEffect { status: None },
            Self::ProbabilityCondition { .. } => ConditionKind::Probability { chance_percent: 50 },
            Self::BooleanCondition { .. } => ConditionKind::Boolean { valid: true },
            Self::WindAltarActivatedCondition { .. } => ConditionKind::WindAltarActivated,
        };
        EffectCondition {
            invert: false,
            kind,
        }
    }

    const fn name(&self) -> &'static str {
        match self {
            Self::ImbueEffectCondition { .. } => "ImbueEffectCondition",
            Self::StatusEffectCondition { .. } => "StatusEffectCondition",
            Self::ProbabilityCondition { .. } => "ProbabilityCondition",
            Self::BooleanCondition { .. } => "BooleanCondition",
            Self::WindAltarActivatedCondition { .. } => "WindAltarActivatedCondition",
        }
    }

    fn invert(&self) -> Option<bool> {
        match self {
            Self::ImbueEffectCondition { invert, .. }
            | Self::StatusEffectCondition { invert, .. }
            | Self::ProbabilityCondition { invert, .. }
            | Self::BooleanCondition { invert, .. }
            | Self::WindAltarActivatedCondition { invert } => *invert,
        }
    }
}

const fn condition_name(kind: &ConditionKind) -> &'static str {
    match kind {
        ConditionKind::ImbueEffect { .. } => "ImbueEffectCondition",
        ConditionKind::StatusEffect { .. } => "StatusEffectCondition",
        ConditionKind::Probability { .. } => "ProbabilityCondition",
        ConditionKind::Boolean { .. } => "BooleanCondition",
        ConditionKind::WindAltarActivated => "WindAltarActivatedCondition",
    }
}

impl TemplateNode for ConditionTemplate {
    type Live = EffectCondition;

    fn apply(
        &self,
        target: &mut EffectCondition,
        cx: &mut ApplyContext<'_>,
    ) -> Result<(), ApplyError> {
        match (self, &mut target.kind) {
            (
                Self::ImbueEffectCondition {
                    imbue_effect_preset_id,
                    any_imbue,
                    weapon_to_check,
                    ..
                },
                ConditionKind::ImbueEffect {
                    preset,
                    any_imbue: live_any,
                    weapon_to_check: live_slot,
                },
            ) => {
                apply_preset_ref(preset, *imbue_effect_preset_id, cx);
                assign(live_any, any_imbue);
                assign(live_slot, weapon_to_check);
            }
            (
                Self::StatusEffectCondition {
                    status_identifier, ..
                },
                ConditionKind::StatusEffect { status },
            ) => apply_status_ref(status, status_identifier, cx),
            (
                Self::ProbabilityCondition { chance_percent, .. },
                ConditionKind::Probability {
                    chance_percent: live,
                },
            ) => assign(live, chance_percent),
            (Self::BooleanCondition { valid, .. }, ConditionKind::Boolean { valid: live }) => {
                assign(live, valid)
            }
            (Self::WindAltarActivatedCondition { .. }, ConditionKind::WindAltarActivated) => {}
            (template, live) => {
                return Err(ApplyError::KindMismatch {
                    expected: template.name(),
                    found: condition_name(live),
                });
            }
        }
        assign(&mut target.invert, &self.invert());
        Ok(())
    }

    fn extract(source: &EffectCondition, cx: &ExtractContext<'_>) -> Self {
        let invert = Some(source.invert);
        match &source.kind {
            ConditionKind::ImbueEffect {
                preset,
                any_imbue,
                weapon_to_check,
            } => Self::ImbueEffectCondition {
                invert,
                imbue_effect_preset_id: Some(cx.id_of(*preset)),
                any_imbue: Some(*any_imbue),
                weapon_to_check: Some(*weapon_to_check),
            },
            ConditionKind::StatusEffect { status } => Self::StatusEffectCondition {
                invert,
                status_identifier: Some(cx.name_of(*status)),
            },
            ConditionKind::Probability { chance_percent } => Self::ProbabilityCondition {
                invert,
                chance_percent: Some(*chance_percent),
            },
            ConditionKind::Boolean { valid } => Self::BooleanCondition {
                invert,
                valid: Some(*valid),
            },
            ConditionKind::WindAltarActivated => Self::WindAltarActivatedCondition { invert },
        }
    }
}
