//! Status effects and weapon imbue presets.

use crate::entity::effect::EffectTransform;
use crate::entity::item::TagSource;

/// Lasting effect applied to a character (burning, bleeding, well-fed, ...).
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StatusEffect {
    pub identifier: String,
    pub name: String,
    pub description: String,
    /// Seconds the status lasts. Zero means it lasts until removed.
    pub lifespan: f32,
    /// Seconds between two ticks of the effect tree.
    pub refresh_rate: f32,
    pub purgeable: bool,
    pub tag_source: Option<TagSource>,
    pub effects: EffectTransform,
}

impl StatusEffect {
    pub fn new(identifier: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            name: name.into(),
            description: String::new(),
            lifespan: 0.0,
            refresh_rate: 1.0,
            purgeable: true,
            tag_source: None,
            effects: EffectTransform::default(),
        }
    }
}

/// Effect preset applied to a weapon by an imbue.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ImbuePreset {
    pub preset_id: i32,
    pub name: String,
    pub description: String,
    pub effects: EffectTransform,
}

impl ImbuePreset {
    pub fn new(preset_id: i32, name: impl Into<String>) -> Self {
        Self {
            preset_id,
            name: name.into(),
            description: String::new(),
            effects: EffectTransform::default(),
        }
    }
}
