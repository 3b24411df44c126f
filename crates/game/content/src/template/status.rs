//! Status effect and imbue preset templates.

use patchkit_core::{EntityKey, ImbuePreset, Namespace, StatusEffect, TagSource};
use serde::{Deserialize, Serialize};

use super::{EffectTransformTemplate, Provenance, TemplateNode, assign, resolve_tags, tag_names};
use crate::context::{ApplyContext, ExtractContext};
use crate::error::ApplyError;
use crate::merge::{EffectBehaviour, merge_subtree, parse_transforms};

/// Partial description of a status effect, keyed by string identifier.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StatusEffectTemplate {
    pub target_status_identifier: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_status_identifier: Option<String>,
    #[serde(skip)]
    pub provenance: Option<Provenance>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lifespan: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_rate: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purgeable: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effect_behaviour: Option<EffectBehaviour>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effects: Option<Vec<EffectTransformTemplate>>,
}

impl StatusEffectTemplate {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target_status_identifier: target.into(),
            ..Self::default()
        }
    }

    pub fn target_key(&self) -> EntityKey {
        EntityKey::Name(self.target_status_identifier.clone())
    }

    pub fn new_key(&self) -> EntityKey {
        EntityKey::Name(
            self.new_status_identifier
                .clone()
                .unwrap_or_else(|| self.target_status_identifier.clone()),
        )
    }

    pub fn document_name(&self) -> String {
        let key = self.new_key();
        match &self.provenance {
            Some(provenance) => format!("{provenance}: status {key}"),
            None => format!("status {key}"),
        }
    }
}

impl TemplateNode for StatusEffectTemplate {
    type Live = StatusEffect;

    fn apply(
        &self,
        status: &mut StatusEffect,
        cx: &mut ApplyContext<'_>,
    ) -> Result<(), ApplyError> {
        assign(&mut status.name, &self.name);
        assign(&mut status.description, &self.description);
        if self.name.is_some() || self.description.is_some() {
            cx.localization.set_text(
                Namespace::StatusEffect,
                &EntityKey::Name(status.identifier.clone()),
                &status.name,
                &status.description,
            );
        }
        assign(&mut status.lifespan, &self.lifespan);
        assign(&mut status.refresh_rate, &self.refresh_rate);
        assign(&mut status.purgeable, &self.purgeable);
        if let Some(names) = &self.tags {
            status.tag_source = Some(TagSource {
                tags: resolve_tags(names, cx),
            });
        }

        if let Some(transforms) = &self.effects {
            merge_subtree(
                &mut status.effects,
                transforms,
                self.effect_behaviour.unwrap_or_default(),
                cx,
            )?;
        }
        Ok(())
    }

    fn extract(status: &StatusEffect, cx: &ExtractContext<'_>) -> Self {
        Self {
            target_status_identifier: status.identifier.clone(),
            new_status_identifier: None,
            provenance: None,
            name: Some(status.name.clone()),
            description: Some(status.description.clone()),
            lifespan: Some(status.lifespan),
            refresh_rate: Some(status.refresh_rate),
            purgeable: Some(status.purgeable),
            tags: Some(
                status
                    .tag_source
                    .as_ref()
                    .map(|source| tag_names(&source.tags, cx))
                    .unwrap_or_default(),
            ),
            effect_behaviour: Some(EffectBehaviour::DestroyEffects),
            effects: Some(parse_transforms(&status.effects, cx)),
        }
    }
}

/// Partial description of an imbue preset, keyed by integer preset id.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ImbueEffectTemplate {
    pub target_status_id: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_status_id: Option<i32>,
    #[serde(skip)]
    pub provenance: Option<Provenance>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effect_behaviour: Option<EffectBehaviour>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effects: Option<Vec<EffectTransformTemplate>>,
}

impl ImbueEffectTemplate {
    pub fn new(target: i32) -> Self {
        Self {
            target_status_id: target,
            ..Self::default()
        }
    }

    pub fn target_key(&self) -> EntityKey {
        EntityKey::Id(self.target_status_id)
    }

    pub fn new_key(&self) -> EntityKey {
        EntityKey::Id(self.new_status_id.unwrap_or(self.target_status_id))
    }

    pub fn document_name(&self) -> String {
        let key = self.new_key();
        match &self.provenance {
            Some(provenance) => format!("{provenance}: imbue {key}"),
            None => format!("imbue {key}"),
        }
    }
}

impl TemplateNode for ImbueEffectTemplate {
    type Live = ImbuePreset;

    fn apply(
        &self,
        preset: &mut ImbuePreset,
        cx: &mut ApplyContext<'_>,
    ) -> Result<(), ApplyError> {
        assign(&mut preset.name, &self.name);
        assign(&mut preset.description, &self.description);
        if self.name.is_some() || self.description.is_some() {
            cx.localization.set_text(
                Namespace::EffectPreset,
                &EntityKey::Id(preset.preset_id),
                &preset.name,
                &preset.description,
            );
        }

        if let Some(transforms) = &self.effects {
            merge_subtree(
                &mut preset.effects,
                transforms,
                self.effect_behaviour.unwrap_or_default(),
                cx,
            )?;
        }
        Ok(())
    }

    /// Groups without any leaf are left out.
    fn extract(preset: &ImbuePreset, cx: &ExtractContext<'_>) -> Self {
        Self {
            target_status_id: preset.preset_id,
            new_status_id: None,
            provenance: None,
            name: Some(preset.name.clone()),
            description: Some(preset.description.clone()),
            effect_behaviour: Some(EffectBehaviour::DestroyEffects),
            effects: Some(parse_transforms(&preset.effects, cx)),
        }
    }
}

#[cfg(test)]
mod tests {
    use patchkit_core::{Effect, LocalizationTable, TagTable};

    use super::*;
    use crate::registry::Registry;
    use crate::template::EffectTemplate;

    #[test]
    fn append_adds_after_existing_leaves() {
        let registry = Registry::new();
        let tags = TagTable::new();
        let mut localization = LocalizationTable::new();
        let mut cx = ApplyContext {
            registry: &registry,
            tags: &tags,
            localization: &mut localization,
            max_depth: 8,
        };
        let mut status = StatusEffect::new("Burning", "Burning");
        status
            .effects
            .child_or_insert("Effects")
            .effects
            .push(Effect::AffectHealth { quantity: -2.0 });

        let mut template = StatusEffectTemplate::new("Burning");
        template.lifespan = Some(30.0);
        template.effect_behaviour = Some(EffectBehaviour::Append);
        template.effects = Some(vec![EffectTransformTemplate {
            effects: vec![EffectTemplate::AffectStamina {
                affect_quantity: Some(-1.0),
            }],
            ..EffectTransformTemplate::new("Effects")
        }]);
        template.apply(&mut status, &mut cx).unwrap();

        assert_eq!(status.lifespan, 30.0);
        assert_eq!(
            status.effects.child("Effects").unwrap().effects,
            vec![
                Effect::AffectHealth { quantity: -2.0 },
                Effect::AffectStamina { quantity: -1.0 }
            ]
        );
    }

    #[test]
    fn imbue_extract_skips_empty_groups() {
        let registry = Registry::new();
        let tags = TagTable::new();
        let cx = ExtractContext {
            registry: &registry,
            tags: &tags,
        };
        let mut preset = ImbuePreset::new(270, "Fire Imbue");
        preset.effects.child_or_insert("Empty");
        preset
            .effects
            .child_or_insert("Hit")
            .effects
            .push(Effect::AffectHealth { quantity: -5.0 });

        let template = ImbueEffectTemplate::extract(&preset, &cx);

        let groups = template.effects.unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].transform_name, "Hit");
    }
}
