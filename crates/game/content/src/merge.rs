//! Merges template effect groups onto a live effect tree.
//!
//! Groups are matched by name under their parent and created when missing.
//! The [`EffectBehaviour`] chosen by the document decides what happens to the
//! leaves already present in a matched group.

use patchkit_core::EffectTransform;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::context::{ApplyContext, ExtractContext};
use crate::error::ApplyError;
use crate::template::{EffectTransformTemplate, TemplateNode};

/// Policy for leaves already present in the live tree.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
pub enum EffectBehaviour {
    /// Clear each matched group's own leaves, then insert the template leaves.
    #[default]
    OverrideEffects,
    /// Keep existing leaves and add the template leaves after them.
    Append,
    /// Remove every group under the root, then build the template groups.
    DestroyEffects,
}

/// Merges `templates` onto the children of `live_root`.
///
/// The document is checked against the depth limit before anything is
/// touched. Leaf failures are logged and skipped; siblings still apply.
pub fn merge_subtree(
    live_root: &mut EffectTransform,
    templates: &[EffectTransformTemplate],
    behaviour: EffectBehaviour,
    cx: &mut ApplyContext<'_>,
) -> Result<(), ApplyError> {
    let depth = templates
        .iter()
        .map(EffectTransformTemplate::depth)
        .max()
        .unwrap_or(0);
    if depth > cx.max_depth {
        return Err(ApplyError::malformed(
            "effect_transforms",
            format!("nesting depth {depth} exceeds limit {}", cx.max_depth),
        ));
    }

    if behaviour == EffectBehaviour::DestroyEffects && !live_root.children.is_empty() {
        debug!(
            target: "content::merge",
            groups = live_root.children.len(),
            "destroying existing effect groups"
        );
        live_root.children.clear();
    }

    merge_children(live_root, templates, behaviour, cx);
    Ok(())
}

fn merge_children(
    parent: &mut EffectTransform,
    templates: &[EffectTransformTemplate],
    behaviour: EffectBehaviour,
    cx: &mut ApplyContext<'_>,
) {
    // Names already merged at this level; the behaviour applies once per group.
    let mut seen: Vec<&str> = Vec::new();

    for template in templates {
        let name = template.transform_name.as_str();
        let group = parent.child_or_insert(name);

        if !seen.contains(&name) {
            if behaviour == EffectBehaviour::OverrideEffects {
                group.clear_leaves();
            }
            seen.push(name);
        }

        for leaf in &template.effects {
            let mut effect = leaf.new_leaf();
            match leaf.apply(&mut effect, cx) {
                Ok(()) => group.effects.push(effect),
                Err(e) => error!(
                    target: "content::merge",
                    group = name,
                    error = %e,
                    "effect leaf failed, skipping"
                ),
            }
        }
        for leaf in &template.effect_conditions {
            let mut condition = leaf.new_leaf();
            match leaf.apply(&mut condition, cx) {
                Ok(()) => group.conditions.push(condition),
                Err(e) => error!(
                    target: "content::merge",
                    group = name,
                    error = %e,
                    "condition leaf failed, skipping"
                ),
            }
        }

        merge_children(group, &template.child_effects, behaviour, cx);
    }
}

/// Serializes the groups under `live_root`, dropping empty ones.
pub fn parse_transforms(
    live_root: &EffectTransform,
    cx: &ExtractContext<'_>,
) -> Vec<EffectTransformTemplate> {
    live_root
        .children
        .iter()
        .filter(|group| !group.is_empty())
        .map(|group| EffectTransformTemplate::extract(group, cx))
        .collect()
}

#[cfg(test)]
mod tests {
    use patchkit_core::{Effect, LocalizationTable, TagTable};

    use super::*;
    use crate::registry::Registry;
    use crate::template::EffectTemplate;

    fn heal(quantity: f32) -> EffectTemplate {
        EffectTemplate::AffectHealth {
            affect_quantity: Some(quantity),
        }
    }

    fn group(name: &str, effects: Vec<EffectTemplate>) -> EffectTransformTemplate {
        EffectTransformTemplate {
            effects,
            ..EffectTransformTemplate::new(name)
        }
    }

    fn live_tree() -> EffectTransform {
        let mut root = EffectTransform::default();
        let effects = root.child_or_insert("Effects");
        effects.effects.push(Effect::AffectStamina { quantity: 1.0 });
        effects.effects.push(Effect::AffectFatigue { quantity: 2.0 });
        effects.effects.push(Effect::AffectHealth { quantity: 3.0 });
        root.child_or_insert("Hit")
            .effects
            .push(Effect::AffectHealth { quantity: -4.0 });
        root
    }

    fn merge(
        root: &mut EffectTransform,
        templates: &[EffectTransformTemplate],
        behaviour: EffectBehaviour,
        max_depth: usize,
    ) -> Result<(), ApplyError> {
        let registry = Registry::new();
        let tags = TagTable::new();
        let mut localization = LocalizationTable::new();
        let mut cx = ApplyContext {
            registry: &registry,
            tags: &tags,
            localization: &mut localization,
            max_depth,
        };
        merge_subtree(root, templates, behaviour, &mut cx)
    }

    #[test]
    fn override_replaces_matched_group_leaves_only() {
        let mut root = live_tree();
        let templates = [group("Effects", vec![heal(10.0), heal(20.0)])];

        merge(&mut root, &templates, EffectBehaviour::OverrideEffects, 8).unwrap();

        let effects = root.child("Effects").unwrap();
        assert_eq!(
            effects.effects,
            vec![
                Effect::AffectHealth { quantity: 10.0 },
                Effect::AffectHealth { quantity: 20.0 }
            ]
        );
        assert_eq!(root.child("Hit").unwrap().leaf_count(), 1);
    }

    #[test]
    fn override_is_idempotent() {
        let mut root = live_tree();
        let templates = [group("Effects", vec![heal(10.0)])];

        merge(&mut root, &templates, EffectBehaviour::OverrideEffects, 8).unwrap();
        let once = root.clone();
        merge(&mut root, &templates, EffectBehaviour::OverrideEffects, 8).unwrap();

        assert_eq!(root, once);
    }

    #[test]
    fn append_accumulates() {
        let mut root = live_tree();
        let templates = [group("Effects", vec![heal(10.0)])];

        merge(&mut root, &templates, EffectBehaviour::Append, 8).unwrap();
        merge(&mut root, &templates, EffectBehaviour::Append, 8).unwrap();

        assert_eq!(root.child("Effects").unwrap().leaf_count(), 5);
    }

    #[test]
    fn destroy_removes_unlisted_groups() {
        let mut root = live_tree();
        let templates = [group("Effects", vec![heal(10.0)])];

        merge(&mut root, &templates, EffectBehaviour::DestroyEffects, 8).unwrap();

        assert_eq!(root.children.len(), 1);
        assert!(root.child("Hit").is_none());
    }

    #[test]
    fn missing_group_is_created_in_order() {
        let mut root = live_tree();
        let mut outer = group("Activation", vec![]);
        outer.child_effects.push(group("Inner", vec![heal(1.0)]));

        merge(&mut root, &[outer], EffectBehaviour::OverrideEffects, 8).unwrap();

        let activation = root.children.last().unwrap();
        assert_eq!(activation.name, "Activation");
        assert_eq!(activation.child("Inner").unwrap().leaf_count(), 1);
    }

    #[test]
    fn repeated_group_name_overrides_once() {
        let mut root = live_tree();
        let templates = [
            group("Effects", vec![heal(10.0)]),
            group("Effects", vec![heal(20.0)]),
        ];

        merge(&mut root, &templates, EffectBehaviour::OverrideEffects, 8).unwrap();

        assert_eq!(root.child("Effects").unwrap().leaf_count(), 2);
    }

    #[test]
    fn too_deep_document_is_rejected_untouched() {
        let mut root = live_tree();
        let before = root.clone();
        let mut nested = group("A", vec![]);
        nested.child_effects.push(group("B", vec![]));
        nested.child_effects[0].child_effects.push(group("C", vec![heal(1.0)]));

        let err = merge(&mut root, &[nested], EffectBehaviour::DestroyEffects, 2).unwrap_err();

        assert!(matches!(err, ApplyError::MalformedDocument { .. }));
        assert_eq!(root, before);
    }

    #[test]
    fn parse_transforms_skips_empty_groups() {
        let mut root = live_tree();
        root.child_or_insert("Empty");
        let registry = Registry::new();
        let tags = TagTable::new();
        let cx = ExtractContext {
            registry: &registry,
            tags: &tags,
        };

        let groups = parse_transforms(&root, &cx);

        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].effects.len(), 3);
    }
}
