//! Property tests for field skipping, merge behaviours and gate ordering.
//!
//! Uses proptest to generate sparse templates and random scheduling
//! sequences.

mod common;

use patchkit_content::template::{EffectTemplate, EffectTransformTemplate, ItemTemplate};
use patchkit_content::{
    ApplyContext, EffectBehaviour, Gate, Registry, Scheduled, Scheduler, TemplateNode,
    merge_subtree,
};
use patchkit_core::{Effect, EffectTransform, Item, LocalizationTable};
use proptest::prelude::*;

fn arb_item() -> impl Strategy<Value = Item> {
    (
        "[A-Za-z ]{1,12}",
        -1000..1000i32,
        0.0f32..50.0,
        -1..500i32,
        any::<bool>(),
    )
        .prop_map(|(name, value, weight, durability, usable)| {
            let mut item = Item::new(100, name);
            item.value = value;
            item.weight = weight;
            item.max_durability = durability;
            item.is_usable = usable;
            item
        })
}

fn arb_template() -> impl Strategy<Value = ItemTemplate> {
    (
        proptest::option::of("[A-Za-z ]{1,12}"),
        proptest::option::of(-1000..1000i32),
        proptest::option::of(0.0f32..50.0),
        proptest::option::of(-1..500i32),
        proptest::option::of(any::<bool>()),
    )
        .prop_map(|(name, value, weight, max_durability, is_usable)| ItemTemplate {
            name,
            value,
            weight,
            max_durability,
            is_usable,
            ..ItemTemplate::new(100)
        })
}

fn arb_leaves(max: usize) -> impl Strategy<Value = Vec<f32>> {
    proptest::collection::vec(-100.0f32..100.0, 0..max)
}

fn health_group(quantities: &[f32]) -> EffectTransformTemplate {
    EffectTransformTemplate {
        effects: quantities
            .iter()
            .map(|q| EffectTemplate::AffectHealth {
                affect_quantity: Some(*q),
            })
            .collect(),
        ..EffectTransformTemplate::new("Effects")
    }
}

fn live_tree(quantities: &[f32]) -> EffectTransform {
    let mut root = EffectTransform::default();
    let group = root.child_or_insert("Effects");
    group.effects = quantities
        .iter()
        .map(|q| Effect::AffectHealth { quantity: *q })
        .collect();
    root
}

fn health(quantities: &[f32]) -> Vec<Effect> {
    quantities
        .iter()
        .map(|q| Effect::AffectHealth { quantity: *q })
        .collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Every field is either the template's value or untouched.
    #[test]
    fn absent_fields_are_left_untouched(item in arb_item(), template in arb_template()) {
        let registry = Registry::new();
        let tags = common::tags();
        let mut localization = LocalizationTable::new();
        let mut cx = ApplyContext {
            registry: &registry,
            tags: &tags,
            localization: &mut localization,
            max_depth: 8,
        };
        let mut patched = item.clone();

        template.apply(&mut patched, &mut cx).unwrap();

        prop_assert_eq!(&patched.name, template.name.as_ref().unwrap_or(&item.name));
        prop_assert_eq!(patched.value, template.value.unwrap_or(item.value));
        prop_assert_eq!(patched.weight, template.weight.unwrap_or(item.weight));
        prop_assert_eq!(
            patched.max_durability,
            template.max_durability.unwrap_or(item.max_durability)
        );
        prop_assert_eq!(patched.is_usable, template.is_usable.unwrap_or(item.is_usable));
        prop_assert_eq!(patched.description, item.description);
        prop_assert_eq!(patched.effects, item.effects);
    }

    /// Override leaves exactly the template leaves, however often applied.
    #[test]
    fn override_is_idempotent(existing in arb_leaves(6), incoming in arb_leaves(6), times in 1..4usize) {
        let registry = Registry::new();
        let tags = common::tags();
        let mut localization = LocalizationTable::new();
        let mut cx = ApplyContext {
            registry: &registry,
            tags: &tags,
            localization: &mut localization,
            max_depth: 8,
        };
        let mut root = live_tree(&existing);
        let template = [health_group(&incoming)];

        for _ in 0..times {
            merge_subtree(&mut root, &template, EffectBehaviour::OverrideEffects, &mut cx).unwrap();
        }

        prop_assert_eq!(&root.child("Effects").unwrap().effects, &health(&incoming));
    }

    /// Append keeps existing leaves and adds the template leaves each time.
    #[test]
    fn append_accumulates(existing in arb_leaves(6), incoming in arb_leaves(6), times in 1..4usize) {
        let registry = Registry::new();
        let tags = common::tags();
        let mut localization = LocalizationTable::new();
        let mut cx = ApplyContext {
            registry: &registry,
            tags: &tags,
            localization: &mut localization,
            max_depth: 8,
        };
        let mut root = live_tree(&existing);
        let template = [health_group(&incoming)];

        for _ in 0..times {
            merge_subtree(&mut root, &template, EffectBehaviour::Append, &mut cx).unwrap();
        }

        let mut expected = health(&existing);
        for _ in 0..times {
            expected.extend(health(&incoming));
        }
        prop_assert_eq!(&root.child("Effects").unwrap().effects, &expected);
    }

    /// Callbacks run exactly once, in registration order per gate, and only
    /// once their gate is open.
    #[test]
    fn gates_run_callbacks_once_in_order(
        ops in proptest::collection::vec(any::<bool>(), 0..24),
        open_items_at in 0..25usize,
        open_recipes_at in 0..25usize,
    ) {
        let mut scheduler: Scheduler<Vec<(Gate, usize)>> = Scheduler::new();
        let mut log = Vec::new();
        let mut expected = Vec::new();
        let mut waiting: Vec<(Gate, usize)> = Vec::new();
        let open_recipes_at = open_recipes_at.max(open_items_at);

        for step in 0..=ops.len() {
            for (gate, at) in [(Gate::ItemsReady, open_items_at), (Gate::RecipesReady, open_recipes_at)] {
                if step == at {
                    scheduler.open_gate(gate, &mut log);
                    expected.extend(waiting.iter().filter(|(g, _)| *g == gate));
                    waiting.retain(|(g, _)| *g != gate);
                }
            }
            let Some(&recipes) = ops.get(step) else {
                break;
            };
            let gate = if recipes { Gate::RecipesReady } else { Gate::ItemsReady };
            let outcome = scheduler.schedule(gate, format!("op{step}"), &mut log, move |log| {
                log.push((gate, step));
                Ok(())
            });
            if scheduler.is_open(gate) {
                prop_assert_eq!(outcome, Scheduled::Ran(Ok(())));
                expected.push((gate, step));
            } else {
                prop_assert_eq!(outcome, Scheduled::Deferred);
                waiting.push((gate, step));
            }
        }

        scheduler.open_gate(Gate::ItemsReady, &mut log);
        scheduler.open_gate(Gate::RecipesReady, &mut log);
        for gate in [Gate::ItemsReady, Gate::RecipesReady] {
            expected.extend(waiting.iter().filter(|(g, _)| *g == gate));
            waiting.retain(|(g, _)| *g != gate);
        }

        prop_assert_eq!(log, expected);
    }
}
