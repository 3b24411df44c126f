//! Pack folders read from disk.

mod common;

use std::path::Path;

use common::{BURNING, FIRE_SWORD, SPARK, SWORD};
use patchkit_content::{ApplyError, ContentKind, ContentPack, LoaderConfig};
use patchkit_core::{
    AssetManifest, Effect, EntityKey, ItemKind, Namespace, Prefab, PrefabHost,
};

const FROSTBITE: &str = r#"
StatusEffect((
    target_status_identifier: "Burning",
    new_status_identifier: "Frostbite",
    name: "Frostbite",
    lifespan: 12.0,
))
"#;

const BURNING_PATCH: &str = r#"
StatusEffect((
    target_status_identifier: "Burning",
    purgeable: false,
))
"#;

const FIRE_SWORD_DOC: &str = r#"
Item((
    target_item_id: 100,
    new_item_id: 200,
    name: "Fire Sword",
    tags: ["Weapon", "Fire"],
    effect_transforms: [
        (
            transform_name: "Hit",
            effects: [AddStatusEffect(status_identifier: "Frostbite", chance_to_contract: 40)],
        ),
    ],
))
"#;

const SPARK_DOC: &str = r#"
[Item]
target_item_id = 8100

[Item.kind.Skill]
cooldown = 1.5
"#;

const RECIPE_DOC: &str = r#"{
  "Recipe": {
    "uid": "fire-sword",
    "station": "Alchemy",
    "ingredients": [{ "Item": 100 }, { "Tag": "Fire" }],
    "results": [{ "item_id": 200 }]
  }
}"#;

const ENCHANTMENT_DOC: &str = r#"
Enchantment((
    enchantment_id: 7,
    name: "Flame",
    compatible_item_ids: [100, 200],
    damage_bonus: 4.0,
))
"#;

fn fire_pack(root: &Path) -> ContentPack {
    let pack = root.join("FirePack");
    common::write(&pack, "StatusEffects/burning.ron", BURNING_PATCH);
    common::write(&pack, "StatusEffects/Frost/frostbite.ron", FROSTBITE);
    common::write(&pack, "Items/fire_sword.ron", FIRE_SWORD_DOC);
    common::write(&pack, "Items/broken.ron", "Item((target_item_id: ");
    common::write(&pack, "Items/Spells/spark.toml", SPARK_DOC);
    common::write(&pack, "Items/TextureBundles/not_a_template.ron", "garbage");
    common::write(&pack, "Items/notes.txt", "ignored");
    common::write(&pack, "Recipes/fire_sword.json", RECIPE_DOC);
    common::write(&pack, "Enchantments/flame.ron", ENCHANTMENT_DOC);
    common::write(&pack, "Texture2D/fire_sword.png", "png");
    ContentPack::open(pack).expect("pack folder")
}

/// Full pack load:
/// 1. Collections are read in dependency order
/// 2. A broken document is reported without stopping the pack
/// 3. Cross references between collections resolve after the gates open
#[test]
fn test_pack_loads_every_collection() {
    let dir = tempfile::tempdir().expect("tempdir");
    let pack = fire_pack(dir.path());
    let mut session = common::session();
    let mut assets = AssetManifest::new();

    let report = session
        .load_pack(&pack, &LoaderConfig::default(), &mut assets)
        .expect("pack should load");

    assert_eq!(report.pack, "FirePack");
    assert_eq!(report.assets, 1);
    assert_eq!(assets.loaded().len(), 1);
    assert_eq!(report.loaded, 6);
    assert_eq!(report.failures.len(), 1);
    assert!(report.failures[0].0.ends_with("broken.ron"));
    assert!(matches!(
        report.failures[0].1,
        ApplyError::MalformedDocument { .. }
    ));

    let load = session.finish_loading();
    assert_eq!(load.failures().count(), 0);

    let frostbite = session
        .resolve(Namespace::StatusEffect, &EntityKey::Name("Frostbite".into()))
        .expect("derived status");
    let status = session.host().status_effect(frostbite).expect("status");
    assert_eq!(status.lifespan, 12.0);

    let burning = session
        .get(Namespace::StatusEffect, &EntityKey::Name(BURNING.into()))
        .and_then(Prefab::as_status_effect)
        .expect("burning");
    assert!(!burning.purgeable);

    let fire_sword = session
        .get(Namespace::Item, &EntityKey::Id(FIRE_SWORD))
        .and_then(Prefab::as_item)
        .expect("fire sword");
    assert_eq!(
        fire_sword.effects.child("Hit").expect("hit group").effects,
        vec![Effect::AddStatusEffect {
            status: Some(frostbite),
            chance_to_contract: 40
        }]
    );
    assert_eq!(
        fire_sword.tag_source.as_ref().map(|source| source.tags.len()),
        Some(2)
    );

    let ItemKind::Skill(skill) = &session
        .get(Namespace::Item, &EntityKey::Id(SPARK))
        .and_then(Prefab::as_item)
        .expect("spark")
        .kind
    else {
        panic!("spark is a skill");
    };
    assert_eq!(skill.cooldown, 1.5);

    let recipe = session
        .get(Namespace::Recipe, &EntityKey::Name("fire-sword".into()))
        .and_then(Prefab::as_recipe)
        .expect("recipe");
    assert_eq!(recipe.ingredients.len(), 2);
    assert_eq!(recipe.results.len(), 1);

    let Some(Prefab::Enchantment(enchantment)) =
        session.get(Namespace::Enchantment, &EntityKey::Id(7))
    else {
        panic!("enchantment registered");
    };
    assert_eq!(enchantment.compatible_items.len(), 2);
}

#[test]
fn test_subfolder_is_recorded_as_provenance() {
    let dir = tempfile::tempdir().expect("tempdir");
    let pack = fire_pack(dir.path());

    let documents = pack
        .read_documents(ContentKind::StatusEffects, &LoaderConfig::default())
        .expect("read");

    let subfolders: Vec<_> = documents
        .iter()
        .map(|document| document.provenance.subfolder.as_deref())
        .collect();
    assert_eq!(subfolders, vec![None, Some("Frost")]);
    assert!(documents.iter().all(|document| document.template.is_ok()));
}

#[test]
fn test_texture_bundles_are_not_templates() {
    let dir = tempfile::tempdir().expect("tempdir");
    let pack = fire_pack(dir.path());

    let documents = pack
        .read_documents(ContentKind::Items, &LoaderConfig::default())
        .expect("read");

    assert_eq!(documents.len(), 3);
    assert!(documents
        .iter()
        .all(|document| document.provenance.subfolder.as_deref() != Some("TextureBundles")));
}

#[test]
fn test_duplicate_pack_name_is_rejected() {
    let dir = tempfile::tempdir().expect("tempdir");
    let pack = fire_pack(dir.path());
    let mut session = common::session();
    let mut assets = AssetManifest::new();
    let config = LoaderConfig::default();

    session
        .load_pack(&pack, &config, &mut assets)
        .expect("first load");

    assert!(session.load_pack(&pack, &config, &mut assets).is_err());
}

/// A hot reload applies templates again but leaves characters and
/// enchantments alone.
#[test]
fn test_hot_reload_skips_enchantments() {
    let dir = tempfile::tempdir().expect("tempdir");
    let pack = fire_pack(dir.path());
    let mut session = common::session();
    let mut assets = AssetManifest::new();
    let config = LoaderConfig::default();

    session
        .load_pack(&pack, &config, &mut assets)
        .expect("initial load");
    session.finish_loading();
    session.begin_reload();

    let report = session
        .load_pack(&pack, &config, &mut assets)
        .expect("reload");
    session.finish_loading();

    assert_eq!(
        report.skipped,
        vec![ContentKind::Characters, ContentKind::Enchantments]
    );
    assert!(report
        .failures
        .iter()
        .all(|(_, e)| !matches!(e, ApplyError::DuplicateIdentifier { .. })));
    assert_eq!(
        session
            .get(Namespace::Item, &EntityKey::Id(SWORD))
            .and_then(Prefab::as_item)
            .map(|item| item.name.as_str()),
        Some("Sword")
    );
}
