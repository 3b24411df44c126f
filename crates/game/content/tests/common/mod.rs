//! Shared fixture world for integration tests.
#![allow(dead_code)]

use std::path::Path;

use patchkit_core::{
    Effect, ImbuePreset, Item, ItemKind, LocalizationTable, Prefab, PrefabWorld, RecipeItemData,
    SkillData, StatusEffect, TagTable,
};
use patchkit_content::ContentSession;

pub const SWORD: i32 = 100;
pub const FIRE_SWORD: i32 = 200;
pub const POTION: i32 = 300;
pub const FIRE_SWORD_RECIPE_ITEM: i32 = 400;
pub const SPARK: i32 = 8100;
pub const FIRE_IMBUE: i32 = 270;
pub const BURNING: &str = "Burning";

/// Base game content every test starts from.
pub fn world() -> PrefabWorld {
    let mut potion = Item::new(POTION, "Healing Potion").with_description("Restores health");
    let effects = potion.effects.child_or_insert("Effects");
    effects.effects.push(Effect::AffectHealth { quantity: 20.0 });
    effects.effects.push(Effect::AffectStamina { quantity: 5.0 });
    effects.effects.push(Effect::AffectFatigue { quantity: -1.0 });

    let spark = Item::new(SPARK, "Spark").with_kind(ItemKind::Skill(SkillData {
        cooldown: 5.0,
        mana_cost: 10.0,
        ..SkillData::default()
    }));

    let mut sword = Item::new(SWORD, "Sword").with_description("A plain blade");
    sword.value = 40;

    PrefabWorld::new()
        .with(Prefab::Item(sword))
        .with(Prefab::Item(potion))
        .with(Prefab::Item(spark))
        .with(Prefab::Item(
            Item::new(FIRE_SWORD_RECIPE_ITEM, "Recipe: Fire Sword")
                .with_kind(ItemKind::RecipeItem(RecipeItemData::default())),
        ))
        .with(Prefab::StatusEffect(StatusEffect::new(BURNING, "Burning")))
        .with(Prefab::ImbuePreset(ImbuePreset::new(FIRE_IMBUE, "Fire Imbue")))
}

pub fn tags() -> TagTable {
    TagTable::from_names(["Weapon", "Fire", "Consumable"]).expect("seed tags fit")
}

pub fn session() -> ContentSession<PrefabWorld> {
    ContentSession::new(world(), tags(), LocalizationTable::new())
}

/// Writes `content` to `root/relative`, creating folders on the way.
pub fn write(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("create fixture folder");
    }
    std::fs::write(path, content).expect("write fixture file");
}
