//! Recipe, enchantment and character templates.
//!
//! These entities are built fresh rather than cloned from an original, so
//! their templates carry the identifier directly.

use patchkit_core::{
    Character, CraftingStation, Enchantment, EntityHandle, EntityKey, Ingredient, Namespace,
    Recipe, RecipeResult,
};
use serde::{Deserialize, Serialize};

use super::{EffectTransformTemplate, Provenance, TemplateNode, assign};
use crate::context::{ApplyContext, ExtractContext};
use crate::error::ApplyError;
use crate::merge::{EffectBehaviour, merge_subtree, parse_transforms};

/// Resolves a list of item ids, dropping unknown ones.
fn resolve_items(ids: &[i32], field: &'static str, cx: &ApplyContext<'_>) -> Vec<EntityHandle> {
    ids.iter()
        .filter_map(|id| cx.resolve_ref(Namespace::Item, &EntityKey::Id(*id), field))
        .collect()
}

fn item_ids(handles: &[EntityHandle], cx: &ExtractContext<'_>) -> Vec<i32> {
    handles
        .iter()
        .filter_map(|handle| cx.key_of(*handle).and_then(EntityKey::as_id))
        .collect()
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RecipeTemplate {
    pub uid: String,
    #[serde(skip)]
    pub provenance: Option<Provenance>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub station: Option<CraftingStation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ingredients: Option<Vec<IngredientTemplate>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub results: Option<Vec<RecipeResultTemplate>>,
}

/// Ingredient slot: a specific item id or any item with the named tag.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum IngredientTemplate {
    Item(i32),
    Tag(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipeResultTemplate {
    pub item_id: i32,
    #[serde(default = "super::default_quantity")]
    pub quantity: i32,
}

impl RecipeTemplate {
    pub fn key(&self) -> EntityKey {
        EntityKey::Name(self.uid.clone())
    }

    pub fn document_name(&self) -> String {
        match &self.provenance {
            Some(provenance) => format!("{provenance}: recipe {}", self.uid),
            None => format!("recipe {}", self.uid),
        }
    }
}

impl TemplateNode for RecipeTemplate {
    type Live = Recipe;

    fn apply(&self, recipe: &mut Recipe, cx: &mut ApplyContext<'_>) -> Result<(), ApplyError> {
        assign(&mut recipe.name, &self.name);
        assign(&mut recipe.station, &self.station);
        if let Some(ingredients) = &self.ingredients {
            recipe.ingredients = ingredients
                .iter()
                .filter_map(|ingredient| match ingredient {
                    IngredientTemplate::Item(id) => cx
                        .resolve_ref(Namespace::Item, &EntityKey::Id(*id), "ingredients")
                        .map(Ingredient::Item),
                    IngredientTemplate::Tag(name) => cx.resolve_tag(name).map(Ingredient::Tag),
                })
                .collect();
        }
        if let Some(results) = &self.results {
            recipe.results = results
                .iter()
                .filter_map(|result| {
                    cx.resolve_ref(Namespace::Item, &EntityKey::Id(result.item_id), "results")
                        .map(|item| RecipeResult {
                            item,
                            quantity: result.quantity,
                        })
                })
                .collect();
        }
        Ok(())
    }

    fn extract(recipe: &Recipe, cx: &ExtractContext<'_>) -> Self {
        Self {
            uid: recipe.uid.clone(),
            provenance: None,
            name: Some(recipe.name.clone()),
            station: Some(recipe.station),
            ingredients: Some(
                recipe
                    .ingredients
                    .iter()
                    .filter_map(|ingredient| match ingredient {
                        Ingredient::Item(handle) => cx
                            .key_of(*handle)
                            .and_then(EntityKey::as_id)
                            .map(IngredientTemplate::Item),
                        Ingredient::Tag(tag) => cx.tag_name(*tag).map(IngredientTemplate::Tag),
                    })
                    .collect(),
            ),
            results: Some(
                recipe
                    .results
                    .iter()
                    .filter_map(|result| {
                        cx.key_of(result.item)
                            .and_then(EntityKey::as_id)
                            .map(|item_id| RecipeResultTemplate {
                                item_id,
                                quantity: result.quantity,
                            })
                    })
                    .collect(),
            ),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct EnchantmentTemplate {
    pub enchantment_id: i32,
    #[serde(skip)]
    pub provenance: Option<Provenance>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compatible_item_ids: Option<Vec<i32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub damage_bonus: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effects: Option<Vec<EffectTransformTemplate>>,
}

impl EnchantmentTemplate {
    pub fn key(&self) -> EntityKey {
        EntityKey::Id(self.enchantment_id)
    }

    pub fn document_name(&self) -> String {
        match &self.provenance {
            Some(provenance) => format!("{provenance}: enchantment {}", self.enchantment_id),
            None => format!("enchantment {}", self.enchantment_id),
        }
    }
}

impl TemplateNode for EnchantmentTemplate {
    type Live = Enchantment;

    fn apply(
        &self,
        enchantment: &mut Enchantment,
        cx: &mut ApplyContext<'_>,
    ) -> Result<(), ApplyError> {
        assign(&mut enchantment.name, &self.name);
        assign(&mut enchantment.description, &self.description);
        if self.name.is_some() || self.description.is_some() {
            cx.localization.set_text(
                Namespace::Enchantment,
                &EntityKey::Id(enchantment.id),
                &enchantment.name,
                &enchantment.description,
            );
        }
        if let Some(ids) = &self.compatible_item_ids {
            enchantment.compatible_items = resolve_items(ids, "compatible_item_ids", cx);
        }
        assign(&mut enchantment.damage_bonus, &self.damage_bonus);
        if let Some(transforms) = &self.effects {
            merge_subtree(
                &mut enchantment.effects,
                transforms,
                EffectBehaviour::OverrideEffects,
                cx,
            )?;
        }
        Ok(())
    }

    fn extract(enchantment: &Enchantment, cx: &ExtractContext<'_>) -> Self {
        Self {
            enchantment_id: enchantment.id,
            provenance: None,
            name: Some(enchantment.name.clone()),
            description: Some(enchantment.description.clone()),
            compatible_item_ids: Some(item_ids(&enchantment.compatible_items, cx)),
            damage_bonus: Some(enchantment.damage_bonus),
            effects: Some(parse_transforms(&enchantment.effects, cx)),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CharacterTemplate {
    pub uid: String,
    #[serde(skip)]
    pub provenance: Option<Provenance>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub health: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub faction: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub equipment_ids: Option<Vec<i32>>,
}

impl CharacterTemplate {
    pub fn key(&self) -> EntityKey {
        EntityKey::Name(self.uid.clone())
    }

    pub fn document_name(&self) -> String {
        match &self.provenance {
            Some(provenance) => format!("{provenance}: character {}", self.uid),
            None => format!("character {}", self.uid),
        }
    }
}

impl TemplateNode for CharacterTemplate {
    type Live = Character;

    fn apply(
        &self,
        character: &mut Character,
        cx: &mut ApplyContext<'_>,
    ) -> Result<(), ApplyError> {
        assign(&mut character.name, &self.name);
        assign(&mut character.health, &self.health);
        assign(&mut character.faction, &self.faction);
        if let Some(ids) = &self.equipment_ids {
            character.equipment = resolve_items(ids, "equipment_ids", cx);
        }
        Ok(())
    }

    fn extract(character: &Character, cx: &ExtractContext<'_>) -> Self {
        Self {
            uid: character.uid.clone(),
            provenance: None,
            name: Some(character.name.clone()),
            health: Some(character.health),
            faction: Some(character.faction.clone()),
            equipment_ids: Some(item_ids(&character.equipment, cx)),
        }
    }
}
