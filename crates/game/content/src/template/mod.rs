//! Template node model.
//!
//! A template is a field-sparse description of a live prefab. Every field is
//! optional: an absent field leaves the live value untouched. Each node can be
//! written onto its live counterpart ([`TemplateNode::apply`]) and rebuilt
//! from one ([`TemplateNode::extract`]).
mod effect;
mod item;
mod recipe;
mod status;

pub use effect::{ConditionTemplate, EffectTemplate, EffectTransformTemplate};
pub use item::{
    AbsorbTemplate, AddOnTemplate, AmmunitionTemplate, ArmorTemplate, CounterAbsorbTemplate,
    DamageTemplate, ItemExtensionTemplate, ItemKindTemplate, ItemTemplate,
    PreservedElementTemplate, PreserverTemplate, RecipeItemTemplate, RequiredItemTemplate,
    SkillTemplate, WeaponTemplate,
};
pub use recipe::{
    CharacterTemplate, EnchantmentTemplate, IngredientTemplate, RecipeResultTemplate,
    RecipeTemplate,
};
pub use status::{ImbueEffectTemplate, StatusEffectTemplate};

use patchkit_core::TagHandle;
use serde::{Deserialize, Serialize};

use crate::context::{ApplyContext, ExtractContext};
use crate::error::ApplyError;

/// A template that can be written onto, and rebuilt from, a live value.
pub trait TemplateNode: Sized {
    type Live;

    /// Writes every present field onto `target`.
    fn apply(&self, target: &mut Self::Live, cx: &mut ApplyContext<'_>) -> Result<(), ApplyError>;

    /// Builds a fully populated template describing `source`.
    fn extract(source: &Self::Live, cx: &ExtractContext<'_>) -> Self;
}

/// Top-level content of one document file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum TemplateDocument {
    Item(ItemTemplate),
    /// Several item templates in one file, applied in order.
    Items(Vec<ItemTemplate>),
    StatusEffect(StatusEffectTemplate),
    ImbueEffect(ImbueEffectTemplate),
    Recipe(RecipeTemplate),
    Enchantment(EnchantmentTemplate),
    Character(CharacterTemplate),
}

impl TemplateDocument {
    pub const fn kind_name(&self) -> &'static str {
        match self {
            Self::Item(_) => "Item",
            Self::Items(_) => "Items",
            Self::StatusEffect(_) => "StatusEffect",
            Self::ImbueEffect(_) => "ImbueEffect",
            Self::Recipe(_) => "Recipe",
            Self::Enchantment(_) => "Enchantment",
            Self::Character(_) => "Character",
        }
    }

    /// Records where every template of the document came from.
    pub fn set_provenance(&mut self, provenance: &Provenance) {
        let slot = match self {
            Self::Items(items) => {
                for item in items {
                    item.provenance = Some(provenance.clone());
                }
                return;
            }
            Self::Item(template) => &mut template.provenance,
            Self::StatusEffect(template) => &mut template.provenance,
            Self::ImbueEffect(template) => &mut template.provenance,
            Self::Recipe(template) => &mut template.provenance,
            Self::Enchantment(template) => &mut template.provenance,
            Self::Character(template) => &mut template.provenance,
        };
        *slot = Some(provenance.clone());
    }
}

/// Pack and subfolder a template was read from.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Provenance {
    pub pack: String,
    pub subfolder: Option<String>,
}

impl std::fmt::Display for Provenance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.subfolder {
            Some(sub) => write!(f, "{}/{}", self.pack, sub),
            None => f.write_str(&self.pack),
        }
    }
}

/// Writes `value` into `slot` when present.
pub(crate) fn assign<T: Clone>(slot: &mut T, value: &Option<T>) {
    if let Some(value) = value {
        *slot = value.clone();
    }
}

/// Quantity used when a document leaves it out.
pub(crate) fn default_quantity() -> i32 {
    1
}

/// Resolves a tag list, dropping unknown names.
pub(crate) fn resolve_tags(names: &[String], cx: &ApplyContext<'_>) -> Vec<TagHandle> {
    names.iter().filter_map(|name| cx.resolve_tag(name)).collect()
}

/// Names of a tag list; tags unknown to the catalog are dropped.
pub(crate) fn tag_names(tags: &[TagHandle], cx: &ExtractContext<'_>) -> Vec<String> {
    tags.iter().filter_map(|tag| cx.tag_name(*tag)).collect()
}
