//! Item templates.

use patchkit_core::{
    AbsorbEntry, ActivationCondition, AmmunitionData, ArmorData, ConditionKind, CounterAbsorb,
    DamageEntry, DamageKind, EffectCondition, EffectTransform, EntityHandle, EntityKey,
    EquipmentSlot, ExtensionKind, Item, ItemAddOn, ItemExtension, ItemKind, ItemKindTag,
    ItemRequirement, Namespace, PreservedElement, Preserver, RecipeItemData, SkillData, TagSource,
    VfxKind, WeaponData, WeaponType,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{
    ConditionTemplate, EffectTransformTemplate, Provenance, TemplateNode, assign, resolve_tags,
    tag_names,
};
use crate::context::{ApplyContext, ExtractContext};
use crate::error::ApplyError;
use crate::merge::{EffectBehaviour, merge_subtree, parse_transforms};

/// Groups whose name contains this marker feed skill activation conditions.
pub const ACTIVATION_GROUP_MARKER: &str = "Activation";

/// Notification shown when an activation condition fails.
pub const ACTIVATION_MESSAGE_KEY: &str = "Notification_Skill_RequirementsNotMet";

/// Notification shown when a skill needs the wind altar.
pub const WIND_ALTAR_MESSAGE_KEY: &str = "Notification_Skill_WindAltarRequired";

/// Start VFX value that clears the skill's start effect.
pub const VFX_NONE: &str = "NONE";

/// Partial description of an item.
///
/// `target_item_id` names the item to start from. When `new_item_id` is set
/// and differs, a new item is derived from the target; otherwise the target is
/// patched in place.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ItemTemplate {
    pub target_item_id: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_item_id: Option<i32>,
    #[serde(skip)]
    pub provenance: Option<Provenance>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_durability: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_pickable: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_usable: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qty_removed_on_use: Option<i32>,
    /// Replaces the item's tags when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_extensions: Option<Vec<ItemExtensionTemplate>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effect_behaviour: Option<EffectBehaviour>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effect_transforms: Option<Vec<EffectTransformTemplate>>,

    #[serde(default, skip_serializing_if = "ItemKindTemplate::is_basic")]
    pub kind: ItemKindTemplate,
}

impl ItemTemplate {
    pub fn new(target_item_id: i32) -> Self {
        Self {
            target_item_id,
            ..Self::default()
        }
    }

    /// Builder: derive a new item instead of patching the target.
    pub fn derive_as(mut self, new_item_id: i32) -> Self {
        self.new_item_id = Some(new_item_id);
        self
    }

    pub fn target_key(&self) -> EntityKey {
        EntityKey::Id(self.target_item_id)
    }

    /// Identifier the template writes to. Equals the target for in-place patches.
    pub fn new_key(&self) -> EntityKey {
        EntityKey::Id(self.new_item_id.unwrap_or(self.target_item_id))
    }

    /// Name used in log lines and error reports.
    pub fn document_name(&self) -> String {
        let id = self.new_item_id.unwrap_or(self.target_item_id);
        match &self.provenance {
            Some(provenance) => format!("{provenance}: item {id}"),
            None => format!("item {id}"),
        }
    }
}

impl TemplateNode for ItemTemplate {
    type Live = Item;

    /// Field errors do not stop later fields; the first one is returned.
    fn apply(&self, item: &mut Item, cx: &mut ApplyContext<'_>) -> Result<(), ApplyError> {
        self.kind.check(&item.kind)?;
        let mut first_error = None;

        assign(&mut item.name, &self.name);
        assign(&mut item.description, &self.description);
        if self.name.is_some() || self.description.is_some() {
            cx.localization.set_text(
                Namespace::Item,
                &EntityKey::Id(item.id),
                &item.name,
                &item.description,
            );
        }
        assign(&mut item.value, &self.value);
        assign(&mut item.weight, &self.weight);
        assign(&mut item.max_durability, &self.max_durability);
        assign(&mut item.is_pickable, &self.is_pickable);
        assign(&mut item.is_usable, &self.is_usable);
        assign(&mut item.qty_removed_on_use, &self.qty_removed_on_use);

        if let Some(names) = &self.tags {
            item.tag_source = Some(TagSource {
                tags: resolve_tags(names, cx),
            });
        }

        if let Some(extensions) = &self.item_extensions {
            for template in extensions {
                let slot = match item
                    .extensions
                    .iter()
                    .position(|e| e.kind() == template.kind())
                {
                    Some(index) => &mut item.extensions[index],
                    None => {
                        item.extensions.push(template.new_extension());
                        let last = item.extensions.len() - 1;
                        &mut item.extensions[last]
                    }
                };
                if let Err(e) = template.apply(slot, cx) {
                    first_error.get_or_insert(e);
                }
            }
        }

        if let Some(transforms) = &self.effect_transforms {
            let behaviour = self.effect_behaviour.unwrap_or_default();
            if let Err(e) = merge_subtree(&mut item.effects, transforms, behaviour, cx) {
                first_error.get_or_insert(e);
            }
        }

        if let Err(e) = self.kind.apply(&mut item.kind, &item.effects, cx) {
            first_error.get_or_insert(e);
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn extract(item: &Item, cx: &ExtractContext<'_>) -> Self {
        Self {
            target_item_id: item.id,
            new_item_id: None,
            provenance: None,
            name: Some(item.name.clone()),
            description: Some(item.description.clone()),
            value: Some(item.value),
            weight: Some(item.weight),
            max_durability: Some(item.max_durability),
            is_pickable: Some(item.is_pickable),
            is_usable: Some(item.is_usable),
            qty_removed_on_use: Some(item.qty_removed_on_use),
            tags: Some(
                item.tag_source
                    .as_ref()
                    .map(|source| tag_names(&source.tags, cx))
                    .unwrap_or_default(),
            ),
            item_extensions: Some(
                item.extensions
                    .iter()
                    .map(|e| ItemExtensionTemplate::extract(e, cx))
                    .collect(),
            ),
            effect_behaviour: Some(EffectBehaviour::DestroyEffects),
            effect_transforms: Some(parse_transforms(&item.effects, cx)),
            kind: ItemKindTemplate::extract(&item.kind, cx),
        }
    }
}

/// Kind-specific part of an item template.
///
/// `Basic` carries no kind data and fits any item. Every other variant only
/// fits items of the same kind.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub enum ItemKindTemplate {
    #[default]
    Basic,
    Skill(SkillTemplate),
    Weapon(WeaponTemplate),
    Ammunition(AmmunitionTemplate),
    Armor(ArmorTemplate),
    RecipeItem(RecipeItemTemplate),
}

impl ItemKindTemplate {
    pub fn is_basic(&self) -> bool {
        matches!(self, Self::Basic)
    }

    /// Kind this template requires, `None` for `Basic`.
    pub const fn required_kind(&self) -> Option<ItemKindTag> {
        match self {
            Self::Basic => None,
            Self::Skill(_) => Some(ItemKindTag::Skill),
            Self::Weapon(_) => Some(ItemKindTag::Weapon),
            Self::Ammunition(_) => Some(ItemKindTag::Ammunition),
            Self::Armor(_) => Some(ItemKindTag::Armor),
            Self::RecipeItem(_) => Some(ItemKindTag::RecipeItem),
        }
    }

    /// Rejects templates aimed at an item of another kind.
    pub fn check(&self, kind: &ItemKind) -> Result<(), ApplyError> {
        match self.required_kind() {
            Some(required) if required != kind.tag() => Err(ApplyError::KindMismatch {
                expected: kind_label(required),
                found: kind_label(kind.tag()),
            }),
            _ => Ok(()),
        }
    }

    fn apply(
        &self,
        kind: &mut ItemKind,
        effects: &EffectTransform,
        cx: &mut ApplyContext<'_>,
    ) -> Result<(), ApplyError> {
        self.check(kind)?;
        match (self, kind) {
            (Self::Skill(template), ItemKind::Skill(data)) => {
                template.apply(data, cx)?;
                data.activation_conditions = activation_conditions(effects);
                Ok(())
            }
            (Self::Weapon(template), ItemKind::Weapon(data)) => template.apply(data, cx),
            (Self::Ammunition(template), ItemKind::Ammunition(data)) => template.apply(data, cx),
            (Self::Armor(template), ItemKind::Armor(data)) => template.apply(data, cx),
            (Self::RecipeItem(template), ItemKind::RecipeItem(data)) => template.apply(data, cx),
            _ => Ok(()),
        }
    }

    fn extract(kind: &ItemKind, cx: &ExtractContext<'_>) -> Self {
        match kind {
            ItemKind::Basic => Self::Basic,
            ItemKind::Skill(data) => Self::Skill(SkillTemplate::extract(data, cx)),
            ItemKind::Weapon(data) => Self::Weapon(WeaponTemplate::extract(data, cx)),
            ItemKind::Ammunition(data) => Self::Ammunition(AmmunitionTemplate::extract(data, cx)),
            ItemKind::Armor(data) => Self::Armor(ArmorTemplate::extract(data, cx)),
            ItemKind::RecipeItem(data) => Self::RecipeItem(RecipeItemTemplate::extract(data, cx)),
        }
    }
}

const fn kind_label(tag: ItemKindTag) -> &'static str {
    match tag {
        ItemKindTag::Basic => "Item",
        ItemKindTag::Skill => "Skill",
        ItemKindTag::Weapon => "Weapon",
        ItemKindTag::Ammunition => "Ammunition",
        ItemKindTag::Armor => "Armor",
        ItemKindTag::RecipeItem => "RecipeItem",
    }
}

const fn activation_message_key(kind: &ConditionKind) -> &'static str {
    match kind {
        ConditionKind::WindAltarActivated => WIND_ALTAR_MESSAGE_KEY,
        _ => ACTIVATION_MESSAGE_KEY,
    }
}

/// Collects the conditions of every root group named like an activation group.
fn activation_conditions(effects: &EffectTransform) -> Vec<ActivationCondition> {
    effects
        .children
        .iter()
        .filter(|group| group.name.contains(ACTIVATION_GROUP_MARKER))
        .flat_map(|group| {
            group
                .conditions_in_children()
                .into_iter()
                .map(move |condition| ActivationCondition {
                    group: group.name.clone(),
                    condition: condition.clone(),
                    message_key: activation_message_key(&condition.kind).to_owned(),
                })
        })
        .collect()
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SkillTemplate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cooldown: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stamina_cost: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mana_cost: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub health_cost: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub durability_cost: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub durability_cost_percent: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vfx_on_start: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_start_vfx_on_end: Option<bool>,
    /// VFX system name, or `"NONE"` to clear it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_vfx: Option<String>,
    /// Replaces the requirement list. Unknown items are dropped.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_items: Option<Vec<RequiredItemTemplate>>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequiredItemTemplate {
    pub item_id: i32,
    #[serde(default = "super::default_quantity")]
    pub quantity: i32,
    #[serde(default)]
    pub consume: bool,
}

impl TemplateNode for SkillTemplate {
    type Live = SkillData;

    fn apply(&self, skill: &mut SkillData, cx: &mut ApplyContext<'_>) -> Result<(), ApplyError> {
        assign(&mut skill.cooldown, &self.cooldown);
        assign(&mut skill.stamina_cost, &self.stamina_cost);
        assign(&mut skill.mana_cost, &self.mana_cost);
        assign(&mut skill.health_cost, &self.health_cost);
        assign(&mut skill.durability_cost, &self.durability_cost);
        assign(&mut skill.durability_cost_percent, &self.durability_cost_percent);
        assign(&mut skill.vfx_on_start, &self.vfx_on_start);
        assign(&mut skill.stop_vfx, &self.stop_start_vfx_on_end);

        if let Some(vfx) = self.start_vfx.as_deref() {
            if vfx.eq_ignore_ascii_case(VFX_NONE) {
                skill.start_vfx = None;
            } else {
                match vfx.parse::<VfxKind>() {
                    Ok(kind) => skill.start_vfx = Some(kind),
                    Err(_) => warn!(
                        target: "content::template",
                        vfx,
                        "unknown start vfx, field skipped"
                    ),
                }
            }
        }

        if let Some(required) = &self.required_items {
            skill.required_items = required
                .iter()
                .filter_map(|req| {
                    cx.resolve_ref(Namespace::Item, &EntityKey::Id(req.item_id), "required_items")
                        .map(|item| ItemRequirement {
                            item,
                            quantity: req.quantity,
                            consume: req.consume,
                        })
                })
                .collect();
        }
        Ok(())
    }

    fn extract(skill: &SkillData, cx: &ExtractContext<'_>) -> Self {
        Self {
            cooldown: Some(skill.cooldown),
            stamina_cost: Some(skill.stamina_cost),
            mana_cost: Some(skill.mana_cost),
            health_cost: Some(skill.health_cost),
            durability_cost: Some(skill.durability_cost),
            durability_cost_percent: Some(skill.durability_cost_percent),
            vfx_on_start: Some(skill.vfx_on_start),
            stop_start_vfx_on_end: Some(skill.stop_vfx),
            start_vfx: Some(
                skill
                    .start_vfx
                    .map_or_else(|| VFX_NONE.to_owned(), |kind| kind.to_string()),
            ),
            required_items: Some(
                skill
                    .required_items
                    .iter()
                    .filter_map(|req| {
                        cx.key_of(req.item)
                            .and_then(EntityKey::as_id)
                            .map(|item_id| RequiredItemTemplate {
                                item_id,
                                quantity: req.quantity,
                                consume: req.consume,
                            })
                    })
                    .collect(),
            ),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct WeaponTemplate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weapon_type: Option<WeaponType>,
    /// Replaces the damage list when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub damage: Option<Vec<DamageTemplate>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub impact: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attack_speed: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub health_leech: Option<f32>,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DamageTemplate {
    pub damage_type: DamageKind,
    pub damage: f32,
}

impl TemplateNode for WeaponTemplate {
    type Live = WeaponData;

    fn apply(&self, weapon: &mut WeaponData, _cx: &mut ApplyContext<'_>) -> Result<(), ApplyError> {
        assign(&mut weapon.weapon_type, &self.weapon_type);
        if let Some(damage) = &self.damage {
            weapon.damage = damage
                .iter()
                .map(|d| DamageEntry {
                    kind: d.damage_type,
                    amount: d.damage,
                })
                .collect();
        }
        assign(&mut weapon.impact, &self.impact);
        assign(&mut weapon.attack_speed, &self.attack_speed);
        assign(&mut weapon.health_leech, &self.health_leech);
        Ok(())
    }

    fn extract(weapon: &WeaponData, _cx: &ExtractContext<'_>) -> Self {
        Self {
            weapon_type: Some(weapon.weapon_type),
            damage: Some(
                weapon
                    .damage
                    .iter()
                    .map(|d| DamageTemplate {
                        damage_type: d.kind,
                        damage: d.amount,
                    })
                    .collect(),
            ),
            impact: Some(weapon.impact),
            attack_speed: Some(weapon.attack_speed),
            health_leech: Some(weapon.health_leech),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AmmunitionTemplate {
    #[serde(default)]
    pub weapon: WeaponTemplate,
    /// Number of projectiles kept pooled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pool_capacity: Option<i32>,
}

impl TemplateNode for AmmunitionTemplate {
    type Live = AmmunitionData;

    fn apply(
        &self,
        ammo: &mut AmmunitionData,
        cx: &mut ApplyContext<'_>,
    ) -> Result<(), ApplyError> {
        self.weapon.apply(&mut ammo.weapon, cx)?;
        assign(&mut ammo.pool_capacity, &self.pool_capacity);
        Ok(())
    }

    fn extract(ammo: &AmmunitionData, cx: &ExtractContext<'_>) -> Self {
        Self {
            weapon: WeaponTemplate::extract(&ammo.weapon, cx),
            pool_capacity: Some(ammo.pool_capacity),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ArmorTemplate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slot: Option<EquipmentSlot>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub damage_resistance: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protection: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub movement_penalty: Option<f32>,
}

impl TemplateNode for ArmorTemplate {
    type Live = ArmorData;

    fn apply(&self, armor: &mut ArmorData, _cx: &mut ApplyContext<'_>) -> Result<(), ApplyError> {
        assign(&mut armor.slot, &self.slot);
        assign(&mut armor.damage_resistance, &self.damage_resistance);
        assign(&mut armor.protection, &self.protection);
        assign(&mut armor.movement_penalty, &self.movement_penalty);
        Ok(())
    }

    fn extract(armor: &ArmorData, _cx: &ExtractContext<'_>) -> Self {
        Self {
            slot: Some(armor.slot),
            damage_resistance: Some(armor.damage_resistance),
            protection: Some(armor.protection),
            movement_penalty: Some(armor.movement_penalty),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RecipeItemTemplate {
    /// UID of the taught recipe. `""` clears it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipe_uid: Option<String>,
}

impl TemplateNode for RecipeItemTemplate {
    type Live = RecipeItemData;

    /// An unknown UID leaves the recipe untouched without a warning.
    fn apply(
        &self,
        data: &mut RecipeItemData,
        cx: &mut ApplyContext<'_>,
    ) -> Result<(), ApplyError> {
        match self.recipe_uid.as_deref() {
            None => {}
            Some("") => data.recipe = None,
            Some(uid) => match cx.registry.resolve(Namespace::Recipe, &uid.into()) {
                Some(recipe) => data.recipe = Some(recipe),
                None => debug!(
                    target: "content::template",
                    recipe_uid = uid,
                    "recipe not registered, recipe item left unchanged"
                ),
            },
        }
        Ok(())
    }

    fn extract(data: &RecipeItemData, cx: &ExtractContext<'_>) -> Self {
        Self {
            recipe_uid: Some(cx.name_of(data.recipe)),
        }
    }
}

/// Optional item components. Matched to the live item by kind and created
/// when missing.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ItemExtensionTemplate {
    Preserver(PreserverTemplate),
    CounterAbsorb(CounterAbsorbTemplate),
    AddOn(AddOnTemplate),
}

impl ItemExtensionTemplate {
    pub const fn kind(&self) -> ExtensionKind {
        match self {
            Self::Preserver(_) => ExtensionKind::Preserver,
            Self::CounterAbsorb(_) => ExtensionKind::CounterAbsorb,
            Self::AddOn(_) => ExtensionKind::AddOn,
        }
    }

    fn new_extension(&self) -> ItemExtension {
        match self {
            Self::Preserver(_) => ItemExtension::Preserver(Preserver::default()),
            Self::CounterAbsorb(_) => ItemExtension::CounterAbsorb(CounterAbsorb::default()),
            Self::AddOn(_) => ItemExtension::AddOn(ItemAddOn::default()),
        }
    }
}

impl TemplateNode for ItemExtensionTemplate {
    type Live = ItemExtension;

    fn apply(
        &self,
        target: &mut ItemExtension,
        cx: &mut ApplyContext<'_>,
    ) -> Result<(), ApplyError> {
        match (self, target) {
            (Self::Preserver(template), ItemExtension::Preserver(preserver)) => {
                template.apply(preserver, cx)
            }
            (Self::CounterAbsorb(template), ItemExtension::CounterAbsorb(absorb)) => {
                template.apply(absorb, cx)
            }
            (Self::AddOn(template), ItemExtension::AddOn(add_on)) => template.apply(add_on, cx),
            (template, live) => Err(ApplyError::KindMismatch {
                expected: extension_label(template.kind()),
                found: extension_label(live.kind()),
            }),
        }
    }

    fn extract(source: &ItemExtension, cx: &ExtractContext<'_>) -> Self {
        match source {
            ItemExtension::Preserver(preserver) => {
                Self::Preserver(PreserverTemplate::extract(preserver, cx))
            }
            ItemExtension::CounterAbsorb(absorb) => {
                Self::CounterAbsorb(CounterAbsorbTemplate::extract(absorb, cx))
            }
            ItemExtension::AddOn(add_on) => Self::AddOn(AddOnTemplate::extract(add_on, cx)),
        }
    }
}

const fn extension_label(kind: ExtensionKind) -> &'static str {
    match kind {
        ExtensionKind::Preserver => "Preserver",
        ExtensionKind::CounterAbsorb => "CounterAbsorb",
        ExtensionKind::AddOn => "ItemAddOn",
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PreserverTemplate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nullify_perish: Option<bool>,
    /// Replaces the element list. Elements with an unknown tag are dropped.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preserved_elements: Option<Vec<PreservedElementTemplate>>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PreservedElementTemplate {
    pub preservation: f32,
    pub tag: String,
}

impl TemplateNode for PreserverTemplate {
    type Live = Preserver;

    fn apply(&self, preserver: &mut Preserver, cx: &mut ApplyContext<'_>) -> Result<(), ApplyError> {
        assign(&mut preserver.nullify_perish, &self.nullify_perish);
        if let Some(elements) = &self.preserved_elements {
            preserver.preserved_elements = elements
                .iter()
                .filter_map(|element| {
                    cx.resolve_tag(&element.tag).map(|tag| PreservedElement {
                        preservation: element.preservation,
                        tag,
                    })
                })
                .collect();
        }
        Ok(())
    }

    fn extract(preserver: &Preserver, cx: &ExtractContext<'_>) -> Self {
        Self {
            nullify_perish: Some(preserver.nullify_perish),
            preserved_elements: Some(
                preserver
                    .preserved_elements
                    .iter()
                    .filter_map(|element| {
                        cx.tag_name(element.tag).map(|tag| PreservedElementTemplate {
                            preservation: element.preservation,
                            tag,
                        })
                    })
                    .collect(),
            ),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CounterAbsorbTemplate {
    /// Replaces the absorb list when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub absorbs: Option<Vec<AbsorbTemplate>>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AbsorbTemplate {
    /// Must be a `BooleanCondition`; absent keeps the default (always valid).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<ConditionTemplate>,
    #[serde(default)]
    pub damage_types: Vec<DamageKind>,
}

impl TemplateNode for CounterAbsorbTemplate {
    type Live = CounterAbsorb;

    fn apply(&self, absorb: &mut CounterAbsorb, cx: &mut ApplyContext<'_>) -> Result<(), ApplyError> {
        let Some(templates) = &self.absorbs else {
            return Ok(());
        };
        let mut absorbs = Vec::with_capacity(templates.len());
        for template in templates {
            let mut condition = EffectCondition {
                invert: false,
                kind: ConditionKind::Boolean { valid: true },
            };
            if let Some(condition_template) = &template.condition {
                condition_template.apply(&mut condition, cx)?;
            }
            absorbs.push(AbsorbEntry {
                condition,
                damage_types: template.damage_types.clone(),
            });
        }
        absorb.absorbs = absorbs;
        Ok(())
    }

    fn extract(absorb: &CounterAbsorb, cx: &ExtractContext<'_>) -> Self {
        Self {
            absorbs: Some(
                absorb
                    .absorbs
                    .iter()
                    .map(|entry| AbsorbTemplate {
                        condition: Some(ConditionTemplate::extract(&entry.condition, cx)),
                        damage_types: entry.damage_types.clone(),
                    })
                    .collect(),
            ),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AddOnTemplate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub add_on_compatible_item_id: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub add_on_state_prefab_item_id: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snapping_radius: Option<f32>,
}

impl TemplateNode for AddOnTemplate {
    type Live = ItemAddOn;

    /// Unknown item ids keep the current reference.
    fn apply(&self, add_on: &mut ItemAddOn, cx: &mut ApplyContext<'_>) -> Result<(), ApplyError> {
        apply_item_ref(
            &mut add_on.compatible_item,
            self.add_on_compatible_item_id,
            "add_on_compatible_item_id",
            cx,
        );
        apply_item_ref(
            &mut add_on.state_item,
            self.add_on_state_prefab_item_id,
            "add_on_state_prefab_item_id",
            cx,
        );
        assign(&mut add_on.snapping_radius, &self.snapping_radius);
        Ok(())
    }

    fn extract(add_on: &ItemAddOn, cx: &ExtractContext<'_>) -> Self {
        Self {
            add_on_compatible_item_id: Some(cx.id_of(add_on.compatible_item)),
            add_on_state_prefab_item_id: Some(cx.id_of(add_on.state_item)),
            snapping_radius: Some(add_on.snapping_radius),
        }
    }
}

/// `-1` clears the reference.
fn apply_item_ref(
    slot: &mut Option<EntityHandle>,
    id: Option<i32>,
    field: &'static str,
    cx: &ApplyContext<'_>,
) {
    match id {
        None => {}
        Some(-1) => *slot = None,
        Some(id) => {
            if let Some(item) = cx.resolve_ref(Namespace::Item, &EntityKey::Id(id), field) {
                *slot = Some(item);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use patchkit_core::{
        Effect, EntityHandle, Localization, LocalizationTable, TagCatalog, TagTable,
    };

    use super::*;
    use crate::registry::Registry;
    use crate::template::{ConditionTemplate, EffectTemplate};

    struct Fixture {
        registry: Registry,
        tags: TagTable,
        localization: LocalizationTable,
    }

    impl Fixture {
        fn new() -> Self {
            let mut registry = Registry::new();
            registry
                .register(Namespace::Item, EntityKey::Id(4100), EntityHandle(1), false)
                .unwrap();
            Self {
                registry,
                tags: TagTable::from_names(["Weapon", "Food"]).unwrap(),
                localization: LocalizationTable::new(),
            }
        }

        fn cx(&mut self) -> ApplyContext<'_> {
            ApplyContext {
                registry: &self.registry,
                tags: &self.tags,
                localization: &mut self.localization,
                max_depth: 8,
            }
        }

        fn ecx(&self) -> ExtractContext<'_> {
            ExtractContext {
                registry: &self.registry,
                tags: &self.tags,
            }
        }
    }

    fn skill_item() -> Item {
        Item::new(8100, "Spark").with_kind(ItemKind::Skill(SkillData {
            cooldown: 2.0,
            mana_cost: 5.0,
            ..SkillData::default()
        }))
    }

    #[test]
    fn absent_fields_are_untouched() {
        let mut fx = Fixture::new();
        let mut item = skill_item();
        let before = item.clone();

        ItemTemplate::new(8100).apply(&mut item, &mut fx.cx()).unwrap();

        assert_eq!(item, before);
    }

    #[test]
    fn skill_fields_apply_in_sequence() {
        let mut fx = Fixture::new();
        let mut item = skill_item();

        let mut first = ItemTemplate::new(8100);
        first.kind = ItemKindTemplate::Skill(SkillTemplate {
            cooldown: Some(5.0),
            ..SkillTemplate::default()
        });
        first.apply(&mut item, &mut fx.cx()).unwrap();

        let mut second = ItemTemplate::new(8100);
        second.kind = ItemKindTemplate::Skill(SkillTemplate {
            mana_cost: Some(10.0),
            ..SkillTemplate::default()
        });
        second.apply(&mut item, &mut fx.cx()).unwrap();

        let ItemKind::Skill(skill) = &item.kind else {
            panic!("expected a skill");
        };
        assert_eq!(skill.cooldown, 5.0);
        assert_eq!(skill.mana_cost, 10.0);
    }

    #[test]
    fn kind_mismatch_rejects_before_any_write() {
        let mut fx = Fixture::new();
        let mut item = Item::new(100, "Sword");
        let mut template = ItemTemplate::new(100);
        template.name = Some("Renamed".into());
        template.kind = ItemKindTemplate::Skill(SkillTemplate::default());

        let err = template.apply(&mut item, &mut fx.cx()).unwrap_err();

        assert_eq!(
            err,
            ApplyError::KindMismatch {
                expected: "Skill",
                found: "Item"
            }
        );
        assert_eq!(item.name, "Sword");
    }

    #[test]
    fn basic_template_fits_any_kind() {
        let mut fx = Fixture::new();
        let mut item = skill_item();
        let mut template = ItemTemplate::new(8100);
        template.value = Some(40);

        template.apply(&mut item, &mut fx.cx()).unwrap();

        assert_eq!(item.value, 40);
    }

    #[test]
    fn required_items_skip_unknown_ids() {
        let mut fx = Fixture::new();
        let mut item = skill_item();
        let mut template = ItemTemplate::new(8100);
        template.kind = ItemKindTemplate::Skill(SkillTemplate {
            required_items: Some(vec![
                RequiredItemTemplate {
                    item_id: 4100,
                    quantity: 2,
                    consume: true,
                },
                RequiredItemTemplate {
                    item_id: 9999,
                    quantity: 1,
                    consume: false,
                },
            ]),
            ..SkillTemplate::default()
        });

        template.apply(&mut item, &mut fx.cx()).unwrap();

        let ItemKind::Skill(skill) = &item.kind else {
            panic!("expected a skill");
        };
        assert_eq!(
            skill.required_items,
            vec![ItemRequirement {
                item: EntityHandle(1),
                quantity: 2,
                consume: true
            }]
        );
    }

    #[test]
    fn start_vfx_none_clears() {
        let mut fx = Fixture::new();
        let mut item = skill_item();
        if let ItemKind::Skill(skill) = &mut item.kind {
            skill.start_vfx = Some(VfxKind::Fire);
        }
        let mut template = ItemTemplate::new(8100);
        template.kind = ItemKindTemplate::Skill(SkillTemplate {
            start_vfx: Some("NONE".into()),
            ..SkillTemplate::default()
        });

        template.apply(&mut item, &mut fx.cx()).unwrap();

        let ItemKind::Skill(skill) = &item.kind else {
            panic!("expected a skill");
        };
        assert!(skill.start_vfx.is_none());
    }

    #[test]
    fn activation_conditions_come_from_activation_groups() {
        let mut fx = Fixture::new();
        let mut item = skill_item();
        let mut template = ItemTemplate::new(8100);
        template.effect_transforms = Some(vec![
            EffectTransformTemplate {
                effect_conditions: vec![
                    ConditionTemplate::BooleanCondition {
                        invert: None,
                        valid: Some(false),
                    },
                    ConditionTemplate::WindAltarActivatedCondition { invert: None },
                ],
                ..EffectTransformTemplate::new("ActivationEffects")
            },
            EffectTransformTemplate {
                effects: vec![EffectTemplate::AffectHealth {
                    affect_quantity: Some(3.0),
                }],
                effect_conditions: vec![ConditionTemplate::ProbabilityCondition {
                    invert: None,
                    chance_percent: Some(10),
                }],
                ..EffectTransformTemplate::new("Effects")
            },
        ]);

        template.apply(&mut item, &mut fx.cx()).unwrap();

        let ItemKind::Skill(skill) = &item.kind else {
            panic!("expected a skill");
        };
        assert_eq!(skill.activation_conditions.len(), 2);
        let activation = &skill.activation_conditions[0];
        assert_eq!(activation.group, "ActivationEffects");
        assert_eq!(activation.message_key, ACTIVATION_MESSAGE_KEY);
        assert_eq!(activation.condition.kind, ConditionKind::Boolean { valid: false });
        let altar = &skill.activation_conditions[1];
        assert_eq!(altar.condition.kind, ConditionKind::WindAltarActivated);
        assert_eq!(altar.message_key, WIND_ALTAR_MESSAGE_KEY);
        assert_eq!(
            item.effects.child("Effects").unwrap().effects,
            vec![Effect::AffectHealth { quantity: 3.0 }]
        );
    }

    #[test]
    fn tags_replace_and_skip_unknown() {
        let mut fx = Fixture::new();
        let mut item = Item::new(100, "Sword");
        let mut template = ItemTemplate::new(100);
        template.tags = Some(vec!["Weapon".into(), "Missing".into()]);

        template.apply(&mut item, &mut fx.cx()).unwrap();

        let weapon = fx.tags.resolve_tag("Weapon").unwrap();
        assert_eq!(item.tag_source, Some(TagSource { tags: vec![weapon] }));
    }

    #[test]
    fn preserver_is_created_when_missing() {
        let mut fx = Fixture::new();
        let mut item = Item::new(5000, "Cooler");
        let mut template = ItemTemplate::new(5000);
        template.item_extensions = Some(vec![ItemExtensionTemplate::Preserver(
            PreserverTemplate {
                nullify_perish: Some(false),
                preserved_elements: Some(vec![PreservedElementTemplate {
                    preservation: 75.0,
                    tag: "Food".into(),
                }]),
            },
        )]);

        template.apply(&mut item, &mut fx.cx()).unwrap();

        let Some(ItemExtension::Preserver(preserver)) =
            item.extension(ExtensionKind::Preserver)
        else {
            panic!("expected a preserver");
        };
        assert_eq!(preserver.preserved_elements.len(), 1);
        assert_eq!(preserver.preserved_elements[0].preservation, 75.0);
    }

    #[test]
    fn counter_absorb_round_trips() {
        let mut fx = Fixture::new();
        let mut item = Item::new(8250, "Counter Strike");
        let mut template = ItemTemplate::new(8250);
        template.item_extensions = Some(vec![ItemExtensionTemplate::CounterAbsorb(
            CounterAbsorbTemplate {
                absorbs: Some(vec![
                    AbsorbTemplate {
                        condition: Some(ConditionTemplate::BooleanCondition {
                            invert: Some(true),
                            valid: None,
                        }),
                        damage_types: vec![DamageKind::Fire, DamageKind::Frost],
                    },
                    AbsorbTemplate {
                        condition: None,
                        damage_types: vec![DamageKind::Physical],
                    },
                ]),
            },
        )]);
        template.apply(&mut item, &mut fx.cx()).unwrap();

        let Some(ItemExtension::CounterAbsorb(absorb)) =
            item.extension(ExtensionKind::CounterAbsorb)
        else {
            panic!("expected a counter absorb");
        };
        assert_eq!(absorb.absorbs.len(), 2);
        assert!(absorb.absorbs[0].condition.invert);
        assert_eq!(
            absorb.absorbs[1].condition.kind,
            ConditionKind::Boolean { valid: true }
        );

        let extracted = ItemTemplate::extract(&item, &fx.ecx());
        let mut fresh = Item::new(8250, "Counter Strike");
        extracted.apply(&mut fresh, &mut fx.cx()).unwrap();
        assert_eq!(fresh.extensions, item.extensions);
    }

    #[test]
    fn counter_absorb_rejects_other_conditions() {
        let mut fx = Fixture::new();
        let mut absorb = CounterAbsorb::default();
        let template = CounterAbsorbTemplate {
            absorbs: Some(vec![AbsorbTemplate {
                condition: Some(ConditionTemplate::ProbabilityCondition {
                    invert: None,
                    chance_percent: Some(20),
                }),
                damage_types: vec![DamageKind::Decay],
            }]),
        };

        let err = template.apply(&mut absorb, &mut fx.cx()).unwrap_err();

        assert!(matches!(err, ApplyError::KindMismatch { .. }));
        assert!(absorb.absorbs.is_empty());
    }

    #[test]
    fn add_on_round_trips() {
        let mut fx = Fixture::new();
        let mut item = Item::new(5100, "Tent Add-On");
        let mut template = ItemTemplate::new(5100);
        template.item_extensions = Some(vec![ItemExtensionTemplate::AddOn(AddOnTemplate {
            add_on_compatible_item_id: Some(4100),
            add_on_state_prefab_item_id: Some(9999),
            snapping_radius: Some(2.5),
        })]);
        template.apply(&mut item, &mut fx.cx()).unwrap();

        let Some(ItemExtension::AddOn(add_on)) = item.extension(ExtensionKind::AddOn) else {
            panic!("expected an add-on");
        };
        assert_eq!(add_on.compatible_item, Some(EntityHandle(1)));
        assert_eq!(add_on.state_item, None);
        assert_eq!(add_on.snapping_radius, 2.5);

        let extracted = ItemTemplate::extract(&item, &fx.ecx());
        let Some(extensions) = &extracted.item_extensions else {
            panic!("extensions are always extracted");
        };
        assert_eq!(
            extensions[0],
            ItemExtensionTemplate::AddOn(AddOnTemplate {
                add_on_compatible_item_id: Some(4100),
                add_on_state_prefab_item_id: Some(-1),
                snapping_radius: Some(2.5),
            })
        );
        let mut fresh = Item::new(5100, "Tent Add-On");
        extracted.apply(&mut fresh, &mut fx.cx()).unwrap();
        assert_eq!(fresh.extensions, item.extensions);
    }

    #[test]
    fn name_change_is_published() {
        let mut fx = Fixture::new();
        let mut item = Item::new(100, "Sword");
        let mut template = ItemTemplate::new(100);
        template.name = Some("Fire Sword".into());

        template.apply(&mut item, &mut fx.cx()).unwrap();

        let text = fx
            .localization
            .text(Namespace::Item, &EntityKey::Id(100))
            .unwrap();
        assert_eq!(text.name, "Fire Sword");
    }

    #[test]
    fn extract_then_apply_reproduces_item() {
        let mut fx = Fixture::new();
        let mut source = skill_item();
        let mut template = ItemTemplate::new(8100);
        template.tags = Some(vec!["Weapon".into()]);
        template.effect_transforms = Some(vec![EffectTransformTemplate {
            effects: vec![EffectTemplate::AffectStamina {
                affect_quantity: Some(-8.0),
            }],
            ..EffectTransformTemplate::new("Effects")
        }]);
        template.kind = ItemKindTemplate::Skill(SkillTemplate {
            start_vfx: Some("Frost".into()),
            required_items: Some(vec![RequiredItemTemplate {
                item_id: 4100,
                quantity: 1,
                consume: false,
            }]),
            ..SkillTemplate::default()
        });
        template.apply(&mut source, &mut fx.cx()).unwrap();

        let extracted = ItemTemplate::extract(&source, &fx.ecx());
        let mut pristine = skill_item();
        pristine.effects.child_or_insert("Stale").effects.push(Effect::AffectHealth {
            quantity: 1.0,
        });
        extracted.apply(&mut pristine, &mut fx.cx()).unwrap();

        assert_eq!(pristine, source);
    }
}
