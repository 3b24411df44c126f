//! Loading session: ties the cloner, templates and scheduler together.
//!
//! A session owns the [`PatchContext`] and the [`Scheduler`] for one host.
//! Collections are loaded in [`ContentKind::LOAD_ORDER`]; each template is
//! either applied straight away or queued behind a gate, and
//! [`ContentSession::finish_loading`] opens the gates in order.
//!
//! | Collection      | At load                         | Applied at      |
//! |-----------------|---------------------------------|-----------------|
//! | status / imbue  | clone or snapshot               | `ItemsReady`    |
//! | items           | kind check, clone or snapshot   | `ItemsReady`    |
//! | recipe items    | kind check, clone or snapshot   | `RecipesReady`  |
//! | recipes         | fresh object, overwrite         | `ItemsReady`    |
//! | enchantments    | fresh object, no overwrite      | immediately     |
//! | characters      | fresh object, no overwrite      | immediately     |

use patchkit_core::{
    AssetKind, Character, EntityHandle, EntityKey, Enchantment, LocalizationTable, Localization,
    Namespace, Prefab, PrefabHost, PrefabObject, Recipe, TagCatalog, TagTable,
};
use tracing::{debug, error, info, warn};

use crate::context::PatchContext;
use crate::error::ApplyError;
use crate::scheduler::{Gate, GateReport, Scheduled, Scheduler};
use crate::template::{
    CharacterTemplate, EnchantmentTemplate, ImbueEffectTemplate, ItemKindTemplate, ItemTemplate,
    RecipeTemplate, StatusEffectTemplate, TemplateDocument, TemplateNode,
};

/// Sub-collections of a content pack.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, strum::Display, strum::AsRefStr,
)]
pub enum ContentKind {
    AssetBundles,
    AudioClips,
    Textures,
    StatusEffects,
    Items,
    Recipes,
    Characters,
    Enchantments,
}

impl ContentKind {
    /// Order in which a pack's collections are loaded.
    pub const LOAD_ORDER: [Self; 8] = [
        Self::AssetBundles,
        Self::AudioClips,
        Self::Textures,
        Self::StatusEffects,
        Self::Items,
        Self::Recipes,
        Self::Characters,
        Self::Enchantments,
    ];

    /// Folder of the pack holding this collection.
    pub const fn folder_name(self) -> &'static str {
        match self {
            Self::AssetBundles => "AssetBundles",
            Self::AudioClips => "AudioClip",
            Self::Textures => "Texture2D",
            Self::StatusEffects => "StatusEffects",
            Self::Items => "Items",
            Self::Recipes => "Recipes",
            Self::Characters => "Characters",
            Self::Enchantments => "Enchantments",
        }
    }

    pub const fn asset_kind(self) -> Option<AssetKind> {
        match self {
            Self::AssetBundles => Some(AssetKind::AssetBundle),
            Self::AudioClips => Some(AssetKind::AudioClip),
            Self::Textures => Some(AssetKind::Texture),
            _ => None,
        }
    }

    pub const fn is_asset(self) -> bool {
        self.asset_kind().is_some()
    }

    /// Collections that are skipped on hot reload.
    pub const fn initial_load_only(self) -> bool {
        matches!(self, Self::Characters | Self::Enchantments)
    }

    /// Whether templates may also sit one subfolder deep.
    pub const fn reads_subfolders(self) -> bool {
        matches!(self, Self::StatusEffects | Self::Items)
    }

    /// Dependency stage. Collections of a lower stage load first.
    const fn stage(self) -> u8 {
        match self {
            Self::AssetBundles | Self::AudioClips | Self::Textures => 0,
            Self::StatusEffects => 1,
            Self::Items => 2,
            Self::Recipes => 3,
            Self::Characters | Self::Enchantments => 4,
        }
    }
}

/// Reports of both gates, in opening order.
#[derive(Debug, Default, PartialEq)]
pub struct LoadReport {
    pub items_ready: GateReport,
    pub recipes_ready: GateReport,
}

impl LoadReport {
    pub fn failures(&self) -> impl Iterator<Item = &(String, ApplyError)> {
        self.items_ready
            .failures
            .iter()
            .chain(&self.recipes_ready.failures)
    }
}

/// One loading session over a host.
pub struct ContentSession<H, T = TagTable, L = LocalizationTable> {
    cx: PatchContext<H, T, L>,
    scheduler: Scheduler<PatchContext<H, T, L>>,
    pub(crate) packs: Vec<String>,
    pub(crate) stage: Option<ContentKind>,
    hot_reload: bool,
}

impl<H, T, L> ContentSession<H, T, L>
where
    H: PrefabHost + 'static,
    T: TagCatalog + 'static,
    L: Localization + 'static,
{
    /// Starts a session and registers every object the host already holds.
    pub fn new(host: H, tags: T, localization: L) -> Self {
        let mut cx = PatchContext::new(host, tags, localization);
        let indexed = cx.index_host();
        debug!(target: "content::session", indexed, "indexed host objects");
        Self::from_context(cx)
    }

    /// Starts a session over a context whose registry is already populated.
    pub fn from_context(cx: PatchContext<H, T, L>) -> Self {
        Self {
            cx,
            scheduler: Scheduler::new(),
            packs: Vec::new(),
            stage: None,
            hot_reload: false,
        }
    }

    /// Builder: nesting limit for effect groups.
    pub fn with_max_effect_depth(mut self, depth: usize) -> Self {
        self.cx.max_effect_depth = depth;
        self
    }

    /// Builder: treat this pass as a hot reload.
    pub fn with_hot_reload(mut self, hot_reload: bool) -> Self {
        self.hot_reload = hot_reload;
        self
    }

    pub fn context(&self) -> &PatchContext<H, T, L> {
        &self.cx
    }

    pub fn context_mut(&mut self) -> &mut PatchContext<H, T, L> {
        &mut self.cx
    }

    pub fn into_context(self) -> PatchContext<H, T, L> {
        self.cx
    }

    pub fn host(&self) -> &H {
        &self.cx.host
    }

    pub fn is_hot_reload(&self) -> bool {
        self.hot_reload
    }

    /// True once both gates are open.
    pub fn is_loaded(&self) -> bool {
        self.scheduler.is_open(Gate::RecipesReady)
    }

    /// Names of the packs loaded in this pass.
    pub fn packs(&self) -> &[String] {
        &self.packs
    }

    pub fn resolve(&self, namespace: Namespace, key: &EntityKey) -> Option<EntityHandle> {
        self.cx.registry.resolve(namespace, key)
    }

    /// Prefab behind the handle registered for `key`.
    pub fn get(&self, namespace: Namespace, key: &EntityKey) -> Option<&Prefab> {
        self.resolve(namespace, key)
            .and_then(|handle| self.cx.host.prefab(handle))
    }

    /// Pristine snapshot of `key`, taken before its first in-place patch.
    pub fn original(&self, namespace: Namespace, key: &EntityKey) -> Option<&Prefab> {
        self.cx
            .original(namespace, key)
            .and_then(|handle| self.cx.host.prefab(handle))
    }

    /// Loads one collection, returning a result per template in document order.
    ///
    /// Collections must arrive in [`ContentKind::LOAD_ORDER`]. Templates whose
    /// document type does not belong to `kind` fail with `MalformedDocument`.
    pub fn load_collection(
        &mut self,
        kind: ContentKind,
        documents: Vec<TemplateDocument>,
    ) -> Vec<Result<EntityHandle, ApplyError>> {
        self.enter_stage(kind);
        if self.hot_reload && kind.initial_load_only() {
            debug!(target: "content::session", kind = %kind, "skipped on hot reload");
            return Vec::new();
        }

        let mut results = Vec::with_capacity(documents.len());
        for document in documents {
            match (kind, document) {
                (ContentKind::StatusEffects, TemplateDocument::StatusEffect(template)) => {
                    results.push(self.load_status_effect(template));
                }
                (ContentKind::StatusEffects, TemplateDocument::ImbueEffect(template)) => {
                    results.push(self.load_imbue_effect(template));
                }
                (ContentKind::Items, TemplateDocument::Item(template)) => {
                    results.push(self.load_item(template));
                }
                (ContentKind::Items, TemplateDocument::Items(templates)) => {
                    for template in templates {
                        results.push(self.load_item(template));
                    }
                }
                (ContentKind::Recipes, TemplateDocument::Recipe(template)) => {
                    results.push(self.load_recipe(template));
                }
                (ContentKind::Enchantments, TemplateDocument::Enchantment(template)) => {
                    results.push(self.load_enchantment(template));
                }
                (ContentKind::Characters, TemplateDocument::Character(template)) => {
                    results.push(self.load_character(template));
                }
                (kind, other) => {
                    let e = ApplyError::malformed(
                        format!("{} document", other.kind_name()),
                        format!("does not belong in the {kind} collection"),
                    );
                    error!(target: "content::session", error = %e, "document rejected");
                    results.push(Err(e));
                }
            }
        }
        results
    }

    /// Opens `ItemsReady`, then `RecipesReady`, running every queued template.
    pub fn finish_loading(&mut self) -> LoadReport {
        let items_ready = self.scheduler.open_gate(Gate::ItemsReady, &mut self.cx);
        let recipes_ready = self.scheduler.open_gate(Gate::RecipesReady, &mut self.cx);
        self.stage = None;
        info!(
            target: "content::session",
            packs = self.packs.len(),
            applied = items_ready.succeeded() + recipes_ready.succeeded(),
            failed = items_ready.failures.len() + recipes_ready.failures.len(),
            "content loaded"
        );
        LoadReport {
            items_ready,
            recipes_ready,
        }
    }

    /// Closes the gates for a hot reload pass over an already loaded session.
    ///
    /// Live objects, the registry and pristine snapshots are kept; characters
    /// and enchantments are not loaded again.
    pub fn begin_reload(&mut self) {
        let dropped = self.scheduler.reset();
        if dropped > 0 {
            debug!(target: "content::session", dropped, "stale templates discarded");
        }
        self.packs.clear();
        self.stage = None;
        self.hot_reload = true;
    }

    /// Creates or patches an item outside of a pack.
    ///
    /// After loading the template is applied before this returns; before that
    /// it waits for the gate like any pack template.
    pub fn create_custom_item(&mut self, template: ItemTemplate) -> Result<EntityHandle, ApplyError> {
        self.load_item(template)
    }

    pub fn load_status_effect(
        &mut self,
        template: StatusEffectTemplate,
    ) -> Result<EntityHandle, ApplyError> {
        let label = template.document_name();
        let handle = self
            .cx
            .obtain_mutable(Namespace::StatusEffect, &template.target_key(), &template.new_key())
            .inspect_err(|e| report_failure(&label, e))?;
        self.defer(Gate::ItemsReady, label, handle, move |cx| {
            apply_to(cx, handle, &template, "StatusEffect", Prefab::as_status_effect_mut)
        })
    }

    pub fn load_imbue_effect(
        &mut self,
        template: ImbueEffectTemplate,
    ) -> Result<EntityHandle, ApplyError> {
        let label = template.document_name();
        let handle = self
            .cx
            .obtain_mutable(Namespace::EffectPreset, &template.target_key(), &template.new_key())
            .inspect_err(|e| report_failure(&label, e))?;
        self.defer(Gate::ItemsReady, label, handle, move |cx| {
            apply_to(cx, handle, &template, "ImbuePreset", Prefab::as_imbue_preset_mut)
        })
    }

    /// Clones or snapshots the item now; applies it at `ItemsReady`, or at
    /// `RecipesReady` for recipe items.
    pub fn load_item(&mut self, template: ItemTemplate) -> Result<EntityHandle, ApplyError> {
        let label = template.document_name();
        let handle = self
            .prepare_item(&template)
            .inspect_err(|e| report_failure(&label, e))?;
        let gate = match template.kind {
            ItemKindTemplate::RecipeItem(_) => Gate::RecipesReady,
            _ => Gate::ItemsReady,
        };
        self.defer(gate, label, handle, move |cx| {
            apply_to(cx, handle, &template, "Item", Prefab::as_item_mut)
        })
    }

    fn prepare_item(&mut self, template: &ItemTemplate) -> Result<EntityHandle, ApplyError> {
        let target = template.target_key();
        let source = self.cx.source_handle(Namespace::Item, &target)?;
        let item = self
            .cx
            .host
            .item(source)
            .ok_or(ApplyError::MissingHandle(source))?;
        template.kind.check(&item.kind)?;

        self.cx
            .obtain_mutable(Namespace::Item, &target, &template.new_key())
    }

    /// Registers a fresh recipe under its UID, replacing any previous one.
    pub fn load_recipe(&mut self, template: RecipeTemplate) -> Result<EntityHandle, ApplyError> {
        let label = template.document_name();
        let key = template.key();
        let handle = self.cx.host.spawn(PrefabObject::new(Prefab::Recipe(Recipe::new(
            template.uid.clone(),
        ))));
        let replaced = self
            .cx
            .registry
            .register(Namespace::Recipe, key, handle, true)
            .inspect_err(|e| report_failure(&label, e))?;
        if let Some(previous) = replaced {
            debug!(
                target: "content::session",
                recipe = %template.uid,
                previous = %previous,
                "replaced recipe"
            );
        }
        self.defer(Gate::ItemsReady, label, handle, move |cx| {
            apply_to(cx, handle, &template, "Recipe", Prefab::as_recipe_mut)
        })
    }

    /// Builds a new enchantment. Its identifier must be unused.
    pub fn load_enchantment(
        &mut self,
        template: EnchantmentTemplate,
    ) -> Result<EntityHandle, ApplyError> {
        let label = template.document_name();
        let data = Prefab::Enchantment(Enchantment {
            id: template.enchantment_id,
            ..Enchantment::default()
        });
        let handle = self
            .spawn_fresh(Namespace::Enchantment, template.key(), data)
            .inspect_err(|e| report_failure(&label, e))?;
        apply_to(
            &mut self.cx,
            handle,
            &template,
            "Enchantment",
            Prefab::as_enchantment_mut,
        )
        .inspect_err(|e| report_failure(&label, e))?;
        Ok(handle)
    }

    /// Builds a new character definition. Its UID must be unused.
    pub fn load_character(
        &mut self,
        template: CharacterTemplate,
    ) -> Result<EntityHandle, ApplyError> {
        let label = template.document_name();
        let data = Prefab::Character(Character {
            uid: template.uid.clone(),
            ..Character::default()
        });
        let handle = self
            .spawn_fresh(Namespace::Character, template.key(), data)
            .inspect_err(|e| report_failure(&label, e))?;
        apply_to(
            &mut self.cx,
            handle,
            &template,
            "Character",
            Prefab::as_character_mut,
        )
        .inspect_err(|e| report_failure(&label, e))?;
        Ok(handle)
    }

    fn spawn_fresh(
        &mut self,
        namespace: Namespace,
        key: EntityKey,
        data: Prefab,
    ) -> Result<EntityHandle, ApplyError> {
        if self.cx.registry.contains(namespace, &key) {
            return Err(ApplyError::DuplicateIdentifier { namespace, id: key });
        }
        let handle = self.cx.host.spawn(PrefabObject::new(data));
        if let Err(e) = self.cx.registry.register(namespace, key, handle, false) {
            let _ = self.cx.host.destroy(handle);
            return Err(e);
        }
        Ok(handle)
    }

    fn defer<F>(
        &mut self,
        gate: Gate,
        label: String,
        handle: EntityHandle,
        apply: F,
    ) -> Result<EntityHandle, ApplyError>
    where
        F: FnOnce(&mut PatchContext<H, T, L>) -> Result<(), ApplyError> + 'static,
    {
        match self.scheduler.schedule(gate, label, &mut self.cx, apply) {
            Scheduled::Deferred | Scheduled::Ran(Ok(())) => Ok(handle),
            Scheduled::Ran(Err(e)) => Err(e),
        }
    }

    /// Rebuilds a template from the live entity registered under `key`.
    pub fn extract(
        &self,
        namespace: Namespace,
        key: &EntityKey,
    ) -> Result<TemplateDocument, ApplyError> {
        let unknown = || ApplyError::UnknownTarget {
            namespace,
            id: key.clone(),
        };
        let handle = self.resolve(namespace, key).ok_or_else(unknown)?;
        let prefab = self
            .cx
            .host
            .prefab(handle)
            .ok_or(ApplyError::MissingHandle(handle))?;

        let cx = self.cx.extract_context();
        let document = match prefab {
            Prefab::Item(item) => TemplateDocument::Item(ItemTemplate::extract(item, &cx)),
            Prefab::StatusEffect(status) => {
                TemplateDocument::StatusEffect(StatusEffectTemplate::extract(status, &cx))
            }
            Prefab::ImbuePreset(preset) => {
                TemplateDocument::ImbueEffect(ImbueEffectTemplate::extract(preset, &cx))
            }
            Prefab::Recipe(recipe) => TemplateDocument::Recipe(RecipeTemplate::extract(recipe, &cx)),
            Prefab::Enchantment(enchantment) => {
                TemplateDocument::Enchantment(EnchantmentTemplate::extract(enchantment, &cx))
            }
            Prefab::Character(character) => {
                TemplateDocument::Character(CharacterTemplate::extract(character, &cx))
            }
        };
        Ok(document)
    }

    pub fn extract_item(&self, id: i32) -> Result<ItemTemplate, ApplyError> {
        match self.extract(Namespace::Item, &EntityKey::Id(id))? {
            TemplateDocument::Item(template) => Ok(template),
            other => Err(kind_mismatch("Item", &other)),
        }
    }

    pub fn extract_status_effect(&self, identifier: &str) -> Result<StatusEffectTemplate, ApplyError> {
        match self.extract(Namespace::StatusEffect, &EntityKey::Name(identifier.to_owned()))? {
            TemplateDocument::StatusEffect(template) => Ok(template),
            other => Err(kind_mismatch("StatusEffect", &other)),
        }
    }

    pub fn extract_imbue_effect(&self, preset_id: i32) -> Result<ImbueEffectTemplate, ApplyError> {
        match self.extract(Namespace::EffectPreset, &EntityKey::Id(preset_id))? {
            TemplateDocument::ImbueEffect(template) => Ok(template),
            other => Err(kind_mismatch("ImbueEffect", &other)),
        }
    }

    /// Records `kind` as the current stage. Returns false when it arrives
    /// after a later stage; the collection still loads.
    pub(crate) fn enter_stage(&mut self, kind: ContentKind) -> bool {
        let in_order = match self.stage {
            Some(current) if kind.stage() < current.stage() => {
                warn!(
                    target: "content::session",
                    kind = %kind,
                    after = %current,
                    "collection loaded out of order"
                );
                false
            }
            _ => true,
        };
        self.stage = Some(kind);
        in_order
    }
}

/// Applies `template` to the prefab behind `handle`.
fn apply_to<N, H, T, L>(
    cx: &mut PatchContext<H, T, L>,
    handle: EntityHandle,
    template: &N,
    expected: &'static str,
    live: fn(&mut Prefab) -> Option<&mut N::Live>,
) -> Result<(), ApplyError>
where
    N: TemplateNode,
    H: PrefabHost,
    T: TagCatalog,
    L: Localization,
{
    let (prefab, mut acx) = cx.target(handle)?;
    let found = prefab.kind_name();
    let target = live(prefab).ok_or(ApplyError::KindMismatch { expected, found })?;
    template.apply(target, &mut acx)
}

fn kind_mismatch(expected: &'static str, found: &TemplateDocument) -> ApplyError {
    ApplyError::KindMismatch {
        expected,
        found: found.kind_name(),
    }
}

fn report_failure(label: &str, e: &ApplyError) {
    error!(target: "content::session", document = label, error = %e, "template failed");
}
