//! Content packs on disk.
//!
//! # Directory Structure
//!
//! ```text
//! <pack>/
//! ├── AssetBundles/
//! ├── AudioClip/
//! ├── Texture2D/
//! ├── StatusEffects/
//! │   ├── burning.ron
//! │   └── Frost/frost.ron        (subfolder recorded as provenance)
//! ├── Items/
//! │   ├── fire_sword.ron
//! │   ├── TextureBundles/        (skipped)
//! │   └── Spells/spark.toml
//! ├── Recipes/
//! ├── Characters/
//! └── Enchantments/
//! ```
//!
//! Every folder is optional. Recipes, characters and enchantments are read
//! from the folder top level only.

use std::path::{Path, PathBuf};

use patchkit_core::{AssetSink, HostError, Localization, PrefabHost, TagCatalog};
use tracing::{debug, error, info, warn};

use crate::error::ApplyError;
use crate::loaders::{DocumentLoader, LoadResult, LoaderConfig};
use crate::session::{ContentKind, ContentSession};
use crate::template::{Provenance, TemplateDocument};

/// A document file and its parsed content.
#[derive(Clone, Debug, PartialEq)]
pub struct Document {
    pub source: PathBuf,
    pub provenance: Provenance,
    /// `MalformedDocument` when the file could not be parsed.
    pub template: Result<TemplateDocument, ApplyError>,
}

/// A named folder of content.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContentPack {
    pub name: String,
    pub root: PathBuf,
}

impl ContentPack {
    /// Opens the pack at `root`; its name is the folder name.
    pub fn open(root: impl Into<PathBuf>) -> LoadResult<Self> {
        let root = root.into();
        if !root.is_dir() {
            anyhow::bail!("Pack folder {} does not exist", root.display());
        }
        let name = root
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| anyhow::anyhow!("Pack folder {} has no usable name", root.display()))?
            .to_owned();
        Ok(Self { name, root })
    }

    pub fn folder(&self, kind: ContentKind) -> PathBuf {
        self.root.join(kind.folder_name())
    }

    /// Files of an asset collection, sorted by path.
    pub fn asset_files(&self, kind: ContentKind) -> LoadResult<Vec<PathBuf>> {
        let dir = self.folder(kind);
        if !dir.is_dir() {
            return Ok(Vec::new());
        }
        let (files, _) = list_dir(&dir)?;
        Ok(files)
    }

    /// Parses the documents of a template collection.
    ///
    /// A file that fails to parse does not stop the rest of the collection.
    pub fn read_documents(
        &self,
        kind: ContentKind,
        config: &LoaderConfig,
    ) -> LoadResult<Vec<Document>> {
        let dir = self.folder(kind);
        if kind.is_asset() || !dir.is_dir() {
            return Ok(Vec::new());
        }

        let (files, folders) = list_dir(&dir)?;
        let mut sources: Vec<(PathBuf, Option<String>)> =
            files.into_iter().map(|file| (file, None)).collect();

        if kind.reads_subfolders() {
            for folder in folders {
                let Some(name) = folder.file_name().and_then(|n| n.to_str()).map(str::to_owned)
                else {
                    continue;
                };
                if kind == ContentKind::Items && config.skips_item_folder(&name) {
                    debug!(target: "content::pack", pack = %self.name, folder = %name, "skipping asset folder");
                    continue;
                }
                let (files, _) = list_dir(&folder)?;
                sources.extend(files.into_iter().map(|file| (file, Some(name.clone()))));
            }
        }

        let documents = sources
            .into_iter()
            .filter(|(path, _)| config.is_document(path))
            .map(|(path, subfolder)| self.read_document(path, subfolder))
            .collect();
        Ok(documents)
    }

    fn read_document(&self, path: PathBuf, subfolder: Option<String>) -> Document {
        let provenance = Provenance {
            pack: self.name.clone(),
            subfolder,
        };
        let template = DocumentLoader::load(&path)
            .map(|mut template| {
                template.set_provenance(&provenance);
                template
            })
            .map_err(|e| ApplyError::malformed(path.display().to_string(), format!("{e:#}")));
        Document {
            source: path,
            provenance,
            template,
        }
    }
}

/// Sorted files and subfolders of `dir`.
fn list_dir(dir: &Path) -> LoadResult<(Vec<PathBuf>, Vec<PathBuf>)> {
    let entries = std::fs::read_dir(dir)
        .map_err(|e| anyhow::anyhow!("Failed to list {}: {}", dir.display(), e))?;
    let mut files = Vec::new();
    let mut folders = Vec::new();
    for entry in entries {
        let path = entry
            .map_err(|e| anyhow::anyhow!("Failed to list {}: {}", dir.display(), e))?
            .path();
        if path.is_dir() {
            folders.push(path);
        } else {
            files.push(path);
        }
    }
    files.sort();
    folders.sort();
    Ok((files, folders))
}

/// Outcome of loading one pack.
#[derive(Debug, Default, PartialEq)]
pub struct PackReport {
    pub pack: String,
    pub assets: usize,
    /// Templates loaded without error, including those still waiting on a gate.
    pub loaded: usize,
    pub skipped: Vec<ContentKind>,
    /// Source path and error of every failed document or template.
    pub failures: Vec<(String, ApplyError)>,
    pub asset_failures: Vec<(PathBuf, HostError)>,
}

impl<H, T, L> ContentSession<H, T, L>
where
    H: PrefabHost + 'static,
    T: TagCatalog + 'static,
    L: Localization + 'static,
{
    /// Loads every collection of `pack` in load order.
    ///
    /// Failing documents are recorded in the report; only an unreadable pack
    /// folder or a duplicate pack name fails the call.
    pub fn load_pack(
        &mut self,
        pack: &ContentPack,
        config: &LoaderConfig,
        assets: &mut dyn AssetSink,
    ) -> LoadResult<PackReport> {
        if self.packs.contains(&pack.name) {
            anyhow::bail!("A pack named '{}' is already loaded", pack.name);
        }
        self.packs.push(pack.name.clone());
        self.stage = None;
        info!(target: "content::pack", pack = %pack.name, hot_reload = self.is_hot_reload(), "reading pack");

        let mut report = PackReport {
            pack: pack.name.clone(),
            ..PackReport::default()
        };
        for kind in ContentKind::LOAD_ORDER {
            if self.is_hot_reload() && kind.initial_load_only() {
                report.skipped.push(kind);
                continue;
            }
            if kind.is_asset() {
                self.load_assets(pack, kind, assets, &mut report)?;
                continue;
            }

            for document in pack.read_documents(kind, config)? {
                let source = document.source.display().to_string();
                let template = match document.template {
                    Ok(template) => template,
                    Err(e) => {
                        error!(target: "content::pack", pack = %pack.name, error = %e, "unreadable document");
                        report.failures.push((source, e));
                        continue;
                    }
                };
                for result in self.load_collection(kind, vec![template]) {
                    match result {
                        Ok(_) => report.loaded += 1,
                        Err(e) => report.failures.push((source.clone(), e)),
                    }
                }
            }
        }

        debug!(
            target: "content::pack",
            pack = %pack.name,
            loaded = report.loaded,
            failed = report.failures.len(),
            "pack read"
        );
        Ok(report)
    }

    fn load_assets(
        &mut self,
        pack: &ContentPack,
        kind: ContentKind,
        sink: &mut dyn AssetSink,
        report: &mut PackReport,
    ) -> LoadResult<()> {
        let Some(asset_kind) = kind.asset_kind() else {
            return Ok(());
        };
        self.enter_stage(kind);
        for path in pack.asset_files(kind)? {
            match sink.load_asset(asset_kind, &path) {
                Ok(()) => report.assets += 1,
                Err(e) => {
                    warn!(target: "content::pack", path = %path.display(), error = %e, "asset not loaded");
                    report.asset_failures.push((path, e));
                }
            }
        }
        Ok(())
    }
}
