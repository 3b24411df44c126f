//! Loader configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::context::DEFAULT_MAX_EFFECT_DEPTH;
use crate::loaders::{LoadResult, read_file};

/// Settings for a loading pass, read from TOML.
///
/// ```toml
/// pack_dirs = ["packs/base", "packs/fire"]
/// hot_reload = false
/// max_effect_depth = 16
/// skipped_item_folders = ["TextureBundles"]
/// extensions = ["ron", "toml", "json"]
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// Pack directories, loaded in order.
    pub pack_dirs: Vec<PathBuf>,
    /// Skips collections that only load on the first pass.
    pub hot_reload: bool,
    /// Deepest effect group nesting a document may use.
    pub max_effect_depth: usize,
    /// Subfolders of `Items/` that hold assets rather than templates.
    pub skipped_item_folders: Vec<String>,
    /// File extensions treated as template documents.
    pub extensions: Vec<String>,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            pack_dirs: Vec::new(),
            hot_reload: false,
            max_effect_depth: DEFAULT_MAX_EFFECT_DEPTH,
            skipped_item_folders: vec!["TextureBundles".into()],
            extensions: vec!["ron".into(), "toml".into(), "json".into()],
        }
    }
}

impl LoaderConfig {
    pub fn is_document(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| self.extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
    }

    pub fn skips_item_folder(&self, name: &str) -> bool {
        self.skipped_item_folders
            .iter()
            .any(|skipped| skipped.eq_ignore_ascii_case(name))
    }
}

/// Loader for [`LoaderConfig`] from TOML files.
pub struct ConfigLoader;

impl ConfigLoader {
    pub fn load(path: &Path) -> LoadResult<LoaderConfig> {
        let content = read_file(path)?;
        let config: LoaderConfig = toml::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Failed to parse loader config TOML: {}", e))?;

        if config.max_effect_depth == 0 {
            anyhow::bail!("max_effect_depth must be at least 1");
        }
        Ok(config)
    }
}
