//! Environment configuration for the command-line driver.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::Result;
use patchkit_content::{ConfigLoader, LoaderConfig};

/// Settings read from `PATCHKIT_*` variables (and `.env`).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CliConfig {
    /// Loader settings file (`PATCHKIT_CONFIG`).
    pub config_path: Option<PathBuf>,
    /// Extra pack directories (`PATCHKIT_PACKS`, separated like `PATH`).
    pub packs: Vec<PathBuf>,
    /// Forces a hot reload (`PATCHKIT_HOT_RELOAD`).
    pub hot_reload: bool,
    /// Log directory override (`PATCHKIT_LOG_DIR`).
    pub log_dir: Option<PathBuf>,
    /// Deepest effect nesting (`PATCHKIT_MAX_EFFECT_DEPTH`).
    pub max_effect_depth: Option<usize>,
}

impl CliConfig {
    pub fn from_env() -> Self {
        Self {
            config_path: read_env::<PathBuf>("PATCHKIT_CONFIG"),
            packs: env::var_os("PATCHKIT_PACKS")
                .map(|paths| env::split_paths(&paths).collect())
                .unwrap_or_default(),
            hot_reload: read_env_bool("PATCHKIT_HOT_RELOAD").unwrap_or(false),
            log_dir: read_env::<PathBuf>("PATCHKIT_LOG_DIR"),
            max_effect_depth: read_env::<usize>("PATCHKIT_MAX_EFFECT_DEPTH"),
        }
    }

    /// Loader settings with command-line values layered over the file and
    /// environment.
    pub fn loader_config(
        &self,
        config_path: Option<&PathBuf>,
        packs: &[PathBuf],
        hot_reload: bool,
    ) -> Result<LoaderConfig> {
        let mut loader = match config_path.or(self.config_path.as_ref()) {
            Some(path) => ConfigLoader::load(path)?,
            None => LoaderConfig::default(),
        };
        loader.pack_dirs.extend(self.packs.iter().cloned());
        loader.pack_dirs.extend(packs.iter().cloned());
        loader.hot_reload |= self.hot_reload || hot_reload;
        if let Some(depth) = self.max_effect_depth.filter(|depth| *depth > 0) {
            loader.max_effect_depth = depth;
        }
        Ok(loader)
    }
}

fn read_env<T: FromStr>(key: &str) -> Option<T> {
    env::var(key).ok()?.parse().ok()
}

fn read_env_bool(key: &str) -> Option<bool> {
    env::var(key).ok().map(|value| {
        matches!(
            value.to_ascii_lowercase().as_str(),
            "true" | "1" | "yes" | "on"
        )
    })
}
