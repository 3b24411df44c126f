//! File loaders for template documents and loader configuration.
//!
//! Documents may be written in RON, TOML or JSON; the format is chosen from
//! the file extension. All three share the serde shape of
//! [`TemplateDocument`].

pub mod config;
pub mod document;

pub use config::{ConfigLoader, LoaderConfig};
pub use document::{DocumentFormat, DocumentLoader};

use std::path::Path;

/// Common result type for loaders.
pub type LoadResult<T> = anyhow::Result<T>;

/// Helper function to read file contents.
pub(crate) fn read_file(path: &Path) -> LoadResult<String> {
    std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("Failed to read file {}: {}", path.display(), e))
}
