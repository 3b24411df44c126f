//! Template document loader.

use std::path::Path;

use ron::extensions::Extensions;

use crate::loaders::{LoadResult, read_file};
use crate::template::TemplateDocument;

/// Serialization format of a document file.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display, strum::EnumString, strum::AsRefStr,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum DocumentFormat {
    Ron,
    Toml,
    Json,
}

impl DocumentFormat {
    /// Format implied by the file extension, if it is a known one.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(|ext| ext.parse().ok())
    }

    pub const fn extension(self) -> &'static str {
        match self {
            Self::Ron => "ron",
            Self::Toml => "toml",
            Self::Json => "json",
        }
    }
}

/// Reads and writes [`TemplateDocument`]s.
///
/// RON documents may write optional fields bare (`value: 200`) instead of
/// `Some(200)`.
pub struct DocumentLoader;

impl DocumentLoader {
    /// Load one document, choosing the format from the extension.
    pub fn load(path: &Path) -> LoadResult<TemplateDocument> {
        let format = DocumentFormat::from_path(path).ok_or_else(|| {
            anyhow::anyhow!("Unknown document format for {}", path.display())
        })?;
        let content = read_file(path)?;
        Self::parse(&content, format)
            .map_err(|e| anyhow::anyhow!("Failed to parse {}: {}", path.display(), e))
    }

    pub fn parse(content: &str, format: DocumentFormat) -> LoadResult<TemplateDocument> {
        let document = match format {
            DocumentFormat::Ron => ron_options()
                .from_str(content)
                .map_err(|e| anyhow::anyhow!("invalid RON: {}", e))?,
            DocumentFormat::Toml => {
                toml::from_str(content).map_err(|e| anyhow::anyhow!("invalid TOML: {}", e))?
            }
            DocumentFormat::Json => serde_json::from_str(content)
                .map_err(|e| anyhow::anyhow!("invalid JSON: {}", e))?,
        };
        Ok(document)
    }

    pub fn to_string(document: &TemplateDocument, format: DocumentFormat) -> LoadResult<String> {
        let text = match format {
            DocumentFormat::Ron => ron_options()
                .to_string_pretty(document, ron::ser::PrettyConfig::default())
                .map_err(|e| anyhow::anyhow!("Failed to write RON: {}", e))?,
            DocumentFormat::Toml => toml::to_string_pretty(document)
                .map_err(|e| anyhow::anyhow!("Failed to write TOML: {}", e))?,
            DocumentFormat::Json => serde_json::to_string_pretty(document)
                .map_err(|e| anyhow::anyhow!("Failed to write JSON: {}", e))?,
        };
        Ok(text)
    }
}

fn ron_options() -> ron::Options {
    ron::Options::default().with_default_extension(Extensions::IMPLICIT_SOME)
}
