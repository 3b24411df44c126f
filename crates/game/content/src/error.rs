//! Errors raised while applying templates.

use patchkit_core::{ContentError, EntityHandle, EntityKey, ErrorSeverity, HostError, Namespace};

/// Failure of one template document or one of its fields.
///
/// None of these abort a pack: the orchestrator records the error against the
/// document and moves on.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum ApplyError {
    /// The template names a target identifier with no live entity.
    #[error("unknown {namespace} target '{id}'")]
    UnknownTarget { namespace: Namespace, id: EntityKey },

    /// Registration without overwrite hit an existing identifier.
    #[error("{namespace} identifier '{id}' is already registered")]
    DuplicateIdentifier { namespace: Namespace, id: EntityKey },

    /// The host could not produce the mutable copy.
    #[error("failed to clone {namespace} '{id}'")]
    CloneFailed {
        namespace: Namespace,
        id: EntityKey,
        #[source]
        source: HostError,
    },

    /// The document cannot be interpreted at all.
    #[error("malformed document {document}: {detail}")]
    MalformedDocument { document: String, detail: String },

    /// The template variant does not fit the live object it targets.
    #[error("template kind {expected} does not match live {found}")]
    KindMismatch {
        expected: &'static str,
        found: &'static str,
    },

    /// A handle the engine holds no longer resolves to a live object.
    #[error("handle {0} no longer resolves to a live object")]
    MissingHandle(EntityHandle),
}

impl ApplyError {
    pub(crate) fn malformed(document: impl Into<String>, detail: impl ToString) -> Self {
        Self::MalformedDocument {
            document: document.into(),
            detail: detail.to_string(),
        }
    }
}

impl ContentError for ApplyError {
    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::UnknownTarget { .. } => ErrorSeverity::Recoverable,
            Self::DuplicateIdentifier { .. }
            | Self::MalformedDocument { .. }
            | Self::KindMismatch { .. } => ErrorSeverity::Validation,
            Self::CloneFailed { .. } | Self::MissingHandle(_) => ErrorSeverity::Internal,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::UnknownTarget { .. } => "APPLY_UNKNOWN_TARGET",
            Self::DuplicateIdentifier { .. } => "APPLY_DUPLICATE_IDENTIFIER",
            Self::CloneFailed { .. } => "APPLY_CLONE_FAILED",
            Self::MalformedDocument { .. } => "APPLY_MALFORMED_DOCUMENT",
            Self::KindMismatch { .. } => "APPLY_KIND_MISMATCH",
            Self::MissingHandle(_) => "APPLY_MISSING_HANDLE",
        }
    }
}
