//! Common error infrastructure for the content engine.
//!
//! This module provides the classification shared by every error type in the
//! workspace. Domain errors (`HostError` here, `ApplyError` in the content
//! crate) are defined next to the operations that raise them.
//!
//! # Design Principles
//!
//! - **Document granularity**: no error is process-fatal; the worst outcome is
//!   one abandoned document
//! - **Severity Classification**: errors are categorized for logging levels and
//!   recovery strategies
//! - **Stable codes**: every variant exposes a static code usable in logs and tests

use crate::ids::{EntityHandle, Namespace};

/// Severity level of an error, used for categorization and recovery strategies.
///
/// - **Recoverable**: the dependent field or subtree is skipped, loading continues
/// - **Validation**: the document is rejected, other documents continue
/// - **Internal**: the host or the engine disagree about state; needs investigation
/// - **Fatal**: reserved for collaborators; the engine itself never raises it
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ErrorSeverity {
    /// Recoverable error - skip the dependent field and keep going.
    ///
    /// Examples: unresolved status reference, unknown tag name
    Recoverable,

    /// Validation error - the document is invalid and must not be retried unchanged.
    ///
    /// Examples: duplicate identifier, malformed document, kind mismatch
    Validation,

    /// Internal error - unexpected state inconsistency.
    ///
    /// Examples: stale handle, host refused to clone a prefab
    Internal,

    /// Fatal error - the host cannot continue.
    Fatal,
}

impl ErrorSeverity {
    /// Returns a human-readable description of this severity level.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Recoverable => "recoverable",
            Self::Validation => "validation",
            Self::Internal => "internal",
            Self::Fatal => "fatal",
        }
    }

    /// Returns true if this error is potentially recoverable.
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::Recoverable)
    }

    /// Returns true if this error indicates an internal bug.
    pub const fn is_internal(&self) -> bool {
        matches!(self, Self::Internal | Self::Fatal)
    }
}

/// Common trait for all content engine errors.
///
/// # Implementation Guidelines
///
/// - Use `#[derive(thiserror::Error)]` for Display/Error impl
/// - Classify severity based on recoverability, not impact
pub trait ContentError: core::fmt::Display + core::fmt::Debug {
    /// Returns the severity level of this error.
    fn severity(&self) -> ErrorSeverity;

    /// Returns a static string identifier for this error variant.
    ///
    /// Default implementation uses the error type name.
    fn error_code(&self) -> &'static str {
        core::any::type_name::<Self>()
    }
}

/// Failures reported by the host engine collaborators.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum HostError {
    #[error("no live object for handle {0}")]
    MissingObject(EntityHandle),

    #[error("host refused to instantiate a copy of {0}")]
    InstantiateFailed(EntityHandle),

    #[error("object {handle} cannot hold a {namespace} identifier")]
    IdentifierRejected {
        handle: EntityHandle,
        namespace: Namespace,
    },

    #[error("failed to load asset '{path}': {reason}")]
    Asset { path: String, reason: String },

    #[error("no tag handle left for '{0}'")]
    TagCapacity(String),
}

impl ContentError for HostError {
    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Asset { .. } => ErrorSeverity::Recoverable,
            Self::IdentifierRejected { .. } | Self::TagCapacity(_) => ErrorSeverity::Validation,
            Self::MissingObject(_) | Self::InstantiateFailed(_) => ErrorSeverity::Internal,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::MissingObject(_) => "HOST_MISSING_OBJECT",
            Self::InstantiateFailed(_) => "HOST_INSTANTIATE_FAILED",
            Self::IdentifierRejected { .. } => "HOST_IDENTIFIER_REJECTED",
            Self::Asset { .. } => "HOST_ASSET",
            Self::TagCapacity(_) => "HOST_TAG_CAPACITY",
        }
    }
}
