//! Template resolution, cloning and merge engine.
//!
//! This crate turns field-sparse template documents into changes on a live
//! prefab graph owned by a [`patchkit_core::PrefabHost`]:
//! - Identifier registry and pristine originals (explicit state, no globals)
//! - Cloner deciding between in-place patches and derived copies
//! - Template nodes with `apply` and `extract`
//! - Effect tree merging under a per-call behaviour
//! - Gated scheduler for templates that reference later content
//! - Pack walker and loaders for RON/TOML/JSON documents
//!
//! The `loaders` feature adds file access; the engine itself only consumes
//! parsed templates.

mod cloner;
pub mod context;
pub mod error;
pub mod merge;
pub mod pristine;
pub mod registry;
pub mod scheduler;
pub mod session;
pub mod template;

#[cfg(feature = "loaders")]
pub mod loaders;
#[cfg(feature = "loaders")]
pub mod pack;
#[cfg(feature = "loaders")]
pub mod snapshot;

pub use context::{ApplyContext, DEFAULT_MAX_EFFECT_DEPTH, ExtractContext, PatchContext};
pub use error::ApplyError;
pub use merge::{EffectBehaviour, merge_subtree, parse_transforms};
pub use pristine::PristineCache;
pub use registry::Registry;
pub use scheduler::{Gate, GateReport, Scheduled, Scheduler};
pub use session::{ContentKind, ContentSession, LoadReport};
pub use template::{TemplateDocument, TemplateNode};

#[cfg(feature = "loaders")]
pub use loaders::{ConfigLoader, DocumentFormat, DocumentLoader, LoadResult, LoaderConfig};
#[cfg(feature = "loaders")]
pub use pack::{ContentPack, Document, PackReport};
#[cfg(feature = "loaders")]
pub use snapshot::WorldSnapshot;
