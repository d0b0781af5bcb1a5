//! texdraft Artifacts - The LaTeX document artifact
//!
//! This crate provides both halves of the artifact:
//! - the server-side generator that turns a streamed model response into
//!   ordered full-content delta events
//! - the client-side reconciler that applies those snapshots to a live
//!   editable buffer while keeping user edits and generated content apart
//! - document handlers, the kind registry and the artifact panel state

pub mod artifact;
pub mod buffer;
pub mod delta;
pub mod document;
pub mod generator;
pub mod handler;
pub mod partial_json;
pub mod prompts;
pub mod reconciler;

// Re-export key types for convenience
pub use artifact::{
    ArtifactAction, ArtifactMode, ArtifactState, LatexArtifact, ToolbarAction, VersionChange,
    preview,
};
pub use buffer::{
    Change, DocumentBuffer, EditTransaction, EditableView, Provenance, RunStatus, UpdateListener,
    ViewUpdate,
};
pub use delta::{DeltaEvent, DeltaKind, DeltaSink};
pub use document::Document;
pub use generator::{DeltaStream, GenerationInput, Generator};
pub use handler::{DocumentHandler, HandlerRegistry, LatexDocumentHandler};
pub use reconciler::{Reconciler, SaveCallback};
