//! Language model integration for texdraft
//!
//! This crate provides the streaming text model abstraction, the genai-backed
//! hosted model, deterministic scripted models for test runs, and the role
//! table that maps logical model roles onto concrete models.

pub mod genai_model;
pub mod model;
pub mod providers;
pub mod reasoning;
pub mod scripted;
pub mod test_models;

// Re-export key types for convenience
pub use genai_model::GenaiModel;
pub use model::{LanguageModel, ModelRequest, TextStream, collect_text};
pub use providers::{ModelRoleTable, ProviderMode};
pub use reasoning::{ReasoningExtractor, Split, TagSplitter};
pub use scripted::ScriptedModel;
