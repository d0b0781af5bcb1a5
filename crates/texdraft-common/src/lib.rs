//! texdraft Common - Shared error type, configuration and constants
//!
//! This crate provides the error taxonomy, configuration structs and the
//! well-known names (model roles, delta kinds) used across all texdraft crates.

pub mod config;
pub mod constants;
pub mod error;

// Re-export commonly used items
pub use config::{ProviderConfig, ReconcilerConfig};
pub use constants::*;
pub use error::{Result, TexdraftError};
