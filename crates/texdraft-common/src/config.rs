//! Configuration types for texdraft

use crate::constants::{REASONING_TAG, env, models};
use crate::error::{Result, TexdraftError};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Model provider configuration, built once at process start
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Select the deterministic test models instead of hosted ones
    pub test_mode: bool,
    /// Hosted model backing every role in the live configuration
    pub live_model: String,
    /// Tag stripped from the reasoning role's output
    pub reasoning_tag: String,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            test_mode: false,
            live_model: models::GEMINI_2_0_FLASH.to_string(),
            reasoning_tag: REASONING_TAG.to_string(),
        }
    }
}

impl ProviderConfig {
    /// Build the configuration from the process environment.
    ///
    /// The test-mode flag is the only switch; the live model name may be
    /// overridden but defaults to the hosted Gemini model.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(raw) = lookup(env::TEST_MODE) {
            config.test_mode = parse_flag(env::TEST_MODE, &raw)?;
        }
        if let Some(model) = lookup(env::LIVE_MODEL).filter(|m| !m.trim().is_empty()) {
            config.live_model = model.trim().to_string();
        }

        debug!(
            "Provider config: test_mode={}, live_model={}",
            config.test_mode, config.live_model
        );
        Ok(config)
    }
}

/// Parse a boolean environment flag
pub fn parse_flag(name: &str, raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "" | "0" | "false" | "no" | "off" => Ok(false),
        other => Err(TexdraftError::Config(format!(
            "{} must be a boolean, got '{}'",
            name, other
        ))),
    }
}

/// Policy for reporting local edits back to the document store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcilerConfig {
    /// Persist local edits made while a generation run is streaming
    pub persist_during_streaming: bool,
    /// Ask the store to debounce local-edit saves
    pub debounce_saves: bool,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            persist_during_streaming: true,
            debounce_saves: true,
        }
    }
}
