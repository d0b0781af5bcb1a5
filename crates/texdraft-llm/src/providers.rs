//! Model role table
//!
//! Maps logical role names ("chat", "latex", ...) onto concrete models. The
//! table is selected once from [`ProviderConfig`] at process start, is
//! immutable afterwards, and is shared by `Arc` with every consumer.

use crate::genai_model::GenaiModel;
use crate::model::LanguageModel;
use crate::reasoning::ReasoningExtractor;
use crate::test_models;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use texdraft_common::{ProviderConfig, Result, TexdraftError, roles};
use tracing::info;

/// Which of the two fixed configurations a table was built from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProviderMode {
    /// Deterministic scripted models
    Test,
    /// Hosted models
    Live,
}

impl fmt::Display for ProviderMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderMode::Test => write!(f, "test"),
            ProviderMode::Live => write!(f, "live"),
        }
    }
}

/// Immutable role name → model mapping
pub struct ModelRoleTable {
    mode: ProviderMode,
    models: HashMap<String, Arc<dyn LanguageModel>>,
}

impl ModelRoleTable {
    /// Read the provider configuration from the environment and build the table
    pub fn from_env() -> Result<Self> {
        let config = ProviderConfig::from_env()?;
        Ok(Self::from_config(&config))
    }

    /// Select the test or live configuration
    pub fn from_config(config: &ProviderConfig) -> Self {
        let table = if config.test_mode {
            Self::test()
        } else {
            Self::live(config)
        };
        info!(
            "Model role table initialized in {} mode with roles: {}",
            table.mode,
            table.roles().join(", ")
        );
        table
    }

    /// The deterministic test configuration
    pub fn test() -> Self {
        let models: Vec<(&str, Arc<dyn LanguageModel>)> = vec![
            (roles::CHAT, shared(test_models::chat_model())),
            (
                roles::CHAT_REASONING,
                shared(ReasoningExtractor::new(
                    shared(test_models::reasoning_model()),
                    texdraft_common::REASONING_TAG,
                )),
            ),
            (roles::TITLE, shared(test_models::title_model())),
            (roles::ARTIFACT, shared(test_models::artifact_model())),
            (roles::LATEX, shared(test_models::latex_model())),
        ];
        Self::from_models(ProviderMode::Test, models)
    }

    /// The hosted configuration: every role served by the configured live model
    pub fn live(config: &ProviderConfig) -> Self {
        let hosted = || shared(GenaiModel::new(&config.live_model));
        let models: Vec<(&str, Arc<dyn LanguageModel>)> = vec![
            (roles::CHAT, hosted()),
            (
                roles::CHAT_REASONING,
                shared(ReasoningExtractor::new(hosted(), &config.reasoning_tag)),
            ),
            (roles::TITLE, hosted()),
            (roles::ARTIFACT, hosted()),
            (roles::LATEX, hosted()),
        ];
        Self::from_models(ProviderMode::Live, models)
    }

    /// Build a table from explicit role assignments
    pub fn from_models<'a, I>(mode: ProviderMode, models: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, Arc<dyn LanguageModel>)>,
    {
        Self {
            mode,
            models: models
                .into_iter()
                .map(|(role, model)| (role.to_string(), model))
                .collect(),
        }
    }

    /// Resolve a role. An unregistered role is a configuration error.
    pub fn lookup(&self, role: &str) -> Result<Arc<dyn LanguageModel>> {
        self.models.get(role).cloned().ok_or_else(|| {
            TexdraftError::Config(format!(
                "no model registered for role '{}' in {} configuration",
                role, self.mode
            ))
        })
    }

    pub fn mode(&self) -> ProviderMode {
        self.mode
    }

    /// Registered role names, sorted
    pub fn roles(&self) -> Vec<&str> {
        let mut roles: Vec<&str> = self.models.keys().map(String::as_str).collect();
        roles.sort_unstable();
        roles
    }
}

fn shared<M: LanguageModel + 'static>(model: M) -> Arc<dyn LanguageModel> {
    Arc::new(model)
}

impl fmt::Debug for ModelRoleTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for role in self.roles() {
            if let Some(model) = self.models.get(role) {
                map.entry(&role, &model.model_id());
            }
        }
        map.finish()?;
        write!(f, " ({})", self.mode)
    }
}
