//! Streaming text model abstraction

use async_trait::async_trait;
use futures_util::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::pin::Pin;
use texdraft_common::Result;

/// Ordered stream of text units produced by a model
pub type TextStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// A single request to a language model
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelRequest {
    /// System prompt
    pub system: Option<String>,
    /// User prompt
    pub prompt: String,
    /// JSON schema the output object must follow, if structured output is wanted
    pub json_schema: Option<Value>,
}

impl ModelRequest {
    /// Create a plain text request
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            system: None,
            prompt: prompt.into(),
            json_schema: None,
        }
    }

    /// Set the system prompt
    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    /// Ask for a JSON object following `schema`
    pub fn with_json_schema(mut self, schema: Value) -> Self {
        self.json_schema = Some(schema);
        self
    }
}

/// A model that can stream text for a request
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Concrete model identifier, for logs and diagnostics
    fn model_id(&self) -> &str;

    /// Start a streaming completion.
    ///
    /// Errors returned here or yielded by the stream are transport failures.
    async fn stream_text(&self, request: ModelRequest) -> Result<TextStream>;
}

/// Drain a text stream into one string, failing on the first error
pub async fn collect_text(mut stream: TextStream) -> Result<String> {
    let mut text = String::new();
    while let Some(unit) = stream.next().await {
        text.push_str(&unit?);
    }
    Ok(text)
}
