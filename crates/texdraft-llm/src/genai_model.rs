//! Hosted model backed by the genai client

use crate::model::{LanguageModel, ModelRequest, TextStream};
use async_trait::async_trait;
use futures_util::StreamExt;
use genai::Client as GenaiClient;
use genai::chat::{
    ChatMessage as GenaiChatMessage, ChatOptions, ChatRequest, ChatResponseFormat,
    ChatStreamEvent, JsonSpec,
};
use texdraft_common::{Result, TexdraftError};
use tracing::debug;

/// Name given to structured-output schemas sent to the provider
const SCHEMA_NAME: &str = "document";

/// A language model served through genai
pub struct GenaiModel {
    /// Provider model name, e.g. "gemini-2.0-flash"
    model: String,

    /// Underlying client; provider credentials are resolved from the environment per request
    client: GenaiClient,
}

impl GenaiModel {
    /// Create a model handle. No network traffic happens until a request is made.
    pub fn new(model: &str) -> Self {
        let client = GenaiClient::builder()
            .with_chat_options(ChatOptions {
                capture_content: Some(true),
                ..Default::default()
            })
            .build();

        Self {
            model: model.to_string(),
            client,
        }
    }

    fn chat_request(request: &ModelRequest) -> ChatRequest {
        let mut chat_req =
            ChatRequest::new(vec![GenaiChatMessage::user(request.prompt.clone())]);
        if let Some(system) = &request.system {
            chat_req = chat_req.with_system(system.clone());
        }
        chat_req
    }

    fn chat_options(request: &ModelRequest) -> Option<ChatOptions> {
        request.json_schema.as_ref().map(|schema| ChatOptions {
            response_format: Some(ChatResponseFormat::JsonSpec(JsonSpec::new(
                SCHEMA_NAME,
                schema.clone(),
            ))),
            ..Default::default()
        })
    }
}

#[async_trait]
impl LanguageModel for GenaiModel {
    fn model_id(&self) -> &str {
        &self.model
    }

    async fn stream_text(&self, request: ModelRequest) -> Result<TextStream> {
        debug!(
            "Streaming from {} (structured: {})",
            self.model,
            request.json_schema.is_some()
        );

        let chat_req = Self::chat_request(&request);
        let options = Self::chat_options(&request);

        let response = self
            .client
            .exec_chat_stream(&self.model, chat_req, options.as_ref())
            .await
            .map_err(|e| TexdraftError::Transport(format!("GenAI API error: {}", e)))?;

        let stream = response.stream.filter_map(|event| async move {
            match event {
                Ok(ChatStreamEvent::Chunk(chunk)) => Some(Ok(chunk.content)),
                Ok(_) => None,
                Err(e) => Some(Err(TexdraftError::Transport(e.to_string()))),
            }
        });

        Ok(Box::pin(stream))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_structured_request_sets_response_format() {
        let plain = ModelRequest::new("hello");
        assert!(GenaiModel::chat_options(&plain).is_none());

        let structured = ModelRequest::new("hello")
            .with_json_schema(json!({"type": "object"}));
        let options = GenaiModel::chat_options(&structured).unwrap();
        assert!(options.response_format.is_some());
    }

    #[test]
    fn test_model_id() {
        let model = GenaiModel::new("gemini-2.0-flash");
        assert_eq!(model.model_id(), "gemini-2.0-flash");
    }
}
