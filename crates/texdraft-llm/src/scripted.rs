//! Deterministic models that replay scripted output

use crate::model::{LanguageModel, ModelRequest, TextStream};
use async_trait::async_trait;
use std::sync::Arc;
use texdraft_common::{Result, TexdraftError};
use tracing::debug;

type Responder = Arc<dyn Fn(&ModelRequest) -> Vec<String> + Send + Sync>;

/// A model whose output is computed locally from the request.
///
/// Used for the test provider configuration and for exercising stream
/// consumers without a network.
#[derive(Clone)]
pub struct ScriptedModel {
    id: String,
    respond: Responder,
    /// Fail with a transport error after this many units
    fail_after: Option<(usize, String)>,
}

impl ScriptedModel {
    /// Create a model computing its stream units from each request
    pub fn new<F>(id: &str, respond: F) -> Self
    where
        F: Fn(&ModelRequest) -> Vec<String> + Send + Sync + 'static,
    {
        Self {
            id: id.to_string(),
            respond: Arc::new(respond),
            fail_after: None,
        }
    }

    /// Create a model that always streams the same units
    pub fn from_chunks<S: Into<String>>(id: &str, chunks: Vec<S>) -> Self {
        let chunks: Vec<String> = chunks.into_iter().map(Into::into).collect();
        Self::new(id, move |_| chunks.clone())
    }

    /// Make the stream fail with a transport error after `units` units
    pub fn failing_after(mut self, units: usize, message: &str) -> Self {
        self.fail_after = Some((units, message.to_string()));
        self
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    fn model_id(&self) -> &str {
        &self.id
    }

    async fn stream_text(&self, request: ModelRequest) -> Result<TextStream> {
        let chunks = (self.respond)(&request);
        debug!("Scripted model {} streaming {} units", self.id, chunks.len());

        let items: Vec<Result<String>> = match &self.fail_after {
            Some((units, message)) => chunks
                .into_iter()
                .take(*units)
                .map(Ok)
                .chain(std::iter::once(Err(TexdraftError::Transport(message.clone()))))
                .collect(),
            None => chunks.into_iter().map(Ok).collect(),
        };

        Ok(Box::pin(futures_util::stream::iter(items)))
    }
}

/// Split text into units of at most `chunk_size` characters
pub fn split_text_into_chunks(text: &str, chunk_size: usize) -> Vec<String> {
    text.chars()
        .collect::<Vec<_>>()
        .chunks(chunk_size.max(1))
        .map(|chunk| chunk.iter().collect())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[test]
    fn test_split_text_into_chunks() {
        assert_eq!(split_text_into_chunks("abcdefg", 3), vec!["abc", "def", "g"]);
        assert_eq!(split_text_into_chunks("äöü", 2), vec!["äö", "ü"]);
        assert!(split_text_into_chunks("", 4).is_empty());
    }

    #[tokio::test]
    async fn test_failing_after() {
        let model = ScriptedModel::from_chunks("broken", vec!["a", "b", "c"])
            .failing_after(2, "connection reset");
        let items: Vec<_> = model
            .stream_text(ModelRequest::new("x"))
            .await
            .unwrap()
            .collect()
            .await;

        assert_eq!(items.len(), 3);
        assert_eq!(items[0].as_ref().unwrap(), "a");
        assert_eq!(items[1].as_ref().unwrap(), "b");
        assert!(matches!(items[2], Err(TexdraftError::Transport(_))));
    }
}
