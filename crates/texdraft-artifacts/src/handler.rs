//! Document handlers and the kind → handler registry

use crate::delta::DeltaSink;
use crate::document::Document;
use crate::generator::{GenerationInput, Generator};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use texdraft_common::{Result, TexdraftError, kinds};
use texdraft_llm::ModelRoleTable;
use tracing::info;

/// Creates and revises documents of one kind.
///
/// Both operations write every delta into `sink` while streaming and return
/// the final content once the run completes.
#[async_trait]
pub trait DocumentHandler: Send + Sync {
    fn kind(&self) -> &str;

    async fn on_create_document(&self, title: &str, sink: &mut dyn DeltaSink) -> Result<String>;

    async fn on_update_document(
        &self,
        document: &Document,
        description: &str,
        sink: &mut dyn DeltaSink,
    ) -> Result<String>;
}

/// Handler for LaTeX documents
pub struct LatexDocumentHandler {
    generator: Generator,
}

impl LatexDocumentHandler {
    pub fn new(roles: Arc<ModelRoleTable>) -> Self {
        Self {
            generator: Generator::new(roles),
        }
    }
}

#[async_trait]
impl DocumentHandler for LatexDocumentHandler {
    fn kind(&self) -> &str {
        kinds::LATEX
    }

    async fn on_create_document(&self, title: &str, sink: &mut dyn DeltaSink) -> Result<String> {
        let deltas = self
            .generator
            .generate(GenerationInput::Create {
                title: title.to_string(),
            })
            .await?;
        deltas.forward_to(sink).await
    }

    async fn on_update_document(
        &self,
        document: &Document,
        description: &str,
        sink: &mut dyn DeltaSink,
    ) -> Result<String> {
        let deltas = self
            .generator
            .generate(GenerationInput::Update {
                current_content: document.content.clone(),
                instruction: description.to_string(),
            })
            .await?;
        deltas.forward_to(sink).await
    }
}

/// Maps document kind tags to their handlers
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: HashMap<String, Arc<dyn DocumentHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in handler
    pub fn with_defaults(roles: Arc<ModelRoleTable>) -> Self {
        let mut registry = Self::new();
        registry.handlers.insert(
            kinds::LATEX.to_string(),
            Arc::new(LatexDocumentHandler::new(roles)),
        );
        registry
    }

    /// Register a handler; a kind may only be registered once
    pub fn register(&mut self, handler: Arc<dyn DocumentHandler>) -> Result<()> {
        let kind = handler.kind().to_string();
        if self.handlers.contains_key(&kind) {
            return Err(TexdraftError::Config(format!(
                "a handler for '{}' documents is already registered",
                kind
            )));
        }
        info!("Registered document handler: {}", kind);
        self.handlers.insert(kind, handler);
        Ok(())
    }

    pub fn get(&self, kind: &str) -> Result<Arc<dyn DocumentHandler>> {
        self.handlers
            .get(kind)
            .cloned()
            .ok_or_else(|| TexdraftError::Config(format!("no handler for '{}' documents", kind)))
    }

    /// Registered kinds, sorted
    pub fn kinds(&self) -> Vec<&str> {
        let mut kinds: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        kinds.sort_unstable();
        kinds
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delta::DeltaEvent;
    use tokio::sync::mpsc;

    fn registry() -> HandlerRegistry {
        HandlerRegistry::with_defaults(Arc::new(ModelRoleTable::test()))
    }

    #[tokio::test]
    async fn test_create_streams_and_returns_final() {
        let handler = registry().get("latex").unwrap();
        let mut sink: Vec<DeltaEvent> = Vec::new();
        let content = handler
            .on_create_document("Quadratic formula", &mut sink)
            .await
            .unwrap();

        assert!(!sink.is_empty());
        assert_eq!(sink.last().unwrap().content, content);
        assert!(content.ends_with(r"\end{document}"));
    }

    #[tokio::test]
    async fn test_update_over_channel() {
        let handler = registry().get("latex").unwrap();
        let document = Document::new("Notes", "latex", r"\section{Old}");
        let (mut tx, mut rx) = mpsc::unbounded_channel();

        let content = handler
            .on_update_document(&document, "Add a proof", &mut tx)
            .await
            .unwrap();
        drop(tx);

        let mut last = None;
        while let Some(event) = rx.recv().await {
            last = Some(event);
        }
        assert_eq!(last.unwrap().content, content);
    }

    #[tokio::test]
    async fn test_run_completes_without_receiver() {
        let handler = registry().get("latex").unwrap();
        let (mut tx, rx) = mpsc::unbounded_channel();
        drop(rx);

        let content = handler.on_create_document("Orphaned", &mut tx).await.unwrap();
        assert!(content.contains(r"\begin{document}"));
    }

    #[test]
    fn test_registry_lookup() {
        let mut registry = registry();
        assert_eq!(registry.kinds(), vec!["latex"]);
        assert!(registry.get("spreadsheet").err().unwrap().is_config());

        let duplicate = Arc::new(LatexDocumentHandler::new(Arc::new(ModelRoleTable::test())));
        assert!(registry.register(duplicate).unwrap_err().is_config());
    }
}
