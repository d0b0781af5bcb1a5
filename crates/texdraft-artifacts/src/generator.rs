//! LaTeX document generator
//!
//! Asks the `latex` model role for a JSON object `{"latex": string}` and turns
//! the growing object into a stream of full-content [`DeltaEvent`]s.

use crate::delta::{DeltaEvent, DeltaKind, DeltaSink};
use crate::partial_json::parse_partial;
use crate::prompts::{CREATE_LATEX_PROMPT, update_document_prompt};
use futures_util::{Stream, StreamExt};
use serde::Deserialize;
use serde_json::json;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use texdraft_common::{Result, kinds, roles};
use texdraft_llm::{ModelRequest, ModelRoleTable, TextStream};
use tracing::{debug, info, warn};

/// What a run should produce
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationInput {
    /// A new document from a title or description
    Create { title: String },
    /// A revision of an existing document
    Update {
        current_content: String,
        instruction: String,
    },
}

/// Partial content object as it grows during streaming
#[derive(Debug, Deserialize)]
struct LatexDraft {
    #[serde(default)]
    latex: Option<String>,
}

/// JSON schema of the content object
pub fn latex_schema() -> serde_json::Value {
    json!({
        "type": "object",
        "properties": {
            "latex": { "type": "string" }
        },
        "required": ["latex"],
        "additionalProperties": false
    })
}

/// Produces delta streams for LaTeX documents
pub struct Generator {
    roles: Arc<ModelRoleTable>,
}

impl Generator {
    pub fn new(roles: Arc<ModelRoleTable>) -> Self {
        Self { roles }
    }

    fn request(input: &GenerationInput) -> ModelRequest {
        let request = match input {
            GenerationInput::Create { title } => ModelRequest::new(title.clone())
                .with_system(CREATE_LATEX_PROMPT),
            GenerationInput::Update {
                current_content,
                instruction,
            } => ModelRequest::new(instruction.clone())
                .with_system(update_document_prompt(current_content, kinds::LATEX)),
        };
        request.with_json_schema(latex_schema())
    }

    /// Start a run. The returned stream is lazy and can be consumed once.
    pub async fn generate(&self, input: GenerationInput) -> Result<DeltaStream> {
        let model = self.roles.lookup(roles::LATEX)?;
        info!(
            "Starting latex {} run on {}",
            match input {
                GenerationInput::Create { .. } => "create",
                GenerationInput::Update { .. } => "update",
            },
            model.model_id()
        );

        let upstream = model.stream_text(Self::request(&input)).await?;
        Ok(DeltaStream::new(upstream, DeltaKind::Latex))
    }
}

/// Stream of delta events for one run.
///
/// Each upstream text unit is appended to the raw object text; whenever the
/// repaired object carries new non-empty content, one snapshot event is
/// yielded. Units that do not parse or validate are skipped. An upstream error
/// ends the stream after being yielded once.
pub struct DeltaStream {
    upstream: TextStream,
    kind: DeltaKind,
    raw: String,
    final_content: String,
    units: usize,
    emitted: usize,
    finished: bool,
}

impl DeltaStream {
    pub fn new(upstream: TextStream, kind: DeltaKind) -> Self {
        Self {
            upstream,
            kind,
            raw: String::new(),
            final_content: String::new(),
            units: 0,
            emitted: 0,
            finished: false,
        }
    }

    /// Content of the most recent event
    pub fn final_content(&self) -> &str {
        &self.final_content
    }

    pub fn into_final_content(self) -> String {
        self.final_content
    }

    /// Number of events yielded so far
    pub fn emitted(&self) -> usize {
        self.emitted
    }

    /// Forward every event into `sink` and return the final content
    pub async fn forward_to(mut self, sink: &mut dyn DeltaSink) -> Result<String> {
        while let Some(event) = self.next().await {
            sink.write_delta(event?)?;
        }
        Ok(self.into_final_content())
    }

    fn absorb(&mut self, unit: &str) -> Option<DeltaEvent> {
        self.units += 1;
        self.raw.push_str(unit);

        let draft: LatexDraft = match parse_partial(&self.raw) {
            Ok(draft) => draft,
            Err(e) => {
                debug!("Skipping unit {}: {}", self.units, e);
                return None;
            }
        };

        match draft.latex {
            Some(content) if !content.is_empty() && content != self.final_content => {
                self.final_content = content.clone();
                self.emitted += 1;
                debug!(
                    "Emitting {} delta #{} ({} chars)",
                    self.kind,
                    self.emitted,
                    content.len()
                );
                Some(DeltaEvent::new(self.kind.clone(), content))
            }
            _ => None,
        }
    }
}

impl Stream for DeltaStream {
    type Item = Result<DeltaEvent>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = &mut *self;
        if this.finished {
            return Poll::Ready(None);
        }

        loop {
            match this.upstream.as_mut().poll_next(cx) {
                Poll::Pending => return Poll::Pending,
                Poll::Ready(None) => {
                    this.finished = true;
                    info!(
                        "Latex run finished: {} units, {} deltas, {} chars",
                        this.units,
                        this.emitted,
                        this.final_content.len()
                    );
                    return Poll::Ready(None);
                }
                Poll::Ready(Some(Err(e))) => {
                    this.finished = true;
                    warn!("Latex run failed after {} deltas: {}", this.emitted, e);
                    return Poll::Ready(Some(Err(e)));
                }
                Poll::Ready(Some(Ok(unit))) => {
                    if let Some(event) = this.absorb(&unit) {
                        return Poll::Ready(Some(Ok(event)));
                    }
                }
            }
        }
    }
}
