//! Reasoning extraction for models that think out loud
//!
//! Some models wrap their chain of thought in a tag pair such as
//! `<think>...</think>`. [`ReasoningExtractor`] removes those segments from the
//! visible text stream. Tags may be split across stream units, so the splitter
//! holds back any suffix that could still become a tag.

use crate::model::{LanguageModel, ModelRequest, TextStream};
use async_trait::async_trait;
use futures_util::StreamExt;
use std::sync::Arc;
use texdraft_common::Result;
use tracing::debug;

/// Output of one splitter step
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Split {
    /// Visible text
    pub text: String,
    /// Text found inside the reasoning tags
    pub reasoning: String,
}

/// Incremental splitter separating tagged reasoning from visible text
#[derive(Debug, Clone)]
pub struct TagSplitter {
    open: String,
    close: String,
    in_reasoning: bool,
    pending: String,
}

impl TagSplitter {
    /// Create a splitter for `<tag>` / `</tag>`
    pub fn new(tag: &str) -> Self {
        Self {
            open: format!("<{}>", tag),
            close: format!("</{}>", tag),
            in_reasoning: false,
            pending: String::new(),
        }
    }

    /// Feed the next unit of text
    pub fn push(&mut self, chunk: &str) -> Split {
        self.pending.push_str(chunk);
        let mut split = Split::default();

        loop {
            let tag = if self.in_reasoning {
                self.close.clone()
            } else {
                self.open.clone()
            };
            match self.pending.find(&tag) {
                Some(idx) => {
                    let before: String = self.pending.drain(..idx).collect();
                    self.pending.drain(..tag.len());
                    self.route(&mut split, &before);
                    self.in_reasoning = !self.in_reasoning;
                }
                None => {
                    // Hold back a suffix that is a prefix of the tag we wait for.
                    let keep = partial_tag_len(&self.pending, &tag);
                    let ready_len = self.pending.len() - keep;
                    let ready: String = self.pending.drain(..ready_len).collect();
                    self.route(&mut split, &ready);
                    break;
                }
            }
        }

        split
    }

    /// Flush whatever is still held back at end of stream
    pub fn finish(&mut self) -> Split {
        let mut split = Split::default();
        let rest = std::mem::take(&mut self.pending);
        self.route(&mut split, &rest);
        split
    }

    fn route(&self, split: &mut Split, text: &str) {
        if self.in_reasoning {
            split.reasoning.push_str(text);
        } else {
            split.text.push_str(text);
        }
    }
}

/// Length of the longest suffix of `text` that is a proper prefix of `tag`
fn partial_tag_len(text: &str, tag: &str) -> usize {
    (1..tag.len())
        .rev()
        .find(|&k| text.ends_with(&tag[..k]))
        .unwrap_or(0)
}

/// Wraps a model and strips tagged reasoning from its text stream
pub struct ReasoningExtractor {
    inner: Arc<dyn LanguageModel>,
    tag: String,
}

impl ReasoningExtractor {
    pub fn new(inner: Arc<dyn LanguageModel>, tag: &str) -> Self {
        Self {
            inner,
            tag: tag.to_string(),
        }
    }
}

#[async_trait]
impl LanguageModel for ReasoningExtractor {
    fn model_id(&self) -> &str {
        self.inner.model_id()
    }

    async fn stream_text(&self, request: ModelRequest) -> Result<TextStream> {
        let inner = self.inner.stream_text(request).await?;
        let splitter = TagSplitter::new(&self.tag);

        let stream = futures_util::stream::unfold(Some((inner, splitter)), |state| async move {
            let (mut inner, mut splitter) = state?;
            loop {
                match inner.next().await {
                    Some(Ok(chunk)) => {
                        let split = splitter.push(&chunk);
                        if !split.reasoning.is_empty() {
                            debug!("Reasoning: {}", split.reasoning);
                        }
                        if !split.text.is_empty() {
                            return Some((Ok(split.text), Some((inner, splitter))));
                        }
                    }
                    Some(Err(e)) => return Some((Err(e), None)),
                    None => {
                        let split = splitter.finish();
                        if split.text.is_empty() {
                            return None;
                        }
                        return Some((Ok(split.text), None));
                    }
                }
            }
        });

        Ok(Box::pin(stream))
    }
}
