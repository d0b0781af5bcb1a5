//! Delta events: full-content snapshots streamed from generator to editor

use serde::{Deserialize, Serialize};
use std::fmt;
use texdraft_common::{Result, TexdraftError, kinds};
use tokio::sync::mpsc;
use tracing::debug;

/// Document kind a delta belongs to
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DeltaKind {
    Latex,
    /// Any other document kind carried over the same channel
    Other(String),
}

impl DeltaKind {
    /// Kind tag, e.g. "latex"
    pub fn as_str(&self) -> &str {
        match self {
            DeltaKind::Latex => kinds::LATEX,
            DeltaKind::Other(kind) => kind,
        }
    }

    /// Wire tag, e.g. "latex-delta"
    pub fn tag(&self) -> String {
        format!("{}{}", self.as_str(), kinds::DELTA_SUFFIX)
    }

    /// Parse a wire tag
    pub fn from_tag(tag: &str) -> Option<Self> {
        let kind = tag.strip_suffix(kinds::DELTA_SUFFIX)?;
        match kind {
            "" => None,
            kinds::LATEX => Some(DeltaKind::Latex),
            other => Some(DeltaKind::Other(other.to_string())),
        }
    }
}

impl fmt::Display for DeltaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A complete replacement snapshot of document content.
///
/// Serialized as `{"type": "<kind>-delta", "content": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "WireDelta", into = "WireDelta")]
pub struct DeltaEvent {
    pub kind: DeltaKind,
    pub content: String,
}

impl DeltaEvent {
    pub fn new(kind: DeltaKind, content: impl Into<String>) -> Self {
        Self {
            kind,
            content: content.into(),
        }
    }

    pub fn latex(content: impl Into<String>) -> Self {
        Self::new(DeltaKind::Latex, content)
    }
}

#[derive(Serialize, Deserialize)]
struct WireDelta {
    #[serde(rename = "type")]
    tag: String,
    content: String,
}

impl TryFrom<WireDelta> for DeltaEvent {
    type Error = TexdraftError;

    fn try_from(wire: WireDelta) -> Result<Self> {
        let kind = DeltaKind::from_tag(&wire.tag).ok_or_else(|| {
            TexdraftError::Validation(format!("not a delta event type: '{}'", wire.tag))
        })?;
        Ok(DeltaEvent {
            kind,
            content: wire.content,
        })
    }
}

impl From<DeltaEvent> for WireDelta {
    fn from(event: DeltaEvent) -> Self {
        WireDelta {
            tag: event.kind.tag(),
            content: event.content,
        }
    }
}

/// Destination for delta events while a document is streaming
pub trait DeltaSink: Send {
    fn write_delta(&mut self, event: DeltaEvent) -> Result<()>;
}

/// The host streaming channel. Once the receiving side is gone, events are
/// dropped and the run carries on so its final content can still be stored.
impl DeltaSink for mpsc::UnboundedSender<DeltaEvent> {
    fn write_delta(&mut self, event: DeltaEvent) -> Result<()> {
        if let Err(mpsc::error::SendError(event)) = self.send(event) {
            debug!(
                "No receiver for {} delta ({} chars), dropping",
                event.kind,
                event.content.len()
            );
        }
        Ok(())
    }
}

impl DeltaSink for Vec<DeltaEvent> {
    fn write_delta(&mut self, event: DeltaEvent) -> Result<()> {
        self.push(event);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_format() {
        let event = DeltaEvent::latex(r"\section{Intro}");
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"type": "latex-delta", "content": "\\section{Intro}"})
        );

        let parsed: DeltaEvent =
            serde_json::from_str(r#"{"type":"sheet-delta","content":"a,b"}"#).unwrap();
        assert_eq!(parsed.kind, DeltaKind::Other("sheet".to_string()));
        assert_eq!(parsed.content, "a,b");
    }

    #[test]
    fn test_rejects_non_delta_type() {
        assert!(serde_json::from_str::<DeltaEvent>(r#"{"type":"finish","content":""}"#).is_err());
        assert!(serde_json::from_str::<DeltaEvent>(r#"{"type":"-delta","content":""}"#).is_err());
    }

    #[test]
    fn test_channel_sink_drops_after_receiver_gone() {
        let (mut tx, rx) = mpsc::unbounded_channel();
        tx.write_delta(DeltaEvent::latex("a")).unwrap();
        drop(rx);
        assert!(tx.write_delta(DeltaEvent::latex("ab")).is_ok());
    }
}
