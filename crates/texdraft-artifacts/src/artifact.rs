//! Client-side artifact state: visibility, versions, actions and toolbar

use crate::buffer::RunStatus;
use crate::delta::{DeltaEvent, DeltaKind};
use crate::document::Document;
use serde::{Deserialize, Serialize};
use texdraft_common::kinds;

/// User message sent by the "Request suggestions" toolbar entry
pub const SUGGESTIONS_MESSAGE: &str = "Please suggest improvements to my LaTeX document.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactMode {
    Edit,
    Diff,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionChange {
    Prev,
    Next,
    Latest,
    /// Switch between edit and diff mode
    Toggle,
}

/// What the artifact panel shows for one document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactState {
    pub document_id: Option<String>,
    pub title: String,
    pub kind: String,
    pub content: String,
    pub status: RunStatus,
    pub is_visible: bool,
    pub mode: ArtifactMode,
    pub versions: Vec<Document>,
    pub current_version_index: usize,
}

impl ArtifactState {
    pub fn new(kind: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            document_id: None,
            title: title.into(),
            kind: kind.into(),
            content: String::new(),
            status: RunStatus::Idle,
            is_visible: false,
            mode: ArtifactMode::Edit,
            versions: Vec::new(),
            current_version_index: 0,
        }
    }

    /// Record a saved version and jump to it
    pub fn push_version(&mut self, document: Document) {
        self.document_id = Some(document.id.clone());
        self.title = document.title.clone();
        self.content = document.content.clone();
        self.versions.push(document);
        self.current_version_index = self.versions.len() - 1;
    }

    pub fn handle_version_change(&mut self, change: VersionChange) {
        match change {
            VersionChange::Prev => {
                self.current_version_index = self.current_version_index.saturating_sub(1);
            }
            VersionChange::Next => {
                if self.current_version_index + 1 < self.versions.len() {
                    self.current_version_index += 1;
                }
            }
            VersionChange::Latest => {
                self.current_version_index = self.versions.len().saturating_sub(1);
                self.mode = ArtifactMode::Edit;
            }
            VersionChange::Toggle => {
                self.mode = match self.mode {
                    ArtifactMode::Edit => ArtifactMode::Diff,
                    ArtifactMode::Diff => ArtifactMode::Edit,
                };
                return;
            }
        }
        if let Some(version) = self.versions.get(self.current_version_index) {
            self.content = version.content.clone();
        }
    }

    pub fn is_current_version(&self) -> bool {
        self.versions.is_empty() || self.current_version_index + 1 == self.versions.len()
    }

    pub fn content_at(&self, index: usize) -> Option<&str> {
        self.versions.get(index).map(|v| v.content.as_str())
    }

    /// (previous, current) contents for the diff view
    pub fn diff_contents(&self) -> Option<(&str, &str)> {
        let previous = self.content_at(self.current_version_index.checked_sub(1)?)?;
        let current = self.content_at(self.current_version_index)?;
        Some((previous, current))
    }

    /// Mark the run finished
    pub fn finish_stream(&mut self) {
        self.status = RunStatus::Idle;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactAction {
    ViewPrevious,
    ViewNext,
    Copy,
}

impl ArtifactAction {
    pub fn description(&self) -> &'static str {
        match self {
            ArtifactAction::ViewPrevious => "View Previous version",
            ArtifactAction::ViewNext => "View Next version",
            ArtifactAction::Copy => "Copy to clipboard",
        }
    }

    pub fn is_disabled(&self, state: &ArtifactState) -> bool {
        match self {
            ArtifactAction::ViewPrevious => state.current_version_index == 0,
            ArtifactAction::ViewNext => state.is_current_version(),
            ArtifactAction::Copy => false,
        }
    }

    /// Apply the action. `Copy` returns the text to place on the clipboard.
    pub fn run(&self, state: &mut ArtifactState) -> Option<String> {
        match self {
            ArtifactAction::ViewPrevious => {
                state.handle_version_change(VersionChange::Prev);
                None
            }
            ArtifactAction::ViewNext => {
                state.handle_version_change(VersionChange::Next);
                None
            }
            ArtifactAction::Copy => Some(state.content.clone()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolbarAction {
    RequestSuggestions,
}

impl ToolbarAction {
    pub fn description(&self) -> &'static str {
        match self {
            ToolbarAction::RequestSuggestions => "Request suggestions",
        }
    }

    /// The user message appended to the conversation
    pub fn message(&self) -> &'static str {
        match self {
            ToolbarAction::RequestSuggestions => SUGGESTIONS_MESSAGE,
        }
    }
}

/// The LaTeX artifact definition
pub struct LatexArtifact;

impl LatexArtifact {
    pub const KIND: &'static str = kinds::LATEX;
    pub const DESCRIPTION: &'static str =
        "Useful for LaTeX documents with mathematical equations and formatting.";

    /// Apply a stream part to the panel state. Returns whether it was a LaTeX delta.
    pub fn on_stream_part(state: &mut ArtifactState, event: &DeltaEvent) -> bool {
        if event.kind != DeltaKind::Latex {
            return false;
        }
        state.content = event.content.clone();
        state.is_visible = true;
        state.status = RunStatus::Streaming;
        true
    }

    pub fn actions() -> [ArtifactAction; 3] {
        [
            ArtifactAction::ViewPrevious,
            ArtifactAction::ViewNext,
            ArtifactAction::Copy,
        ]
    }

    pub fn toolbar() -> [ToolbarAction; 1] {
        [ToolbarAction::RequestSuggestions]
    }
}

/// First `max_lines` lines of `content`, with an ellipsis line when cut
pub fn preview(content: &str, max_lines: usize) -> String {
    let mut lines = content.lines();
    let mut shown: Vec<&str> = lines.by_ref().take(max_lines).collect();
    if lines.next().is_some() {
        shown.push("...");
    }
    shown.join("\n")
}
