//! Common constants used across texdraft

/// Logical model role names understood by the role table
pub mod roles {
    pub const CHAT: &str = "chat";
    pub const CHAT_REASONING: &str = "chat-reasoning";
    pub const TITLE: &str = "title";
    pub const ARTIFACT: &str = "artifact";
    pub const LATEX: &str = "latex";

    /// Every role both provider configurations must register
    pub const ALL: [&str; 5] = [CHAT, CHAT_REASONING, TITLE, ARTIFACT, LATEX];
}

/// Document kind tags
pub mod kinds {
    pub const LATEX: &str = "latex";

    /// Suffix appended to a kind to form its delta event tag
    pub const DELTA_SUFFIX: &str = "-delta";
}

/// Hosted model defaults for the live configuration
pub mod models {
    pub const GEMINI_2_0_FLASH: &str = "gemini-2.0-flash";
}

/// Environment variables read at startup
pub mod env {
    /// Boolean flag selecting the deterministic test configuration
    pub const TEST_MODE: &str = "TEXDRAFT_TEST_MODE";
    /// Optional override of the live model name
    pub const LIVE_MODEL: &str = "TEXDRAFT_LIVE_MODEL";
}

/// Tag used by reasoning models to wrap their chain of thought
pub const REASONING_TAG: &str = "think";
