//! Models backing the deterministic test configuration

use crate::model::ModelRequest;
use crate::scripted::{ScriptedModel, split_text_into_chunks};
use serde_json::json;

/// Characters per streamed unit for the scripted test models
const TEST_CHUNK_SIZE: usize = 24;

pub fn chat_model() -> ScriptedModel {
    ScriptedModel::new("test-chat-model", |_| {
        split_text_into_chunks("Hello, world! This is a test response.", TEST_CHUNK_SIZE)
    })
}

pub fn reasoning_model() -> ScriptedModel {
    ScriptedModel::new("test-reasoning-model", |_| {
        split_text_into_chunks(
            "<think>The user wants a test reply.</think>Hello, world!",
            TEST_CHUNK_SIZE,
        )
    })
}

pub fn title_model() -> ScriptedModel {
    ScriptedModel::new("test-title-model", |_| vec!["This is a test title".to_string()])
}

pub fn artifact_model() -> ScriptedModel {
    ScriptedModel::new("test-artifact-model", |request| {
        let body = json!({ "content": format!("Test document about {}", request.prompt) });
        split_text_into_chunks(&body.to_string(), TEST_CHUNK_SIZE)
    })
}

/// Streams a JSON object `{"latex": ...}` holding a complete document titled
/// after the prompt.
pub fn latex_model() -> ScriptedModel {
    ScriptedModel::new("test-latex-model", |request: &ModelRequest| {
        let body = json!({ "latex": latex_document(&request.prompt) });
        split_text_into_chunks(&body.to_string(), TEST_CHUNK_SIZE)
    })
}

fn latex_document(title: &str) -> String {
    let title = escape_latex(title.trim());
    let title_line = format!(r"\title{{{}}}", title);
    let section_line = format!(r"\section{{{}}}", title);
    [
        r"\documentclass{article}",
        r"% Math packages",
        r"\usepackage{amsmath}",
        r"\usepackage{amssymb}",
        r"\usepackage{amsthm}",
        r"\newtheorem{theorem}{Theorem}",
        title_line.as_str(),
        r"\begin{document}",
        r"\maketitle",
        section_line.as_str(),
        r"The roots of $ax^2 + bx + c = 0$ with $a \neq 0$ are",
        r"$$x = \frac{-b \pm \sqrt{b^2 - 4ac}}{2a}.$$",
        r"\begin{theorem}",
        r"The discriminant $b^2 - 4ac$ decides how many real roots exist.",
        r"\end{theorem}",
        r"\end{document}",
    ]
    .join("\n")
}

/// Escape characters with special meaning in LaTeX text
pub fn escape_latex(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => escaped.push_str(r"\textbackslash{}"),
            '~' => escaped.push_str(r"\textasciitilde{}"),
            '^' => escaped.push_str(r"\textasciicircum{}"),
            '&' | '%' | '$' | '#' | '_' | '{' | '}' => {
                escaped.push('\\');
                escaped.push(c);
            }
            _ => escaped.push(c),
        }
    }
    escaped
}
