//! System prompts for LaTeX document runs

/// System prompt used when a new document is created from a title
pub const CREATE_LATEX_PROMPT: &str = "\
You write complete, well-structured LaTeX documents from a title or short description.
Produce the full source, including the preamble. The document must:
1. open with a \\documentclass line and a preamble;
2. load the packages needed for mathematical notation (amsmath, amssymb, amsthm);
3. use proper environments for theorems, proofs and equations;
4. include sample content that shows what the document is about;
5. typeset inline math with $...$ and display math with $$...$$;
6. carry short comments explaining the less obvious commands.
The source must compile as-is and end with \\end{document}.";

/// System prompt used when an existing document is revised
pub fn update_document_prompt(current_content: &str, kind: &str) -> String {
    format!(
        "Improve the following {kind} document according to the user's instruction.\n\
         Return the complete revised document, not a diff, and keep everything the \
         instruction does not ask to change.\n\n\
         {current_content}"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_prompt_embeds_document() {
        let prompt = update_document_prompt("\\section{Old}", "latex");
        assert!(prompt.contains("following latex document"));
        assert!(prompt.ends_with("\\section{Old}"));
    }
}
