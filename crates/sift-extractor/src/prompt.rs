//! Prompt construction for item extraction

use sift_llm::Message;

/// Builds the messages sent to the model for one chunk
pub struct PromptBuilder<'a> {
    text: &'a str,
    source_document_id: &'a str,
    chunk: Option<(usize, usize)>,
    known_titles: Vec<String>,
}

impl<'a> PromptBuilder<'a> {
    /// Create a new prompt builder for `text`
    pub fn new(text: &'a str, source_document_id: &'a str) -> Self {
        Self {
            text,
            source_document_id,
            chunk: None,
            known_titles: Vec::new(),
        }
    }

    /// Mark the text as chunk `index` (zero-based) of `total`
    pub fn with_chunk(mut self, index: usize, total: usize) -> Self {
        if total > 1 {
            self.chunk = Some((index, total));
        }
        self
    }

    /// Titles already extracted from earlier chunks, to avoid repeats
    pub fn with_known_titles(mut self, titles: Vec<String>) -> Self {
        self.known_titles = titles;
        self
    }

    /// Build the system and user messages
    pub fn build(&self) -> Vec<Message> {
        vec![Message::system(SYSTEM_INSTRUCTIONS), Message::user(self.user_prompt())]
    }

    fn user_prompt(&self) -> String {
        let mut prompt = String::new();

        prompt.push_str(&format!("Source document: {}\n", self.source_document_id));
        if let Some((index, total)) = self.chunk {
            prompt.push_str(&format!(
                "This is part {} of {} of the document; parts overlap slightly.\n",
                index + 1,
                total
            ));
        }
        prompt.push('\n');

        if !self.known_titles.is_empty() {
            prompt.push_str("Items already extracted from earlier parts (do not repeat them):\n");
            for title in self.known_titles.iter().take(30) {
                prompt.push_str(&format!("- {}\n", title));
            }
            prompt.push('\n');
        }

        prompt.push_str("Text to analyze:\n");
        prompt.push_str("---\n");
        prompt.push_str(self.text);
        prompt.push_str("\n---\n\n");

        prompt.push_str(OUTPUT_FORMAT_REMINDER);
        prompt
    }
}

const SYSTEM_INSTRUCTIONS: &str = r#"You extract discrete knowledge items from documents.
Each item captures one self-contained fact, concept, technique or conclusion.

Rules:
- One idea per item; the content must stand on its own without the document
- Titles are short (under 80 characters) and specific
- Include a one-paragraph summary when the content is long
- List the key conclusions a reader should remember
- Confidence is 0-100: how clearly the source supports the item
  - Speculative or hedged statements: 30-50
  - Plausible but thinly supported: 50-70
  - Clearly stated: 70-90
  - Definitive, well-evidenced: 90-100
- At most 5 short lowercase tags per item
- Quote a short supporting excerpt from the source verbatim
- Skip boilerplate, navigation text and disclaimers"#;

const OUTPUT_FORMAT_REMINDER: &str = r#"Output format (JSON array only, no additional text):
[
  {
    "title": "short title",
    "content": "the knowledge item",
    "summary": "optional summary",
    "keyConclusions": ["conclusion"],
    "confidence": 80,
    "tags": ["tag"],
    "sourcePage": null,
    "sourceExcerpt": "verbatim excerpt"
  }
]

Remember: Return ONLY valid JSON. Return [] when the text holds no knowledge worth keeping."#;

#[cfg(test)]
mod tests {
    use super::*;
    use sift_llm::Role;

    #[test]
    fn test_prompt_includes_text() {
        let messages = PromptBuilder::new("Rust has no garbage collector.", "doc-1").build();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::System);
        assert!(messages[1].content.contains("Rust has no garbage collector."));
        assert!(messages[1].content.contains("Source document: doc-1"));
        assert!(messages[1].content.contains("keyConclusions"));
    }

    #[test]
    fn test_chunk_position() {
        let messages = PromptBuilder::new("text", "doc").with_chunk(1, 3).build();
        assert!(messages[1].content.contains("part 2 of 3"));

        let single = PromptBuilder::new("text", "doc").with_chunk(0, 1).build();
        assert!(!single[1].content.contains("part 1 of 1"));
    }

    #[test]
    fn test_known_titles() {
        let messages = PromptBuilder::new("text", "doc")
            .with_known_titles(vec!["Ownership".to_string()])
            .build();
        assert!(messages[1].content.contains("- Ownership"));
    }
}
