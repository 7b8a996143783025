//! Prompt templates for elicited similarity ratings.
//!
//! The model is asked for a bare number in [0, 1]; the scorer rescales it to
//! the target range. Sentences are inserted verbatim.

use crate::gateway::Message;

// =============================================================================
// Prompt templates
// =============================================================================

/// Rendered prompt ready for the model.
#[derive(Debug, Clone)]
pub struct PromptInstance {
    pub template_slug: &'static str,
    pub user: String,
}

impl PromptInstance {
    /// The whole prompt goes out as one user turn.
    pub fn to_messages(&self) -> Vec<Message> {
        vec![Message::user(&self.user)]
    }
}

/// A prompt template with `{sentence1}` / `{sentence2}` placeholders.
#[derive(Debug, Clone, Copy)]
pub struct PromptTemplate {
    pub slug: &'static str,
    pub user: &'static str,
}

const SENTENCE1: &str = "{sentence1}";
const SENTENCE2: &str = "{sentence2}";

impl PromptTemplate {
    /// Single pass over the template; sentence text is never re-expanded.
    pub fn render(&self, sentence1: &str, sentence2: &str) -> PromptInstance {
        let mut user = String::with_capacity(self.user.len() + sentence1.len() + sentence2.len());
        let mut rest = self.user;
        while let Some(start) = rest.find('{') {
            user.push_str(&rest[..start]);
            let tail = &rest[start..];
            let (value, len) = if tail.starts_with(SENTENCE1) {
                (sentence1, SENTENCE1.len())
            } else if tail.starts_with(SENTENCE2) {
                (sentence2, SENTENCE2.len())
            } else {
                ("{", 1)
            };
            user.push_str(value);
            rest = &tail[len..];
        }
        user.push_str(rest);
        PromptInstance {
            template_slug: self.slug,
            user,
        }
    }
}

pub const SIMILARITY_UNIT_V1: PromptTemplate = PromptTemplate {
    slug: "similarity_unit_v1",
    user: r#"You are a helpful assistant that rates semantic similarity between sentences.
Return *only* a single decimal number between 0.0 and 1.0 representing similarity.
0.0 means completely different, 1.0 means identical. No extra text or explanation.

Sentence 1: {sentence1}
Sentence 2: {sentence2}

Please output the numerical similarity score between 0.0 and 1.0, and *nothing else*."#,
};

pub const DEFAULT_TEMPLATE: PromptTemplate = SIMILARITY_UNIT_V1;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::Role;

    #[test]
    fn renders_both_sentences_into_one_user_message() {
        let prompt = DEFAULT_TEMPLATE.render("A cat sat.", "A dog ran.");
        assert!(prompt.user.contains("Sentence 1: A cat sat.\n"));
        assert!(prompt.user.contains("Sentence 2: A dog ran.\n"));
        assert!(!prompt.user.contains("{sentence"));

        let messages = prompt.to_messages();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].role, Role::User);
    }

    #[test]
    fn placeholder_text_inside_a_sentence_is_left_alone() {
        let prompt = DEFAULT_TEMPLATE.render("literal {sentence2}", "b");
        assert!(prompt.user.contains("Sentence 1: literal {sentence2}\n"));
        assert!(prompt.user.contains("Sentence 2: b\n"));

        let prompt = DEFAULT_TEMPLATE.render("AAA", "literal {sentence1}");
        assert!(prompt.user.contains("Sentence 1: AAA\n"));
        assert!(prompt.user.contains("Sentence 2: literal {sentence1}\n"));
    }

    #[test]
    fn stray_braces_in_template_survive() {
        let template = PromptTemplate {
            slug: "braces",
            user: "{x} {sentence1} {",
        };
        assert_eq!(template.render("a", "b").user, "{x} a {");
    }
}
