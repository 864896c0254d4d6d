#[cfg(test)]
mod tests;

use std::fs;
use std::path::Path;
use tracing::debug;

use crate::{LegalRagError, Result};

pub const CONTEXT_PLACEHOLDER: &str = "{context}";
pub const QUESTION_PLACEHOLDER: &str = "{question}";

/// Sentence the model must answer with when the law text does not cover the question
pub const REFUSAL_SENTENCE: &str =
    "The provided sections of the National Penal Code, 2017 do not mention this.";

/// Bundled instruction template
pub const LEGAL_PROMPT: &str = include_str!("legal_prompt.txt");

/// An instruction template known to contain both placeholders
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    text: String,
}

impl Default for PromptTemplate {
    #[inline]
    fn default() -> Self {
        Self {
            text: LEGAL_PROMPT.to_string(),
        }
    }
}

impl PromptTemplate {
    #[inline]
    pub fn new(text: impl Into<String>) -> Result<Self> {
        let text = text.into();
        for placeholder in [CONTEXT_PLACEHOLDER, QUESTION_PLACEHOLDER] {
            if !text.contains(placeholder) {
                return Err(LegalRagError::Template(format!(
                    "template is missing the {} placeholder",
                    placeholder
                )));
            }
        }
        Ok(Self { text })
    }

    /// Read a template file, replacing the bundled one
    #[inline]
    pub fn load(path: &Path) -> Result<Self> {
        debug!("Loading prompt template from {}", path.display());
        let text = fs::read_to_string(path).map_err(|e| {
            LegalRagError::asset_load("template", format!("{}: {}", path.display(), e))
        })?;
        Self::new(text)
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.text
    }

    #[inline]
    pub fn render(&self, context: &str, question: &str) -> String {
        substitute(&self.text, context, question)
    }
}

/// Substitute `context` and `question` into `template`.
///
/// Fails if either placeholder is missing. Placeholder text inside the
/// substituted values is left alone.
#[inline]
pub fn render(template: &str, context: &str, question: &str) -> Result<String> {
    PromptTemplate::new(template).map(|template| template.render(context, question))
}

fn substitute(template: &str, context: &str, question: &str) -> String {
    let mut output = String::with_capacity(template.len() + context.len() + question.len());
    let mut rest = template;

    loop {
        let next_context = rest.find(CONTEXT_PLACEHOLDER);
        let next_question = rest.find(QUESTION_PLACEHOLDER);

        let (position, placeholder, value) = match (next_context, next_question) {
            (Some(c), Some(q)) if c < q => (c, CONTEXT_PLACEHOLDER, context),
            (Some(c), None) => (c, CONTEXT_PLACEHOLDER, context),
            (_, Some(q)) => (q, QUESTION_PLACEHOLDER, question),
            (None, None) => {
                output.push_str(rest);
                return output;
            }
        };

        let (head, tail) = rest.split_at(position);
        output.push_str(head);
        output.push_str(value);
        rest = tail.strip_prefix(placeholder).unwrap_or(tail);
    }
}
