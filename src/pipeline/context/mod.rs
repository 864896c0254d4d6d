
use itertools::Itertools;
use tracing::debug;

use crate::corpus::Document;

pub const DEFAULT_MAX_CONTEXT_CHARS: usize = 1000;

const ENTRY_SEPARATOR: &str = "\n\n";

/// Joins citation-tagged provisions into the bounded law text handed to the model
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextAssembler {
    max_chars: usize,
}

impl Default for ContextAssembler {
    #[inline]
    fn default() -> Self {
        Self::new(DEFAULT_MAX_CONTEXT_CHARS)
    }
}

impl ContextAssembler {
    #[inline]
    pub fn new(max_chars: usize) -> Self {
        Self { max_chars }
    }

    #[inline]
    pub fn max_chars(&self) -> usize {
        self.max_chars
    }

    /// Render every document in rank order, then cut the result at `max_chars`
    /// characters. The cut is not word- or sentence-aware.
    #[inline]
    pub fn build(&self, documents: &[&Document]) -> String {
        let joined = documents
            .iter()
            .map(|document| render_entry(document))
            .join(ENTRY_SEPARATOR);

        let full_len = joined.chars().count();
        let context = truncate_chars(joined, self.max_chars);

        if full_len > self.max_chars {
            debug!(
                "Context truncated from {} to {} characters",
                full_len, self.max_chars
            );
        }
        debug!(
            "Built context from {} documents: {} characters",
            documents.len(),
            context.chars().count()
        );

        context
    }
}

/// `[Chapter {chapter} Section {section}] {text}`
#[inline]
pub fn render_entry(document: &Document) -> String {
    format!(
        "[Chapter {} Section {}] {}",
        document.chapter, document.section, document.text
    )
}

fn truncate_chars(mut text: String, max_chars: usize) -> String {
    if let Some((byte_index, _)) = text.char_indices().nth(max_chars) {
        text.truncate(byte_index);
    }
    text
}
