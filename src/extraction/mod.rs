// Extraction - turning unreliable free-text LLM output into a JSON
// structure candidate

pub mod json_extract;
pub mod key_repair;
pub mod markdown_fallback;

pub use json_extract::TextToJSONExtractor;
pub use key_repair::KeyRepairer;
pub use markdown_fallback::{from_markdown, MarkdownFallbackError};

use serde_json::Value;
use thiserror::Error;

/// Why no structure candidate could be recovered from a reply
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractionError {
    #[error("Input text is empty")]
    EmptyInput,

    #[error("No JSON object found in text: {excerpt}")]
    NoJsonFound { excerpt: String },

    #[error("JSON candidate could not be parsed ({detail}): {excerpt}")]
    MalformedJson {
        detail: String,
        excerpt: String,
        /// The repaired-but-unparseable candidate, kept for diagnostics
        candidate: String,
    },
}

/// Extract a structure candidate object from raw model output.
/// Convenience wrapper over a default [`TextToJSONExtractor`].
pub fn extract_structure(text: &str) -> Result<Value, ExtractionError> {
    TextToJSONExtractor::new().extract(text)
}
