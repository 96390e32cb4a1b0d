//! Text-side object extraction.
//!
//! This module defines the trait for caption noun extractors and the Groq
//! chat-completions implementation.
//!
//! An extractor converts a caption into a normalized [`ObjectSet`]. An empty
//! extraction is an *error*, not a valid empty set: the service is never
//! expected to legitimately report zero objects for a non-empty caption, so
//! callers must not be able to mistake "service failed" for "nothing found".

use async_trait::async_trait;
use mirage_core::{Caption, ObjectSet, PayloadError};
use std::time::Duration;
use thiserror::Error;

mod groq;

pub use groq::{GroqExtractor, GROQ_API_KEY_ENV};

/// Errors from caption object extractors.
#[derive(Error, Debug)]
pub enum ExtractorError {
    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("rate limit exceeded, retry after {retry_after:?}")]
    RateLimited { retry_after: Option<Duration> },

    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("malformed API response: {0}")]
    Parse(String),

    #[error("unusable extraction payload: {0}")]
    Payload(#[from] PayloadError),

    #[error("timeout after {0:?}")]
    Timeout(Duration),

    #[error("extractor not configured: {0}")]
    NotConfigured(String),

    #[error("service reported no objects for a non-empty caption")]
    Empty,
}

/// Token usage from one extraction call.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokenUsage {
    /// Tokens in the prompt
    pub prompt_tokens: u32,

    /// Tokens in the completion
    pub completion_tokens: u32,
}

impl TokenUsage {
    /// Total tokens used.
    pub fn total(&self) -> u32 {
        self.prompt_tokens + self.completion_tokens
    }
}

/// A successful extraction: the object set plus what it cost.
#[derive(Debug, Clone)]
pub struct Extraction {
    /// Normalized, deduplicated caption objects. Never empty.
    pub objects: ObjectSet,

    /// Token usage for this call (zero for cached or local extractors).
    pub usage: TokenUsage,
}

/// Extractor abstraction allows swapping text-understanding backends.
///
/// One outbound service call per invocation, no retries. Transport and
/// parse errors are caught at this boundary and surfaced as typed
/// [`ExtractorError`]s; they never escape as panics.
#[async_trait]
pub trait TextObjectExtractor: Send + Sync {
    /// Extract the concrete object nouns mentioned in a caption.
    async fn extract(&self, caption: &Caption) -> Result<Extraction, ExtractorError>;

    /// Get extractor name for logs.
    fn name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_usage_total() {
        let usage = TokenUsage {
            prompt_tokens: 100,
            completion_tokens: 50,
        };
        assert_eq!(usage.total(), 150);
    }

    #[test]
    fn empty_error_names_the_contract() {
        let message = ExtractorError::Empty.to_string();
        assert!(message.contains("no objects"));
    }
}
