//! Groq chat-completions extractor implementation.
//!
//! Talks to the Groq OpenAI-compatible `/chat/completions` endpoint with a
//! fixed noun-extraction instruction and JSON response mode. The response
//! content flows through `mirage_core::payload`, which also recovers the
//! common case of the model wrapping its list in a single-key object.
//!
//! ## Security
//!
//! The API key is held in an [`ApiCredential`] and only exposed at the
//! point the Authorization header is built. See the [`secrets`](crate::secrets)
//! module for details.

use async_trait::async_trait;
use mirage_core::{payload, Caption};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{Extraction, ExtractorError, TextObjectExtractor, TokenUsage};
use crate::config::ExtractorConfig;
use crate::prompts::OBJECT_EXTRACTION_PROMPT;
use crate::secrets::ApiCredential;

/// Environment variable name for the Groq API key.
pub const GROQ_API_KEY_ENV: &str = "GROQ_API_KEY";

const DEFAULT_BASE_URL: &str = "https://api.groq.com/openai/v1";

/// Groq-backed caption object extractor.
pub struct GroqExtractor {
    credential: ApiCredential,
    base_url: String,
    config: ExtractorConfig,
}

impl std::fmt::Debug for GroqExtractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GroqExtractor")
            .field("credential", &self.credential)
            .field("base_url", &self.base_url)
            .field("model", &self.config.model)
            .finish()
    }
}

impl GroqExtractor {
    /// Create a new extractor from an already-loaded credential.
    pub fn new(credential: ApiCredential, config: ExtractorConfig) -> Self {
        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        Self {
            credential,
            base_url,
            config,
        }
    }

    /// Create from the `GROQ_API_KEY` environment variable.
    ///
    /// A missing key is a configuration error raised here, at startup,
    /// not on the first request.
    pub fn from_env(config: ExtractorConfig) -> Result<Self, ExtractorError> {
        let credential = ApiCredential::from_env(GROQ_API_KEY_ENV, "Groq API key")
            .map_err(|e| ExtractorError::NotConfigured(e.to_string()))?;
        Ok(Self::new(credential, config))
    }

    /// Set a custom base URL.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    fn get_client(&self) -> &reqwest::Client {
        static CLIENT: std::sync::OnceLock<reqwest::Client> = std::sync::OnceLock::new();
        CLIENT.get_or_init(|| {
            reqwest::Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .expect("Failed to build HTTP client")
        })
    }
}

/// Chat-completions request format.
#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
    response_format: ResponseFormat,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    type_: &'static str,
}

/// Chat-completions response format.
#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<ApiUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: String,
}

#[derive(Debug, Deserialize)]
struct ApiUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

/// Turn raw completion content into a non-empty extraction set.
fn extraction_from_content(content: &str) -> Result<Extraction, ExtractorError> {
    let parsed = payload::parse_object_list(content)?;
    tracing::debug!(shape = ?parsed.shape, count = parsed.names.len(), "parsed extraction payload");

    let objects = parsed.into_set();
    if objects.is_empty() {
        return Err(ExtractorError::Empty);
    }

    Ok(Extraction {
        objects,
        usage: TokenUsage::default(),
    })
}

#[async_trait]
impl TextObjectExtractor for GroqExtractor {
    async fn extract(&self, caption: &Caption) -> Result<Extraction, ExtractorError> {
        let client = self.get_client();

        let request = ChatRequest {
            model: self.config.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: OBJECT_EXTRACTION_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: caption.as_str().to_string(),
                },
            ],
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
            response_format: ResponseFormat {
                type_: "json_object",
            },
        };

        // Only expose the credential here, at the point of use
        let response = client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(self.credential.expose())
            .header("content-type", "application/json")
            .timeout(self.config.timeout)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ExtractorError::Timeout(self.config.timeout)
                } else {
                    ExtractorError::Http(e.to_string())
                }
            })?;

        let status = response.status();

        if status == 429 {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .map(Duration::from_secs);
            return Err(ExtractorError::RateLimited { retry_after });
        }

        if !status.is_success() {
            let error_body = response
                .json::<ApiError>()
                .await
                .map_err(|e| ExtractorError::Parse(e.to_string()))?;

            return Err(ExtractorError::Api {
                status: status.as_u16(),
                message: error_body.error.message,
            });
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| ExtractorError::Parse(e.to_string()))?;

        let usage = body
            .usage
            .map(|u| TokenUsage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
            })
            .unwrap_or_default();

        let content = body
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| ExtractorError::Parse("response contained no choices".to_string()))?;

        let mut extraction = extraction_from_content(&content)?;
        extraction.usage = usage;
        Ok(extraction)
    }

    fn name(&self) -> &str {
        "groq"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::secrets::CredentialSource;
    use mirage_core::ObjectSet;

    fn extractor() -> GroqExtractor {
        let credential =
            ApiCredential::new("test-key", CredentialSource::Programmatic, "Groq API key");
        GroqExtractor::new(credential, ExtractorConfig::default())
    }

    #[test]
    fn extractor_name() {
        assert_eq!(extractor().name(), "groq");
    }

    #[test]
    fn custom_base_url() {
        let e = extractor().with_base_url("http://localhost:8080/v1");
        assert_eq!(e.base_url, "http://localhost:8080/v1");
    }

    #[test]
    fn api_key_not_in_debug_output() {
        let secret = "gsk-super-secret-key-12345";
        let credential =
            ApiCredential::new(secret, CredentialSource::Programmatic, "Groq API key");
        let e = GroqExtractor::new(credential, ExtractorConfig::default());

        let debug_output = format!("{:?}", e);
        assert!(!debug_output.contains(secret), "key leaked in Debug output");
        assert!(debug_output.contains("[REDACTED]"));
    }

    #[test]
    fn flat_list_content_becomes_a_set() {
        let extraction = extraction_from_content(r#"["cat", "dog"]"#).unwrap();
        let expected: ObjectSet = ["cat", "dog"].into_iter().collect();
        assert_eq!(extraction.objects, expected);
    }

    #[test]
    fn wrapped_mixed_case_content_is_recovered() {
        let extraction = extraction_from_content(r#"{"objects": ["Cat", "Dog"]}"#).unwrap();
        let expected: ObjectSet = ["cat", "dog"].into_iter().collect();
        assert_eq!(extraction.objects, expected);
    }

    #[test]
    fn empty_list_is_an_error_not_an_empty_set() {
        assert!(matches!(
            extraction_from_content("[]"),
            Err(ExtractorError::Empty)
        ));
        assert!(matches!(
            extraction_from_content(r#"{"objects": []}"#),
            Err(ExtractorError::Empty)
        ));
    }

    #[test]
    fn non_list_content_is_a_payload_error() {
        assert!(matches!(
            extraction_from_content(r#"{"objects": "cat"}"#),
            Err(ExtractorError::Payload(_))
        ));
    }

    #[test]
    fn response_body_decodes() {
        let body: ChatResponse = serde_json::from_str(
            r#"{
                "choices": [
                    { "message": { "role": "assistant", "content": "[\"dog\"]" } }
                ],
                "model": "llama3-8b-8192",
                "usage": { "prompt_tokens": 80, "completion_tokens": 6, "total_tokens": 86 }
            }"#,
        )
        .unwrap();

        assert_eq!(body.choices.len(), 1);
        assert_eq!(body.usage.unwrap().completion_tokens, 6);
    }
}
