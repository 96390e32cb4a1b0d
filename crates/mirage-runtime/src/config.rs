//! Runtime configuration for the verification pipeline.
//!
//! Configuration is an explicit struct passed in at construction time.
//! Nothing here reads globals lazily: required values that are absent fail
//! at startup, before the first request. Timeouts in JSON config files are
//! humantime strings ("15s", "2m 30s").

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Errors from configuration loading.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{name} not set: configure '{env_var}' environment variable")]
    MissingCredential { name: &'static str, env_var: String },
}

/// Configuration for the text-side extraction service.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    /// Model to use for noun extraction
    pub model: String,

    /// Maximum tokens to generate
    pub max_tokens: u32,

    /// Temperature (0.0 for deterministic extraction)
    pub temperature: f32,

    /// Request timeout
    #[serde(deserialize_with = "duration_str")]
    pub timeout: Duration,

    /// API endpoint override (None uses the provider default)
    pub base_url: Option<String>,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            model: "llama3-8b-8192".to_string(),
            max_tokens: 500,
            temperature: 0.0,
            timeout: Duration::from_secs(15),
            base_url: None,
        }
    }
}

/// Configuration for the image-side detection model.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Path to the exported ONNX detection model
    pub model_path: PathBuf,

    /// Square input size the model expects
    pub input_size: u32,

    /// Minimum class score for a detection to count
    pub confidence_threshold: f32,

    /// Intra-op thread count for the inference session
    pub intra_threads: usize,

    /// Inference timeout
    #[serde(deserialize_with = "duration_str")]
    pub timeout: Duration,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from("models/yolov8n.onnx"),
            input_size: 640,
            confidence_threshold: 0.25,
            intra_threads: 4,
            timeout: Duration::from_secs(30),
        }
    }
}

/// Configuration for the caption-extraction cache.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum cached captions
    pub capacity: u64,

    /// Time-to-live for cached extractions
    #[serde(deserialize_with = "duration_str")]
    pub ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: 10_000,
            ttl: Duration::from_secs(3600),
        }
    }
}

/// Top-level runtime configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub extractor: ExtractorConfig,
    pub detector: DetectorConfig,
    pub cache: CacheConfig,
}

impl RuntimeConfig {
    /// Parse a configuration from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Parse a configuration from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        Self::from_json(&contents)
    }
}

/// Deserialize a humantime string ("15s") into a Duration.
fn duration_str<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    humantime::parse_duration(&raw).map_err(serde::de::Error::custom)
}
