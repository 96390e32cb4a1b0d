//! # mirage-runtime
//!
//! Extraction adapters and the verification orchestrator for Mirage.
//!
//! This crate owns every effectful step of the pipeline:
//! - [`extractor`]: the LLM-backed caption noun extractor
//! - [`detector`]: the ONNX-backed image object detector
//! - [`orchestrator`]: the strict extract -> detect -> reconcile sequence
//!
//! The reconciliation itself lives in `mirage-core` and is fully
//! deterministic; nothing in this crate alters its semantics.
//!
//! ## Example
//!
//! ```rust,ignore
//! use mirage_core::{Caption, ImageRef};
//! use mirage_runtime::{
//!     ApiCredential, GroqExtractor, RuntimeConfig, VerificationOrchestratorBuilder,
//!     YoloDetector,
//! };
//!
//! let config = RuntimeConfig::default();
//! let credential = ApiCredential::from_env("GROQ_API_KEY", "Groq API key")?;
//! let orchestrator = VerificationOrchestratorBuilder::new()
//!     .extractor(Arc::new(GroqExtractor::new(credential, config.extractor.clone())))
//!     .detector(Arc::new(YoloDetector::new(config.detector.clone())?))
//!     .config(config)
//!     .build()?;
//!
//! let run = orchestrator
//!     .verify(&ImageRef::from_path("assets/dogs.jpg"), &Caption::new("two dogs")?)
//!     .await?;
//! println!("{}", run.report.hallucinated());
//! ```

pub mod cache;
pub mod config;
pub mod detector;
pub mod extractor;
pub mod orchestrator;
pub mod prompts;
pub mod secrets;
pub mod usage;

// Re-export main types at crate root
pub use cache::ExtractionCache;
pub use config::{CacheConfig, ConfigError, DetectorConfig, ExtractorConfig, RuntimeConfig};
pub use detector::{DetectorError, ImageObjectDetector, YoloDetector};
pub use extractor::{
    Extraction, ExtractorError, GroqExtractor, TextObjectExtractor, TokenUsage, GROQ_API_KEY_ENV,
};
pub use orchestrator::{
    PipelineError, VerificationOrchestrator, VerificationOrchestratorBuilder, VerificationRun,
};
pub use secrets::{ApiCredential, CredentialSource};
pub use usage::{LlmUsage, UsageTracker};
