//! Verification orchestrator for the extract -> detect -> reconcile pipeline.
//!
//! The orchestrator owns the strict sequencing and the failure policy:
//! - Caption extraction runs first. If it fails or yields nothing, the
//!   detector is never invoked and the pipeline surfaces failure.
//! - Detection runs second. If it fails or finds nothing, reconciliation
//!   is never invoked.
//! - Reconciliation is the deterministic fan-in from `mirage-core`.
//!
//! Per-request failures are logged and returned as typed [`PipelineError`]s;
//! they never crash the process. No state persists between invocations
//! beyond the shared detector session, the extraction cache, and usage
//! counters, so `verify` is idempotent given identical inputs and identical
//! external-service responses.

use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use mirage_core::{Caption, ImageRef, ObjectSet, Reconciler, VerificationReport};

use crate::cache::ExtractionCache;
use crate::config::RuntimeConfig;
use crate::detector::{DetectorError, ImageObjectDetector};
use crate::extractor::{ExtractorError, TextObjectExtractor};
use crate::usage::{LlmUsage, UsageTracker};

/// Errors from the verification pipeline.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("orchestrator not configured: {0}")]
    NotConfigured(String),

    #[error("no objects extracted from caption")]
    NoCaptionObjects,

    #[error("caption extraction failed: {0}")]
    CaptionExtraction(#[source] ExtractorError),

    #[error("no objects detected in image")]
    NoDetections,

    #[error("image detection failed: {0}")]
    Detection(#[source] DetectorError),

    #[error("{stage} stage timed out after {timeout:?}")]
    StageTimeout {
        stage: &'static str,
        timeout: Duration,
    },
}

/// Result of one completed verification.
#[derive(Debug)]
pub struct VerificationRun {
    /// Objects the caption claims are present
    pub caption_objects: ObjectSet,

    /// Objects the detector found
    pub detected_objects: ObjectSet,

    /// The reconciliation report
    pub report: VerificationReport,
}

/// The verification orchestrator sequences extraction, detection, and
/// reconciliation.
pub struct VerificationOrchestrator {
    extractor: Arc<dyn TextObjectExtractor>,
    detector: Arc<dyn ImageObjectDetector>,
    config: RuntimeConfig,
    cache: ExtractionCache,
    usage: UsageTracker,
    reconciler: Reconciler,
}

impl VerificationOrchestrator {
    /// Create a new orchestrator.
    pub fn new(
        extractor: Arc<dyn TextObjectExtractor>,
        detector: Arc<dyn ImageObjectDetector>,
        config: RuntimeConfig,
    ) -> Self {
        let cache = ExtractionCache::new(config.cache.capacity, config.cache.ttl);
        Self {
            extractor,
            detector,
            config,
            cache,
            usage: UsageTracker::new(),
            reconciler: Reconciler::new(),
        }
    }

    /// Verify a caption against an image.
    ///
    /// # Execution Flow
    /// 1. Extract caption objects (cache consulted first)
    /// 2. Detect image objects - only after extraction succeeded
    /// 3. Reconcile (deterministic, no IO)
    pub async fn verify(
        &self,
        image: &ImageRef,
        caption: &Caption,
    ) -> Result<VerificationRun, PipelineError> {
        let caption_objects = self.extract_caption_objects(caption).await?;
        tracing::info!(objects = %caption_objects, "caption objects extracted");

        let detected_objects = self.detect_image_objects(image).await?;
        tracing::info!(objects = %detected_objects, "image objects detected");

        let report = self
            .reconciler
            .reconcile(&caption_objects, &detected_objects);

        Ok(VerificationRun {
            caption_objects,
            detected_objects,
            report,
        })
    }

    /// Run the text stage with timeout, cache, and the empty-set guard.
    async fn extract_caption_objects(
        &self,
        caption: &Caption,
    ) -> Result<ObjectSet, PipelineError> {
        if let Some(cached) = self.cache.get(caption).await {
            tracing::debug!("caption extraction served from cache");
            return Ok(cached);
        }

        let timeout = self.config.extractor.timeout;
        let extraction =
            match tokio::time::timeout(timeout, self.extractor.extract(caption)).await {
                Ok(Ok(extraction)) => extraction,
                Ok(Err(ExtractorError::Empty)) => {
                    tracing::warn!(
                        extractor = self.extractor.name(),
                        "no objects extracted from caption"
                    );
                    return Err(PipelineError::NoCaptionObjects);
                }
                Ok(Err(e)) => {
                    tracing::warn!(
                        extractor = self.extractor.name(),
                        error = %e,
                        "caption extraction failed"
                    );
                    return Err(PipelineError::CaptionExtraction(e));
                }
                Err(_) => {
                    tracing::warn!(
                        extractor = self.extractor.name(),
                        ?timeout,
                        "caption extraction timed out"
                    );
                    return Err(PipelineError::StageTimeout {
                        stage: "extraction",
                        timeout,
                    });
                }
            };

        self.usage.record(&extraction.usage);

        if extraction.objects.is_empty() {
            return Err(PipelineError::NoCaptionObjects);
        }

        self.cache
            .insert(caption, extraction.objects.clone())
            .await;

        Ok(extraction.objects)
    }

    /// Run the image stage with timeout and the no-detections guard.
    async fn detect_image_objects(&self, image: &ImageRef) -> Result<ObjectSet, PipelineError> {
        let timeout = self.config.detector.timeout;
        let detected = match tokio::time::timeout(timeout, self.detector.detect(image)).await {
            Ok(Ok(detected)) => detected,
            Ok(Err(e)) => {
                tracing::warn!(
                    detector = self.detector.name(),
                    error = %e,
                    "image detection failed"
                );
                return Err(PipelineError::Detection(e));
            }
            Err(_) => {
                tracing::warn!(
                    detector = self.detector.name(),
                    ?timeout,
                    "image detection timed out"
                );
                return Err(PipelineError::StageTimeout {
                    stage: "detection",
                    timeout,
                });
            }
        };

        if detected.is_empty() {
            tracing::warn!(detector = self.detector.name(), "no objects detected in image");
            return Err(PipelineError::NoDetections);
        }

        Ok(detected)
    }

    /// Get accumulated LLM usage.
    pub fn usage(&self) -> LlmUsage {
        self.usage.snapshot()
    }

    /// Number of cached caption extractions.
    pub fn cached_extractions(&self) -> u64 {
        self.cache.entry_count()
    }
}

/// Builder for [`VerificationOrchestrator`].
pub struct VerificationOrchestratorBuilder {
    extractor: Option<Arc<dyn TextObjectExtractor>>,
    detector: Option<Arc<dyn ImageObjectDetector>>,
    config: RuntimeConfig,
}

impl VerificationOrchestratorBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self {
            extractor: None,
            detector: None,
            config: RuntimeConfig::default(),
        }
    }

    /// Set the caption object extractor.
    pub fn extractor(mut self, extractor: Arc<dyn TextObjectExtractor>) -> Self {
        self.extractor = Some(extractor);
        self
    }

    /// Set the image object detector.
    pub fn detector(mut self, detector: Arc<dyn ImageObjectDetector>) -> Self {
        self.detector = Some(detector);
        self
    }

    /// Set the configuration.
    pub fn config(mut self, config: RuntimeConfig) -> Self {
        self.config = config;
        self
    }

    /// Build the orchestrator.
    pub fn build(self) -> Result<VerificationOrchestrator, PipelineError> {
        let extractor = self
            .extractor
            .ok_or_else(|| PipelineError::NotConfigured("no extractor set".to_string()))?;
        let detector = self
            .detector
            .ok_or_else(|| PipelineError::NotConfigured("no detector set".to_string()))?;

        Ok(VerificationOrchestrator::new(
            extractor,
            detector,
            self.config,
        ))
    }
}

impl Default for VerificationOrchestratorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::{Extraction, TokenUsage};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct MockExtractor {
        objects: Vec<&'static str>,
        fail_empty: bool,
        delay: Option<Duration>,
        calls: AtomicUsize,
    }

    impl MockExtractor {
        fn returning(objects: &[&'static str]) -> Self {
            Self {
                objects: objects.to_vec(),
                fail_empty: false,
                delay: None,
                calls: AtomicUsize::new(0),
            }
        }

        fn empty() -> Self {
            Self {
                objects: Vec::new(),
                fail_empty: true,
                delay: None,
                calls: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl TextObjectExtractor for MockExtractor {
        async fn extract(&self, _caption: &Caption) -> Result<Extraction, ExtractorError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if self.fail_empty {
                return Err(ExtractorError::Empty);
            }
            Ok(Extraction {
                objects: self.objects.iter().copied().collect(),
                usage: TokenUsage {
                    prompt_tokens: 80,
                    completion_tokens: 8,
                },
            })
        }

        fn name(&self) -> &str {
            "mock-extractor"
        }
    }

    struct MockDetector {
        objects: Vec<&'static str>,
        calls: AtomicUsize,
    }

    impl MockDetector {
        fn returning(objects: &[&'static str]) -> Self {
            Self {
                objects: objects.to_vec(),
                calls: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ImageObjectDetector for MockDetector {
        async fn detect(&self, _image: &ImageRef) -> Result<ObjectSet, DetectorError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.objects.iter().copied().collect())
        }

        fn name(&self) -> &str {
            "mock-detector"
        }
    }

    fn orchestrator(
        extractor: Arc<MockExtractor>,
        detector: Arc<MockDetector>,
    ) -> VerificationOrchestrator {
        VerificationOrchestratorBuilder::new()
            .extractor(extractor)
            .detector(detector)
            .build()
            .unwrap()
    }

    fn caption(text: &str) -> Caption {
        Caption::new(text).unwrap()
    }

    fn image() -> ImageRef {
        ImageRef::from_path("assets/dogs.jpg")
    }

    #[tokio::test]
    async fn partial_overlap_splits_verified_and_hallucinated() {
        let extractor = Arc::new(MockExtractor::returning(&["cat", "dog", "couch"]));
        let detector = Arc::new(MockDetector::returning(&["dog", "couch", "table"]));
        let orchestrator = orchestrator(extractor, detector);

        let run = orchestrator
            .verify(&image(), &caption("a cat and a dog on a couch"))
            .await
            .unwrap();

        let verified: ObjectSet = ["dog", "couch"].into_iter().collect();
        let hallucinated: ObjectSet = ["cat"].into_iter().collect();
        assert_eq!(*run.report.verified(), verified);
        assert_eq!(*run.report.hallucinated(), hallucinated);
    }

    #[tokio::test]
    async fn empty_extraction_short_circuits_before_detection() {
        let extractor = Arc::new(MockExtractor::empty());
        let detector = Arc::new(MockDetector::returning(&["dog"]));
        let orchestrator = orchestrator(Arc::clone(&extractor), Arc::clone(&detector));

        let result = orchestrator.verify(&image(), &caption("word salad")).await;

        assert!(matches!(result, Err(PipelineError::NoCaptionObjects)));
        assert_eq!(extractor.calls(), 1);
        assert_eq!(detector.calls(), 0, "detector must not run after a failed extraction");
    }

    #[tokio::test]
    async fn empty_detection_halts_before_reconciliation() {
        let extractor = Arc::new(MockExtractor::returning(&["dog"]));
        let detector = Arc::new(MockDetector::returning(&[]));
        let orchestrator = orchestrator(extractor, Arc::clone(&detector));

        let result = orchestrator.verify(&image(), &caption("a dog")).await;

        assert!(matches!(result, Err(PipelineError::NoDetections)));
        assert_eq!(detector.calls(), 1);
    }

    #[tokio::test]
    async fn repeated_captions_hit_the_cache() {
        let extractor = Arc::new(MockExtractor::returning(&["dog"]));
        let detector = Arc::new(MockDetector::returning(&["dog"]));
        let orchestrator = orchestrator(Arc::clone(&extractor), detector);

        let text = caption("a dog in the park");
        orchestrator.verify(&image(), &text).await.unwrap();
        orchestrator.verify(&image(), &text).await.unwrap();

        assert_eq!(extractor.calls(), 1);
        assert_eq!(orchestrator.cached_extractions(), 1);
    }

    #[tokio::test]
    async fn usage_is_recorded_per_live_extraction() {
        let extractor = Arc::new(MockExtractor::returning(&["dog"]));
        let detector = Arc::new(MockDetector::returning(&["dog"]));
        let orchestrator = orchestrator(extractor, detector);

        orchestrator.verify(&image(), &caption("a dog")).await.unwrap();

        let usage = orchestrator.usage();
        assert_eq!(usage.llm_calls, 1);
        assert_eq!(usage.total_tokens, 88);
    }

    #[tokio::test]
    async fn slow_extraction_times_out() {
        let mut slow = MockExtractor::returning(&["dog"]);
        slow.delay = Some(Duration::from_millis(200));

        let mut config = RuntimeConfig::default();
        config.extractor.timeout = Duration::from_millis(10);

        let orchestrator = VerificationOrchestratorBuilder::new()
            .extractor(Arc::new(slow))
            .detector(Arc::new(MockDetector::returning(&["dog"])))
            .config(config)
            .build()
            .unwrap();

        let result = orchestrator.verify(&image(), &caption("a dog")).await;
        assert!(matches!(
            result,
            Err(PipelineError::StageTimeout { stage: "extraction", .. })
        ));
    }

    #[test]
    fn builder_requires_both_stages() {
        let result = VerificationOrchestratorBuilder::new().build();
        assert!(matches!(result, Err(PipelineError::NotConfigured(_))));
    }
}
