//! Image-side object detection.
//!
//! This module defines the trait for image object detectors and the ONNX
//! Runtime implementation for YOLOv8-family models.
//!
//! A detector reduces an image to the *distinct class identities* it
//! contains: bounding boxes, confidence scores, and instance counts are
//! discarded at this boundary. Zero detections is a valid detector output
//! (an empty frame is not an error); the orchestrator's guard decides what
//! an empty set means for the pipeline.

use async_trait::async_trait;
use mirage_core::{ImageRef, ObjectSet};
use thiserror::Error;

pub mod vocab;
mod yolo;

pub use yolo::YoloDetector;

/// Errors from image object detectors.
#[derive(Error, Debug)]
pub enum DetectorError {
    #[error("failed to load detection model: {0}")]
    ModelLoad(String),

    #[error("failed to read image: {0}")]
    ImageRead(#[from] std::io::Error),

    #[error("failed to decode image: {0}")]
    ImageDecode(String),

    #[error("inference failed: {0}")]
    Inference(String),

    #[error("failed to decode model output: {0}")]
    PostProcess(String),
}

/// Detector abstraction allows swapping vision backends.
///
/// Implementations load their model once at construction (the expensive,
/// cacheable step) and are read-only afterwards, so a single instance can
/// be shared across verification requests.
#[async_trait]
pub trait ImageObjectDetector: Send + Sync {
    /// Detect the distinct object classes present in an image.
    async fn detect(&self, image: &ImageRef) -> Result<ObjectSet, DetectorError>;

    /// Get detector name for logs.
    fn name(&self) -> &str;
}
