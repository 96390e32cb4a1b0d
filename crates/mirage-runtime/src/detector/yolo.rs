//! ONNX Runtime detector implementation for YOLOv8-family models.
//!
//! The session is built once at construction and shared behind an `Arc`;
//! inference runs on the blocking thread pool so a slow model never stalls
//! the async runtime.
//!
//! Postprocessing is deliberately minimal: the pipeline only needs the set
//! of distinct class labels in the image, so each anchor contributes its
//! best class when that score clears the threshold, and no NMS is applied
//! (overlapping boxes of one class collapse into one set element anyway).

use async_trait::async_trait;
use image::imageops::FilterType;
use mirage_core::{ImageRef, ObjectName, ObjectSet};
use ndarray::Array4;
use ort::{session::Session, value::Value};
use parking_lot::Mutex;
use std::sync::Arc;

use super::{vocab, DetectorError, ImageObjectDetector};
use crate::config::DetectorConfig;

/// ONNX-backed object detector.
pub struct YoloDetector {
    inner: Arc<Inner>,
}

struct Inner {
    // ort sessions take &mut self to run; the lock serializes inference
    // over the single shared session.
    session: Mutex<Session>,
    config: DetectorConfig,
}

impl YoloDetector {
    /// Load the detection model and build the inference session.
    ///
    /// This is the expensive step; construct once and share the detector
    /// across requests.
    pub fn new(config: DetectorConfig) -> Result<Self, DetectorError> {
        if !config.model_path.exists() {
            return Err(DetectorError::ModelLoad(format!(
                "detection model not found at {}",
                config.model_path.display()
            )));
        }

        tracing::info!(model = %config.model_path.display(), "loading detection model");

        let session = Session::builder()
            .map_err(|e| DetectorError::ModelLoad(e.to_string()))?
            .with_intra_threads(config.intra_threads)
            .map_err(|e| DetectorError::ModelLoad(e.to_string()))?
            .commit_from_file(&config.model_path)
            .map_err(|e| DetectorError::ModelLoad(e.to_string()))?;

        tracing::info!("detection model loaded");

        Ok(Self {
            inner: Arc::new(Inner {
                session: Mutex::new(session),
                config,
            }),
        })
    }
}

impl Inner {
    /// Decode, preprocess, run inference, and reduce to distinct labels.
    fn infer(&self, bytes: &[u8]) -> Result<ObjectSet, DetectorError> {
        let image = image::load_from_memory(bytes)
            .map_err(|e| DetectorError::ImageDecode(e.to_string()))?;

        let input = self.preprocess(&image)?;
        let input_value =
            Value::from_array(input).map_err(|e| DetectorError::Inference(e.to_string()))?;

        let mut session = self.session.lock();
        let outputs = session
            .run(ort::inputs![input_value])
            .map_err(|e| DetectorError::Inference(e.to_string()))?;

        let (shape, data) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| DetectorError::PostProcess(e.to_string()))?;

        let dims: Vec<usize> = shape.iter().map(|&d| d as usize).collect();
        distinct_labels(&dims, data, self.config.confidence_threshold)
    }

    /// Resize to the model's square input, RGB f32 CHW scaled to [0,1].
    fn preprocess(&self, image: &image::DynamicImage) -> Result<Array4<f32>, DetectorError> {
        let size = self.config.input_size as usize;
        let resized = image.resize_exact(size as u32, size as u32, FilterType::Triangle);
        let rgb = resized.to_rgb8();

        // HWC -> CHW format
        let mut data = Vec::with_capacity(3 * size * size);
        for c in 0..3 {
            for y in 0..size {
                for x in 0..size {
                    let pixel = rgb.get_pixel(x as u32, y as u32);
                    data.push(pixel[c] as f32 / 255.0);
                }
            }
        }

        Array4::from_shape_vec((1, 3, size, size), data)
            .map_err(|e| DetectorError::Inference(format!("failed to shape input tensor: {e}")))
    }
}

/// Reduce a YOLOv8 output tensor `[batch, 4 + classes, anchors]` to the
/// set of distinct class labels whose best anchor score clears the
/// threshold.
fn distinct_labels(dims: &[usize], data: &[f32], threshold: f32) -> Result<ObjectSet, DetectorError> {
    if dims.len() != 3 || dims[1] <= 4 {
        return Err(DetectorError::PostProcess(format!(
            "unexpected output shape {dims:?}"
        )));
    }

    let classes = dims[1] - 4;
    let anchors = dims[2];
    if data.len() < dims[1] * anchors {
        return Err(DetectorError::PostProcess(format!(
            "output tensor too small: {} values for shape {dims:?}",
            data.len()
        )));
    }

    let mut labels = ObjectSet::new();
    for anchor in 0..anchors {
        let mut best_class = 0;
        let mut best_score = f32::MIN;
        for class in 0..classes {
            let score = data[(4 + class) * anchors + anchor];
            if score > best_score {
                best_score = score;
                best_class = class;
            }
        }

        if best_score >= threshold {
            if let Some(name) = vocab::class_name(best_class) {
                labels.insert(ObjectName::new(name));
            }
        }
    }

    Ok(labels)
}

#[async_trait]
impl ImageObjectDetector for YoloDetector {
    async fn detect(&self, image: &ImageRef) -> Result<ObjectSet, DetectorError> {
        let bytes = match image {
            ImageRef::Path(path) => tokio::fs::read(path).await?,
            ImageRef::Bytes(bytes) => bytes.clone(),
        };

        let inner = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || inner.infer(&bytes))
            .await
            .map_err(|e| DetectorError::Inference(format!("inference task failed: {e}")))?
    }

    fn name(&self) -> &str {
        "yolo-onnx"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    /// Build a `[1, 4 + classes, anchors]` tensor with all scores at
    /// `background`, then apply (anchor, class, score) overrides.
    fn tensor(
        classes: usize,
        anchors: usize,
        background: f32,
        scores: &[(usize, usize, f32)],
    ) -> (Vec<usize>, Vec<f32>) {
        let dims = vec![1, 4 + classes, anchors];
        let mut data = vec![background; (4 + classes) * anchors];
        for &(anchor, class, score) in scores {
            data[(4 + class) * anchors + anchor] = score;
        }
        (dims, data)
    }

    #[test]
    fn confident_anchors_contribute_their_class() {
        // class 0 = person, class 1 = bicycle
        let (dims, data) = tensor(2, 3, 0.01, &[(0, 0, 0.9), (1, 1, 0.5)]);
        let labels = distinct_labels(&dims, &data, 0.25).unwrap();
        let expected: ObjectSet = ["person", "bicycle"].into_iter().collect();
        assert_eq!(labels, expected);
    }

    #[test]
    fn duplicate_detections_collapse_to_one_label() {
        let (dims, data) = tensor(2, 4, 0.01, &[(0, 0, 0.9), (1, 0, 0.8), (2, 0, 0.3)]);
        let labels = distinct_labels(&dims, &data, 0.25).unwrap();
        let expected: ObjectSet = ["person"].into_iter().collect();
        assert_eq!(labels, expected);
    }

    #[test]
    fn empty_frame_yields_empty_set_not_error() {
        let (dims, data) = tensor(2, 8, 0.01, &[]);
        let labels = distinct_labels(&dims, &data, 0.25).unwrap();
        assert!(labels.is_empty());
    }

    #[test]
    fn class_ids_outside_vocabulary_are_skipped() {
        // 81 classes: id 80 has no COCO name
        let (dims, data) = tensor(81, 2, 0.01, &[(0, 80, 0.9), (1, 16, 0.9)]);
        let labels = distinct_labels(&dims, &data, 0.25).unwrap();
        let expected: ObjectSet = ["dog"].into_iter().collect();
        assert_eq!(labels, expected);
    }

    #[test]
    fn malformed_shape_is_a_postprocess_error() {
        assert!(matches!(
            distinct_labels(&[1, 84], &[0.0; 84], 0.25),
            Err(DetectorError::PostProcess(_))
        ));
        assert!(matches!(
            distinct_labels(&[1, 3, 10], &[0.0; 30], 0.25),
            Err(DetectorError::PostProcess(_))
        ));
    }

    #[test]
    fn truncated_tensor_is_a_postprocess_error() {
        assert!(matches!(
            distinct_labels(&[1, 6, 100], &[0.0; 10], 0.25),
            Err(DetectorError::PostProcess(_))
        ));
    }

    proptest! {
        #[test]
        fn below_threshold_scores_never_detect(
            data in proptest::collection::vec(0.0f32..0.2, 6 * 4)
        ) {
            let labels = distinct_labels(&[1, 6, 4], &data, 0.25).unwrap();
            prop_assert!(labels.is_empty());
        }
    }
}
