//! Reconciliation: classifies caption objects against detected objects.
//!
//! The reconciler applies strict, non-configurable set rules:
//! 1. verified     = caption objects ∩ detected objects
//! 2. hallucinated = caption objects \ detected objects
//! 3. detected-but-unmentioned objects are reported nowhere
//!
//! Matching is exact normalized-string equality only. "puppy" in the
//! caption does not match a detected "dog"; flagging it is the intended
//! behavior, not a defect to patch with fuzzy matching.

use crate::types::{ObjectSet, VerificationReport};

/// The reconciliation engine.
///
/// A pure function over two read-only sets. Total for all inputs, no side
/// effects, same inputs always produce the same classification.
pub struct Reconciler;

impl Reconciler {
    pub fn new() -> Self {
        Self
    }

    /// Classify each caption object as verified or hallucinated.
    pub fn reconcile(
        &self,
        caption_objects: &ObjectSet,
        detected_objects: &ObjectSet,
    ) -> VerificationReport {
        let verified = caption_objects.intersection(detected_objects);
        let hallucinated = caption_objects.difference(detected_objects);
        tracing::debug!(
            verified = verified.len(),
            hallucinated = hallucinated.len(),
            "reconciled caption against detections"
        );
        VerificationReport::new(verified, hallucinated)
    }
}

impl Default for Reconciler {
    fn default() -> Self {
        Self::new()
    }
}

/// Convenience free function over [`Reconciler`].
pub fn reconcile(caption_objects: &ObjectSet, detected_objects: &ObjectSet) -> VerificationReport {
    Reconciler::new().reconcile(caption_objects, detected_objects)
}
