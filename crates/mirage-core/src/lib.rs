//! # mirage-core
//!
//! Deterministic caption/detection reconciliation engine.
//!
//! This crate provides the core logic for Mirage, answering:
//! - Which objects does this caption claim are in the image?
//! - Which of those claims does the detector actually support?
//! - Which claims are hallucinations?
//!
//! ## Key Guarantees
//!
//! 1. **Deterministic**: Same input always produces same output
//! 2. **No IO**: All extraction adapters live in `mirage-runtime`;
//!    this crate never touches the network or a model file
//! 3. **Read-only inputs**: Reconciliation only reads its object sets,
//!    it never mutates them
//!
//! ## Example
//!
//! ```rust
//! use mirage_core::{reconcile, ObjectName, ObjectSet};
//!
//! let caption: ObjectSet = ["cat", "dog", "couch"].into_iter().collect();
//! let detected: ObjectSet = ["dog", "couch", "table"].into_iter().collect();
//!
//! let report = reconcile(&caption, &detected);
//! assert!(report.verified().contains(&ObjectName::new("dog")));
//! assert!(report.hallucinated().contains(&ObjectName::new("cat")));
//! ```

pub mod payload;
pub mod reconcile;
pub mod types;

// Re-export main types at crate root
pub use payload::{ParsedList, PayloadError, PayloadShape};
pub use reconcile::{reconcile, Reconciler};
pub use types::{Caption, CaptionError, ImageRef, ObjectName, ObjectSet, VerificationReport};
