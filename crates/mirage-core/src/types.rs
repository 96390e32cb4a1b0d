//! Domain types for caption verification.
//!
//! Every comparison in Mirage happens over [`ObjectName`] values, which are
//! normalized (trimmed, lowercased) at construction. Equality is therefore
//! case- and whitespace-insensitive by construction, and no call site needs
//! to remember to normalize before comparing.

use std::collections::btree_set;
use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from caption construction.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CaptionError {
    #[error("caption must not be empty")]
    Empty,
}

/// A natural-language caption under verification.
///
/// Immutable after construction. The only structural constraint is
/// non-emptiness: an empty caption has nothing to verify.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Caption(String);

impl Caption {
    /// Create a caption, rejecting empty or whitespace-only input.
    pub fn new(text: impl Into<String>) -> Result<Self, CaptionError> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(CaptionError::Empty);
        }
        Ok(Self(text))
    }

    /// The caption text as given (not normalized).
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Caption {
    type Error = CaptionError;

    fn try_from(text: String) -> Result<Self, Self::Error> {
        Self::new(text)
    }
}

impl From<Caption> for String {
    fn from(caption: Caption) -> Self {
        caption.0
    }
}

impl fmt::Display for Caption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A normalized token naming a physical object class.
///
/// Normalization = trim + ASCII-independent lowercase, applied once at
/// construction. Two `ObjectName`s are the same object class iff their
/// normalized forms are equal. No stemming, no synonym resolution:
/// "puppy" and "dog" are different classes on purpose.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct ObjectName(String);

impl ObjectName {
    /// Create a normalized object name.
    pub fn new(raw: impl AsRef<str>) -> Self {
        Self(raw.as_ref().trim().to_lowercase())
    }

    /// The normalized form.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for ObjectName {
    fn from(raw: String) -> Self {
        Self::new(raw)
    }
}

impl From<&str> for ObjectName {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl From<ObjectName> for String {
    fn from(name: ObjectName) -> Self {
        name.0
    }
}

impl fmt::Display for ObjectName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A set of object names with uniqueness enforced and deterministic
/// (sorted) iteration order.
///
/// Produced independently by each extraction stage; reconciliation only
/// reads. BTreeSet rather than HashSet so that reports, logs, and tests
/// see a stable ordering.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectSet(BTreeSet<ObjectName>);

impl ObjectSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a name, returning whether it was newly added.
    pub fn insert(&mut self, name: ObjectName) -> bool {
        self.0.insert(name)
    }

    /// Whether the set contains the given name.
    pub fn contains(&self, name: &ObjectName) -> bool {
        self.0.contains(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate names in sorted order.
    pub fn iter(&self) -> btree_set::Iter<'_, ObjectName> {
        self.0.iter()
    }

    /// Names present in both sets.
    pub fn intersection(&self, other: &ObjectSet) -> ObjectSet {
        ObjectSet(self.0.intersection(&other.0).cloned().collect())
    }

    /// Names present in `self` but not in `other`.
    pub fn difference(&self, other: &ObjectSet) -> ObjectSet {
        ObjectSet(self.0.difference(&other.0).cloned().collect())
    }
}

impl FromIterator<ObjectName> for ObjectSet {
    fn from_iter<I: IntoIterator<Item = ObjectName>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> FromIterator<&'a str> for ObjectSet {
    fn from_iter<I: IntoIterator<Item = &'a str>>(iter: I) -> Self {
        iter.into_iter().map(ObjectName::new).collect()
    }
}

impl FromIterator<String> for ObjectSet {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        iter.into_iter().map(ObjectName::new).collect()
    }
}

impl<'a> IntoIterator for &'a ObjectSet {
    type Item = &'a ObjectName;
    type IntoIter = btree_set::Iter<'a, ObjectName>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl fmt::Display for ObjectSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, name) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{name}")?;
        }
        write!(f, "]")
    }
}

/// Reference to the image under verification.
///
/// The detection adapter accepts either a path on disk or an in-memory
/// encoded image buffer.
#[derive(Debug, Clone)]
pub enum ImageRef {
    /// Path to an encoded image file.
    Path(PathBuf),
    /// Encoded image bytes (PNG, JPEG, ...).
    Bytes(Vec<u8>),
}

impl ImageRef {
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Self::Path(path.into())
    }

    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self::Bytes(bytes.into())
    }

    /// The on-disk path, if this reference is a path.
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Path(p) => Some(p),
            Self::Bytes(_) => None,
        }
    }
}

impl fmt::Display for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Path(p) => write!(f, "{}", p.display()),
            Self::Bytes(b) => write!(f, "<{} bytes>", b.len()),
        }
    }
}

/// The result of one reconciliation: which caption objects the detector
/// supports, and which it does not.
///
/// Created by [`crate::reconcile`], consumed for presentation, then
/// discarded. Never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct VerificationReport {
    verified: ObjectSet,
    hallucinated: ObjectSet,
    evaluated_at: DateTime<Utc>,
}

impl VerificationReport {
    /// Assemble a report, stamping the evaluation time.
    pub fn new(verified: ObjectSet, hallucinated: ObjectSet) -> Self {
        Self {
            verified,
            hallucinated,
            evaluated_at: Utc::now(),
        }
    }

    /// Caption objects confirmed by the detector.
    pub fn verified(&self) -> &ObjectSet {
        &self.verified
    }

    /// Caption objects with no detection support.
    pub fn hallucinated(&self) -> &ObjectSet {
        &self.hallucinated
    }

    /// When this report was produced.
    pub fn evaluated_at(&self) -> DateTime<Utc> {
        self.evaluated_at
    }

    /// True when the caption contains no unsupported objects.
    pub fn is_clean(&self) -> bool {
        self.hallucinated.is_empty()
    }
}
