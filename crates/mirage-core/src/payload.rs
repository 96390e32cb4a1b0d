//! Extraction payload parsing.
//!
//! The text-understanding service is instructed to respond with a JSON list
//! of object-noun strings, but JSON-mode endpoints frequently wrap the list
//! in a single-key object (`{"objects": [...]}`) instead. The parse result
//! is an explicit tagged variant so callers handle each accepted shape
//! deliberately rather than probing values at runtime:
//!
//! - top-level list       -> [`PayloadShape::FlatList`]
//! - object holding a list -> [`PayloadShape::Wrapped`]
//! - anything else         -> [`PayloadError::NoListFound`]

use serde_json::Value;
use thiserror::Error;

use crate::types::{ObjectName, ObjectSet};

/// Errors from payload parsing.
#[derive(Error, Debug)]
pub enum PayloadError {
    #[error("response is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("response contains no list of object names")]
    NoListFound,
}

/// Which accepted shape the service response arrived in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadShape {
    /// The top-level JSON value was the list itself.
    FlatList,
    /// The list was found inside a top-level object's values.
    Wrapped,
}

/// A successfully parsed object-name list.
#[derive(Debug, Clone)]
pub struct ParsedList {
    /// The shape the response arrived in, for diagnostics.
    pub shape: PayloadShape,
    /// Extracted names, normalized, order preserved, duplicates kept.
    pub names: Vec<ObjectName>,
}

impl ParsedList {
    /// Collapse the parsed names into a set.
    pub fn into_set(self) -> ObjectSet {
        self.names.into_iter().collect()
    }
}

/// Parse a raw service response into an object-name list.
///
/// Accepts a top-level JSON list, or a top-level object whose values are
/// scanned for the first list (in the object's own key order). List items
/// that are strings are used directly; bare scalars (numbers, bools) are
/// stringified; null and nested containers inside the list are skipped.
pub fn parse_object_list(raw: &str) -> Result<ParsedList, PayloadError> {
    let value: Value = serde_json::from_str(raw)?;

    let (shape, items) = match &value {
        Value::Array(items) => (PayloadShape::FlatList, items),
        Value::Object(map) => {
            let first_list = map.values().find_map(|v| v.as_array());
            match first_list {
                Some(items) => {
                    tracing::debug!("recovered object list from wrapped response");
                    (PayloadShape::Wrapped, items)
                }
                None => return Err(PayloadError::NoListFound),
            }
        }
        _ => return Err(PayloadError::NoListFound),
    };

    let names = items.iter().filter_map(scalar_name).collect();

    Ok(ParsedList { shape, names })
}

/// Coerce a scalar list item into a normalized name.
fn scalar_name(item: &Value) -> Option<ObjectName> {
    match item {
        Value::String(s) => Some(ObjectName::new(s)),
        Value::Number(n) => Some(ObjectName::new(n.to_string())),
        Value::Bool(b) => Some(ObjectName::new(b.to_string())),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_flat_list() {
        let parsed = parse_object_list(r#"["cat", "dog", "couch"]"#).unwrap();
        assert_eq!(parsed.shape, PayloadShape::FlatList);
        assert_eq!(
            parsed.into_set(),
            ["cat", "dog", "couch"].into_iter().collect()
        );
    }

    #[test]
    fn parses_wrapped_list_with_mixed_case() {
        let parsed = parse_object_list(r#"{"objects": ["Cat", "Dog"]}"#).unwrap();
        assert_eq!(parsed.shape, PayloadShape::Wrapped);
        assert_eq!(parsed.into_set(), ["cat", "dog"].into_iter().collect());
    }

    #[test]
    fn wrapped_scan_finds_first_list_value() {
        let raw = r#"{"note": "here you go", "items": ["lamp"], "more": ["ignored"]}"#;
        let parsed = parse_object_list(raw).unwrap();
        assert_eq!(parsed.shape, PayloadShape::Wrapped);
        assert_eq!(parsed.names, vec![ObjectName::new("lamp")]);
    }

    #[test]
    fn object_without_list_is_rejected() {
        let result = parse_object_list(r#"{"objects": "cat, dog"}"#);
        assert!(matches!(result, Err(PayloadError::NoListFound)));
    }

    #[test]
    fn scalar_top_level_is_rejected() {
        assert!(matches!(
            parse_object_list(r#""just a string""#),
            Err(PayloadError::NoListFound)
        ));
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        assert!(matches!(
            parse_object_list("not json at all"),
            Err(PayloadError::Json(_))
        ));
    }

    #[test]
    fn scalars_are_stringified_and_nested_values_skipped() {
        let parsed = parse_object_list(r#"[ "cat", 7, true, null, ["dog"], {"a": 1} ]"#).unwrap();
        assert_eq!(
            parsed.names,
            vec![
                ObjectName::new("cat"),
                ObjectName::new("7"),
                ObjectName::new("true"),
            ]
        );
    }

    #[test]
    fn empty_list_parses_to_empty_set() {
        let parsed = parse_object_list("[]").unwrap();
        assert!(parsed.into_set().is_empty());
    }
}
