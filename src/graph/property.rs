//! Property value types for graph nodes and edges
//!
//! Values are either scalars or set-ordered homogeneous arrays of
//! scalars. Merging follows set semantics: re-adding an existing value
//! is a no-op, a new distinct value promotes a scalar to a two-element
//! array, and first-seen order is preserved.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// English stop words excluded from storage and indexing, matching the
/// classic Lucene set.
const STOP_WORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "but", "by", "for", "if", "in", "into", "is", "it",
    "no", "not", "of", "on", "or", "such", "that", "the", "their", "then", "there", "these",
    "they", "this", "to", "was", "will", "with",
];

/// Property value supporting scalar and array types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PropertyValue {
    String(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Array(Vec<PropertyValue>),
}

impl PropertyValue {
    /// Get string value if this is a string
    pub fn as_string(&self) -> Option<&str> {
        match self {
            PropertyValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Get integer value if this is an integer
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            PropertyValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Get float value if this is a float
    pub fn as_float(&self) -> Option<f64> {
        match self {
            PropertyValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Get boolean value if this is a boolean
    pub fn as_boolean(&self) -> Option<bool> {
        match self {
            PropertyValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Get array value if this is an array
    pub fn as_array(&self) -> Option<&Vec<PropertyValue>> {
        match self {
            PropertyValue::Array(arr) => Some(arr),
            _ => None,
        }
    }

    /// Whether the value must not be stored or indexed: pure-whitespace
    /// strings and English stop words.
    pub fn is_ignorable(&self) -> bool {
        match self {
            PropertyValue::String(s) => {
                let trimmed = s.trim();
                trimmed.is_empty() || STOP_WORDS.contains(&trimmed.to_lowercase().as_str())
            }
            PropertyValue::Array(arr) => arr.iter().all(|v| v.is_ignorable()),
            _ => false,
        }
    }

    /// Merge `addition` into this value with set semantics.
    ///
    /// Returns the merged value and whether anything changed. A scalar
    /// receiving a distinct scalar becomes a two-element array; arrays
    /// append unseen values at the end.
    pub fn merge(self, addition: PropertyValue) -> (PropertyValue, bool) {
        match self {
            PropertyValue::Array(mut values) => {
                if values.contains(&addition) {
                    (PropertyValue::Array(values), false)
                } else {
                    values.push(addition);
                    (PropertyValue::Array(values), true)
                }
            }
            scalar => {
                if scalar == addition {
                    (scalar, false)
                } else {
                    (PropertyValue::Array(vec![scalar, addition]), true)
                }
            }
        }
    }

    /// Type name for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            PropertyValue::String(_) => "String",
            PropertyValue::Integer(_) => "Integer",
            PropertyValue::Float(_) => "Float",
            PropertyValue::Boolean(_) => "Boolean",
            PropertyValue::Array(_) => "Array",
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::String(s) => write!(f, "\"{}\"", s),
            PropertyValue::Integer(i) => write!(f, "{}", i),
            PropertyValue::Float(fl) => write!(f, "{}", fl),
            PropertyValue::Boolean(b) => write!(f, "{}", b),
            PropertyValue::Array(arr) => {
                write!(f, "[")?;
                for (i, val) in arr.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", val)?;
                }
                write!(f, "]")
            }
        }
    }
}

// Convenience conversions
impl From<String> for PropertyValue {
    fn from(s: String) -> Self {
        PropertyValue::String(s)
    }
}

impl From<&str> for PropertyValue {
    fn from(s: &str) -> Self {
        PropertyValue::String(s.to_string())
    }
}

impl From<i64> for PropertyValue {
    fn from(i: i64) -> Self {
        PropertyValue::Integer(i)
    }
}

impl From<i32> for PropertyValue {
    fn from(i: i32) -> Self {
        PropertyValue::Integer(i as i64)
    }
}

impl From<f64> for PropertyValue {
    fn from(f: f64) -> Self {
        PropertyValue::Float(f)
    }
}

impl From<bool> for PropertyValue {
    fn from(b: bool) -> Self {
        PropertyValue::Boolean(b)
    }
}

impl From<Vec<PropertyValue>> for PropertyValue {
    fn from(arr: Vec<PropertyValue>) -> Self {
        PropertyValue::Array(arr)
    }
}

/// Property map for storing node and edge properties
pub type PropertyMap = HashMap<String, PropertyValue>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_same_scalar_is_noop() {
        let v = PropertyValue::from("x");
        let (merged, changed) = v.merge("x".into());
        assert!(!changed);
        assert_eq!(merged, PropertyValue::from("x"));
    }

    #[test]
    fn test_merge_promotes_to_array() {
        let v = PropertyValue::from("x");
        let (merged, changed) = v.merge("y".into());
        assert!(changed);
        assert_eq!(
            merged,
            PropertyValue::Array(vec!["x".into(), "y".into()])
        );
    }

    #[test]
    fn test_merge_preserves_first_seen_order() {
        let v = PropertyValue::from("x");
        let (v, _) = v.merge("y".into());
        let (v, changed) = v.merge("x".into());
        assert!(!changed);
        assert_eq!(v, PropertyValue::Array(vec!["x".into(), "y".into()]));
    }

    #[test]
    fn test_ignorable_values() {
        assert!(PropertyValue::from(" ").is_ignorable());
        assert!(PropertyValue::from("").is_ignorable());
        assert!(PropertyValue::from("the").is_ignorable());
        assert!(PropertyValue::from("The").is_ignorable());
        assert!(!PropertyValue::from("thesaurus").is_ignorable());
        assert!(!PropertyValue::Integer(0).is_ignorable());
    }

    #[test]
    fn test_conversions() {
        let s: PropertyValue = "hello".into();
        assert_eq!(s.as_string(), Some("hello"));

        let i: PropertyValue = 42i64.into();
        assert_eq!(i.as_integer(), Some(42));

        let b: PropertyValue = true.into();
        assert_eq!(b.as_boolean(), Some(true));
    }
}
