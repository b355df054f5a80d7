//! Per-field search index backing the mirror
//!
//! One `FieldIndex` per mirrored property name: a tokenized postings map
//! plus an optional exact-match shadow map. Postings are replaced, not
//! appended, when a node's property is rewritten.

use crate::graph::{NodeId, PropertyValue};
use std::collections::{BTreeMap, HashMap, HashSet};

/// Lowercase alphanumeric tokens of a string value
pub fn tokenize(value: &str) -> Vec<String> {
    value
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
        .collect()
}

/// String representations of a property value's scalars
pub fn scalar_strings(value: &PropertyValue) -> Vec<String> {
    match value {
        PropertyValue::String(s) => vec![s.clone()],
        PropertyValue::Integer(i) => vec![i.to_string()],
        PropertyValue::Float(f) => vec![f.to_string()],
        PropertyValue::Boolean(b) => vec![b.to_string()],
        PropertyValue::Array(values) => values.iter().flat_map(scalar_strings).collect(),
    }
}

/// Index for a single mirrored property
#[derive(Debug, Default)]
pub struct FieldIndex {
    /// Token -> node postings
    terms: BTreeMap<String, HashSet<NodeId>>,

    /// Exact value -> node postings (shadow field)
    exact: BTreeMap<String, HashSet<NodeId>>,

    /// Current postings per node, so a rewrite can retract stale entries
    current: HashMap<NodeId, (Vec<String>, Vec<String>)>,
}

impl FieldIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace a node's postings for this field
    pub fn refresh(&mut self, node: NodeId, value: &PropertyValue, with_exact: bool) {
        self.retract(node);

        let strings = scalar_strings(value);
        let mut tokens: Vec<String> = strings.iter().flat_map(|s| tokenize(s)).collect();
        tokens.sort();
        tokens.dedup();

        for token in &tokens {
            self.terms.entry(token.clone()).or_default().insert(node);
        }

        let mut exacts = Vec::new();
        if with_exact {
            for s in &strings {
                self.exact.entry(s.clone()).or_default().insert(node);
            }
            exacts = strings;
        }

        self.current.insert(node, (tokens, exacts));
    }

    /// Remove a node's postings for this field
    pub fn retract(&mut self, node: NodeId) {
        if let Some((tokens, exacts)) = self.current.remove(&node) {
            for token in tokens {
                if let Some(nodes) = self.terms.get_mut(&token) {
                    nodes.remove(&node);
                    if nodes.is_empty() {
                        self.terms.remove(&token);
                    }
                }
            }
            for value in exacts {
                if let Some(nodes) = self.exact.get_mut(&value) {
                    nodes.remove(&node);
                    if nodes.is_empty() {
                        self.exact.remove(&value);
                    }
                }
            }
        }
    }

    /// Nodes whose value contains the token
    pub fn search(&self, token: &str) -> Vec<NodeId> {
        self.terms
            .get(&token.to_lowercase())
            .map(|nodes| nodes.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Nodes whose value matches exactly
    pub fn search_exact(&self, value: &str) -> Vec<NodeId> {
        self.exact
            .get(value)
            .map(|nodes| nodes.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Number of indexed nodes
    pub fn len(&self) -> usize {
        self.current.len()
    }

    pub fn is_empty(&self) -> bool {
        self.current.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_refresh_and_search() {
        let mut field = FieldIndex::new();
        let n = NodeId::new(1);
        field.refresh(n, &PropertyValue::from("Malignant Hyperthermia"), true);

        assert_eq!(field.search("malignant"), vec![n]);
        assert_eq!(field.search("Hyperthermia"), vec![n]);
        assert_eq!(field.search_exact("Malignant Hyperthermia"), vec![n]);
        assert!(field.search_exact("malignant hyperthermia").is_empty());
    }

    #[test]
    fn test_rewrite_retracts_stale_postings() {
        let mut field = FieldIndex::new();
        let n = NodeId::new(1);
        field.refresh(n, &PropertyValue::from("old name"), false);
        field.refresh(n, &PropertyValue::from("new name"), false);

        assert!(field.search("old").is_empty());
        assert_eq!(field.search("new"), vec![n]);
        // shared token survives the rewrite
        assert_eq!(field.search("name"), vec![n]);
    }

    #[test]
    fn test_array_values_all_indexed() {
        let mut field = FieldIndex::new();
        let n = NodeId::new(2);
        let value = PropertyValue::Array(vec!["alpha".into(), "beta".into()]);
        field.refresh(n, &value, true);

        assert_eq!(field.search("alpha"), vec![n]);
        assert_eq!(field.search_exact("beta"), vec![n]);
    }
}
