//! Search index mirror
//!
//! A best-effort, query-optimized copy of a configured subset of node
//! properties, refreshed by the write layer inside the same write call.
//! A further configured subset of those properties also gets an
//! exact-match shadow field.

pub mod search_index;

pub use search_index::FieldIndex;

use crate::graph::{GraphStore, NodeId, PropertyValue};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

/// Mirror of selected node properties into per-field search indices
#[derive(Debug)]
pub struct IndexMirror {
    /// Property names to mirror
    indexed: HashSet<String>,

    /// Subset of `indexed` that also gets an exact-match shadow field
    exact: HashSet<String>,

    /// Field name -> index
    fields: RwLock<HashMap<String, Arc<RwLock<FieldIndex>>>>,
}

impl IndexMirror {
    pub fn new(indexed: HashSet<String>, exact: HashSet<String>) -> Self {
        IndexMirror {
            indexed,
            exact,
            fields: RwLock::new(HashMap::new()),
        }
    }

    /// Mirror with no configured fields (drops every refresh)
    pub fn disabled() -> Self {
        Self::new(HashSet::new(), HashSet::new())
    }

    /// Whether a property name is mirrored
    pub fn is_indexed(&self, property: &str) -> bool {
        self.indexed.contains(property)
    }

    /// Refresh the mirror entry for one node property. No-op for
    /// unmirrored properties.
    pub fn refresh(&self, node: NodeId, property: &str, value: &PropertyValue) {
        if !self.indexed.contains(property) {
            return;
        }
        let field = self.field(property);
        let with_exact = self.exact.contains(property);
        field.write().unwrap().refresh(node, value, with_exact);
    }

    /// Nodes whose mirrored property contains the token
    pub fn search(&self, property: &str, token: &str) -> Vec<NodeId> {
        match self.existing_field(property) {
            Some(field) => field.read().unwrap().search(token),
            None => Vec::new(),
        }
    }

    /// Nodes whose mirrored property matches the value exactly
    pub fn search_exact(&self, property: &str, value: &str) -> Vec<NodeId> {
        match self.existing_field(property) {
            Some(field) => field.read().unwrap().search_exact(value),
            None => Vec::new(),
        }
    }

    /// Repopulate the mirror from a loaded store (used when a persisted
    /// session is reopened)
    pub fn rebuild(&self, store: &GraphStore) {
        store.for_each_node(|node| {
            for (name, value) in &node.properties {
                self.refresh(node.id, name, value);
            }
        });
    }

    fn field(&self, property: &str) -> Arc<RwLock<FieldIndex>> {
        if let Some(field) = self.existing_field(property) {
            return field;
        }
        let mut fields = self.fields.write().unwrap();
        fields
            .entry(property.to_string())
            .or_insert_with(|| Arc::new(RwLock::new(FieldIndex::new())))
            .clone()
    }

    fn existing_field(&self, property: &str) -> Option<Arc<RwLock<FieldIndex>>> {
        self.fields.read().unwrap().get(property).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mirror() -> IndexMirror {
        let indexed: HashSet<String> = ["label".to_string(), "synonym".to_string()].into();
        let exact: HashSet<String> = ["label".to_string()].into();
        IndexMirror::new(indexed, exact)
    }

    #[test]
    fn test_unconfigured_property_not_mirrored() {
        let mirror = mirror();
        mirror.refresh(NodeId::new(1), "comment", &"some comment".into());
        assert!(mirror.search("comment", "some").is_empty());
    }

    #[test]
    fn test_exact_only_for_configured_subset() {
        let mirror = mirror();
        let n = NodeId::new(1);
        mirror.refresh(n, "label", &"Heart attack".into());
        mirror.refresh(n, "synonym", &"Myocardial infarction".into());

        assert_eq!(mirror.search_exact("label", "Heart attack"), vec![n]);
        assert!(mirror
            .search_exact("synonym", "Myocardial infarction")
            .is_empty());
        assert_eq!(mirror.search("synonym", "myocardial"), vec![n]);
    }
}
