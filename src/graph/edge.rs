//! Edge implementation for the property graph

use super::property::{PropertyMap, PropertyValue};
use super::types::{EdgeId, Label, NodeId, RelType};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A directed edge in the property graph
///
/// `(start, end, rel_type)` is the identity of an edge: the store never
/// holds two edges with the same triple.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Edge {
    /// Unique identifier for this edge
    pub id: EdgeId,

    /// Start node
    pub start: NodeId,

    /// End node
    pub end: NodeId,

    /// Relationship type
    pub rel_type: RelType,

    /// Set of labels
    pub labels: HashSet<Label>,

    /// Properties associated with this edge
    pub properties: PropertyMap,
}

impl Edge {
    /// Create a new edge
    pub fn new(id: EdgeId, start: NodeId, end: NodeId, rel_type: impl Into<RelType>) -> Self {
        Edge {
            id,
            start,
            end,
            rel_type: rel_type.into(),
            labels: HashSet::new(),
            properties: PropertyMap::new(),
        }
    }

    /// Add a label to this edge
    pub fn add_label(&mut self, label: impl Into<Label>) {
        self.labels.insert(label.into());
    }

    /// Replace the label set with a single label
    pub fn set_label(&mut self, label: impl Into<Label>) {
        self.labels.clear();
        self.labels.insert(label.into());
    }

    /// Set a property value, returning the previous value
    pub fn set_property(
        &mut self,
        key: impl Into<String>,
        value: impl Into<PropertyValue>,
    ) -> Option<PropertyValue> {
        self.properties.insert(key.into(), value.into())
    }

    /// Get a property value
    pub fn get_property(&self, key: &str) -> Option<&PropertyValue> {
        self.properties.get(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edge_creation() {
        let edge = Edge::new(EdgeId::new(7), NodeId::new(1), NodeId::new(2), "subClassOf");
        assert_eq!(edge.start, NodeId::new(1));
        assert_eq!(edge.end, NodeId::new(2));
        assert_eq!(edge.rel_type.as_str(), "subClassOf");
    }

    #[test]
    fn test_edge_properties() {
        let mut edge = Edge::new(EdgeId::new(7), NodeId::new(1), NodeId::new(2), "knows");
        edge.set_property("weight", 3i64);
        assert_eq!(
            edge.get_property("weight").and_then(|v| v.as_integer()),
            Some(3)
        );
    }
}
