//! Node implementation for the property graph

use super::property::{PropertyMap, PropertyValue};
use super::types::{Label, NodeId};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A node in the property graph
///
/// Every node is keyed by the external IRI (or blank-node key) it was
/// created for; the key doubles as the `iri` property.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    /// Unique identifier for this node
    pub id: NodeId,

    /// External key the node was allocated for
    pub key: String,

    /// Set of labels (multiple labels supported)
    pub labels: HashSet<Label>,

    /// Properties associated with this node
    pub properties: PropertyMap,
}

impl Node {
    /// Create a new node for an external key
    pub fn new(id: NodeId, key: impl Into<String>) -> Self {
        Node {
            id,
            key: key.into(),
            labels: HashSet::new(),
            properties: PropertyMap::new(),
        }
    }

    /// Add a label to this node
    pub fn add_label(&mut self, label: impl Into<Label>) {
        self.labels.insert(label.into());
    }

    /// Replace the label set with a single label
    pub fn set_label(&mut self, label: impl Into<Label>) {
        self.labels.clear();
        self.labels.insert(label.into());
    }

    /// Check if the node has a specific label
    pub fn has_label(&self, label: &Label) -> bool {
        self.labels.contains(label)
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
