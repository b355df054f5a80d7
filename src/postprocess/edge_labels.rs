//! Edge labeling
//!
//! Relationship types are local names of property IRIs. When the graph
//! holds a node for such a property carrying a `label` annotation, this
//! pass copies that label onto every edge of the type, so edges read the
//! way the ontology names them.

use super::{PostprocessContext, Postprocessor};
use crate::graph::{GraphResult, PropertyValue};
use crate::ontology::vocab::local_name;
use std::collections::HashMap;
use tracing::info;

pub struct EdgeLabeler;

/// First scalar string inside a property value
fn first_string(value: &PropertyValue) -> Option<&str> {
    match value {
        PropertyValue::String(s) => Some(s),
        PropertyValue::Array(values) => values.iter().find_map(|v| v.as_string()),
        _ => None,
    }
}

impl Postprocessor for EdgeLabeler {
    fn name(&self) -> &'static str {
        "edge-labeling"
    }

    fn run(&self, ctx: &PostprocessContext<'_>) -> GraphResult<()> {
        // local property name -> the label its node carries
        let mut labels: HashMap<String, String> = HashMap::new();
        ctx.store().for_each_node(|node| {
            if let Some(label) = node.get_property("label").and_then(first_string) {
                labels.insert(local_name(&node.key).to_string(), label.to_string());
            }
        });

        let mut labeled = 0u64;
        for edge_id in ctx.store().edge_ids() {
            let rel = match ctx.store().get_edge(edge_id) {
                Some(edge) => edge.rel_type.as_str().to_string(),
                None => continue,
            };
            if let Some(label) = labels.get(&rel) {
                ctx.writer.set_property(edge_id, "label", label.as_str())?;
                labeled += 1;
            }
        }
        info!(labeled, "labeled edges");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::GraphWriter;

    #[test]
    fn test_edges_inherit_property_label() {
        let writer = GraphWriter::in_memory();
        let a = writer.get_or_create_node("http://example.org/A");
        let b = writer.get_or_create_node("http://example.org/B");
        let prop = writer.get_or_create_node("http://example.org/vocab#partOf");
        writer.add_property(prop, "label", "part of").unwrap();

        let edge = writer.create_relationship(a, b, "partOf").unwrap();
        let unlabeled = writer.create_relationship(b, a, "unrelatedTo").unwrap();

        EdgeLabeler.run(&PostprocessContext::new(&writer)).unwrap();

        assert_eq!(
            writer.store().get_edge(edge).unwrap().get_property("label"),
            Some(&PropertyValue::from("part of"))
        );
        assert!(writer
            .store()
            .get_edge(unlabeled)
            .unwrap()
            .get_property("label")
            .is_none());
    }
}
