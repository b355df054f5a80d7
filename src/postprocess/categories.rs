//! Blanket category labeling
//!
//! Each configured category maps a root IRI to a label. The pass walks
//! down the class hierarchy from every root (incoming `subClassOf` and
//! `type` edges) and stamps the label (and a `category` property) onto
//! every node it reaches, the root included.

use super::{PostprocessContext, Postprocessor};
use crate::graph::{GraphResult, NodeId};
use rustc_hash::FxHashSet;
use std::collections::HashMap;
use tracing::{info, warn};

const HIERARCHY_RELS: &[&str] = &["subClassOf", "type"];

pub struct CategoryLabeler {
    /// Root IRI -> category label
    categories: HashMap<String, String>,
}

impl CategoryLabeler {
    pub fn new(categories: HashMap<String, String>) -> Self {
        CategoryLabeler { categories }
    }
}

impl Postprocessor for CategoryLabeler {
    fn name(&self) -> &'static str {
        "category-labeling"
    }

    fn run(&self, ctx: &PostprocessContext<'_>) -> GraphResult<()> {
        for (root_iri, label) in &self.categories {
            let root = match ctx.node_ids().get(root_iri) {
                Some(root) => root,
                None => {
                    warn!(root = %root_iri, "category root not present in graph");
                    continue;
                }
            };

            let mut visited: FxHashSet<NodeId> = FxHashSet::default();
            let mut frontier = vec![root];
            while let Some(node) = frontier.pop() {
                if !visited.insert(node) {
                    continue;
                }
                ctx.writer.add_label(node, label.as_str())?;
                ctx.writer
                    .add_property(node, "category", label.as_str())?;

                for edge_id in ctx.store().incoming(node) {
                    if let Some(edge) = ctx.store().get_edge(edge_id) {
                        if HIERARCHY_RELS.contains(&edge.rel_type.as_str()) {
                            frontier.push(edge.start);
                        }
                    }
                }
            }
            info!(root = %root_iri, label = %label, members = visited.len(), "applied category");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Label;
    use crate::writer::GraphWriter;

    #[test]
    fn test_category_covers_subtree() {
        let writer = GraphWriter::in_memory();
        let pizza = writer.get_or_create_node("http://example.org/Pizza");
        let margherita = writer.get_or_create_node("http://example.org/Margherita");
        let slice = writer.get_or_create_node("http://example.org/my-slice");
        let topping = writer.get_or_create_node("http://example.org/Topping");

        writer
            .create_relationship(margherita, pizza, "subClassOf")
            .unwrap();
        writer.create_relationship(slice, margherita, "type").unwrap();

        let categories =
            HashMap::from([("http://example.org/Pizza".to_string(), "pizza".to_string())]);
        CategoryLabeler::new(categories)
            .run(&PostprocessContext::new(&writer))
            .unwrap();

        for id in [pizza, margherita, slice] {
            assert!(writer
                .store()
                .get_node(id)
                .unwrap()
                .has_label(&Label::new("pizza")));
        }
        assert!(!writer
            .store()
            .get_node(topping)
            .unwrap()
            .has_label(&Label::new("pizza")));
    }

    #[test]
    fn test_missing_root_is_skipped() {
        let writer = GraphWriter::in_memory();
        writer.get_or_create_node("http://example.org/A");
        let categories =
            HashMap::from([("http://example.org/Missing".to_string(), "x".to_string())]);
        CategoryLabeler::new(categories)
            .run(&PostprocessContext::new(&writer))
            .unwrap();
    }
}
