//! Clique / identity resolution
//!
//! Nodes connected by equivalence edges (`equivalentClass`, `sameAs`)
//! represent the same real-world entity. This pass computes the
//! connected components over those edges, designates the lowest-id
//! member of each component as its leader, labels the leader and points
//! every other member at it through a `clique_leader` property.

use super::{PostprocessContext, Postprocessor};
use crate::graph::{GraphResult, NodeId, RelType};
use std::collections::HashMap;
use tracing::info;

/// Property on clique members naming the leader's external key
pub const CLIQUE_LEADER_PROPERTY: &str = "clique_leader";

/// Label on clique leaders
pub const CLIQUE_LEADER_LABEL: &str = "cliqueLeader";

pub struct CliqueResolver {
    equivalence_types: Vec<RelType>,
}

impl Default for CliqueResolver {
    fn default() -> Self {
        CliqueResolver {
            equivalence_types: vec![RelType::new("equivalentClass"), RelType::new("sameAs")],
        }
    }
}

impl CliqueResolver {
    pub fn new(equivalence_types: Vec<RelType>) -> Self {
        CliqueResolver { equivalence_types }
    }
}

/// Union-find with path halving
fn find(parent: &mut HashMap<NodeId, NodeId>, mut x: NodeId) -> NodeId {
    while parent[&x] != x {
        let grandparent = parent[&parent[&x]];
        parent.insert(x, grandparent);
        x = grandparent;
    }
    x
}

fn union(parent: &mut HashMap<NodeId, NodeId>, a: NodeId, b: NodeId) {
    parent.entry(a).or_insert(a);
    parent.entry(b).or_insert(b);
    let root_a = find(parent, a);
    let root_b = find(parent, b);
    if root_a != root_b {
        // the smaller id wins so leaders are deterministic
        if root_a < root_b {
            parent.insert(root_b, root_a);
        } else {
            parent.insert(root_a, root_b);
        }
    }
}

impl Postprocessor for CliqueResolver {
    fn name(&self) -> &'static str {
        "clique-resolution"
    }

    fn run(&self, ctx: &PostprocessContext<'_>) -> GraphResult<()> {
        let store = ctx.store();

        let mut parent: HashMap<NodeId, NodeId> = HashMap::new();
        for rel_type in &self.equivalence_types {
            for edge_id in store.edges_with_type(rel_type) {
                if let Some(edge) = store.get_edge(edge_id) {
                    union(&mut parent, edge.start, edge.end);
                }
            }
        }

        let members: Vec<NodeId> = parent.keys().copied().collect();
        let mut components: HashMap<NodeId, Vec<NodeId>> = HashMap::new();
        for member in members {
            let root = find(&mut parent, member);
            components.entry(root).or_default().push(member);
        }

        let mut cliques = 0u64;
        for (leader, mut component) in components {
            if component.len() < 2 {
                continue;
            }
            component.sort();
            cliques += 1;

            let leader_key = match store.with_node(leader, |node| node.key.clone()) {
                Some(key) => key,
                None => continue,
            };
            ctx.writer.add_label(leader, CLIQUE_LEADER_LABEL)?;
            for member in component {
                if member != leader {
                    ctx.writer
                        .set_property(member, CLIQUE_LEADER_PROPERTY, leader_key.as_str())?;
                }
            }
        }
        info!(cliques, "resolved identity cliques");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Label, PropertyValue};
    use crate::writer::GraphWriter;

    #[test]
    fn test_transitive_clique_single_leader() {
        let writer = GraphWriter::in_memory();
        let a = writer.get_or_create_node("http://example.org/A");
        let b = writer.get_or_create_node("http://example.org/B");
        let c = writer.get_or_create_node("http://example.org/C");
        let lone = writer.get_or_create_node("http://example.org/D");

        writer.create_relationship(a, b, "equivalentClass").unwrap();
        writer.create_relationship(c, b, "sameAs").unwrap();

        CliqueResolver::default()
            .run(&PostprocessContext::new(&writer))
            .unwrap();

        // lowest id (a) leads the clique of three
        assert!(writer
            .store()
            .get_node(a)
            .unwrap()
            .has_label(&Label::new(CLIQUE_LEADER_LABEL)));
        for member in [b, c] {
            assert_eq!(
                writer
                    .store()
                    .get_node(member)
                    .unwrap()
                    .get_property(CLIQUE_LEADER_PROPERTY),
                Some(&PropertyValue::from("http://example.org/A"))
            );
        }
        // untouched node stays out of the clique
        let node = writer.store().get_node(lone).unwrap();
        assert!(node.get_property(CLIQUE_LEADER_PROPERTY).is_none());
        assert!(!node.has_label(&Label::new(CLIQUE_LEADER_LABEL)));
    }
}
