//! Graph-wide postprocessing passes
//!
//! Run sequentially by the orchestrator after the pipeline drains, in a
//! fixed order: anonymous-node tagging, clique resolution, edge
//! labeling, blanket category labeling. Each pass runs to completion
//! against the open store before the next begins.

pub mod anonymous;
pub mod categories;
pub mod cliques;
pub mod edge_labels;

pub use anonymous::AnonymousNodeTagger;
pub use categories::CategoryLabeler;
pub use cliques::CliqueResolver;
pub use edge_labels::EdgeLabeler;

use crate::graph::{GraphResult, GraphStore};
use crate::identity::NodeIdentityMap;
use crate::writer::GraphWriter;
use std::sync::Arc;

/// Everything a pass needs: the write layer over the open store
pub struct PostprocessContext<'a> {
    pub writer: &'a GraphWriter,
}

impl<'a> PostprocessContext<'a> {
    pub fn new(writer: &'a GraphWriter) -> Self {
        PostprocessContext { writer }
    }

    pub fn store(&self) -> &Arc<GraphStore> {
        self.writer.store()
    }

    pub fn node_ids(&self) -> &Arc<NodeIdentityMap> {
        self.writer.node_ids()
    }
}

/// One postprocessing pass
pub trait Postprocessor: Send + Sync {
    fn name(&self) -> &'static str;

    fn run(&self, ctx: &PostprocessContext<'_>) -> GraphResult<()>;
}
