//! Session assembly
//!
//! Wires a validated configuration into a runnable session: storage,
//! identity maps, index mirror, write layer, the standard fragment
//! mapper and the postprocessing chain.

use crate::config::{ConfigError, SessionConfig};
use crate::graph::GraphStore;
use crate::identity::{EdgeIdentityMap, NodeIdentityMap};
use crate::index::IndexMirror;
use crate::ingest::{GraphMapper, IngestError, LoadOrchestrator, LoadSummary, SessionState};
use crate::persistence::{PersistentStorage, StorageError};
use crate::postprocess::{
    AnonymousNodeTagger, CategoryLabeler, CliqueResolver, EdgeLabeler, Postprocessor,
};
use crate::writer::GraphWriter;
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

/// Anything that can stop a session before or during the run
#[derive(Error, Debug)]
pub enum SessionError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Ingest(#[from] IngestError),
}

/// One configured ingestion session over one graph location
pub struct Session {
    writer: Arc<GraphWriter>,
    orchestrator: LoadOrchestrator,
}

impl Session {
    /// Open (or create) the persistent graph at the configured location
    /// and prepare a session against it. A prior session's nodes, edges
    /// and id counters are restored first, so ingestion deduplicates
    /// against them.
    pub fn open(config: SessionConfig) -> Result<Self, SessionError> {
        config.validate()?;
        let storage = Arc::new(PersistentStorage::open(&config.graph_location)?);
        Self::assemble(config, Some(storage))
    }

    /// Fully in-memory session; identity does not survive the process.
    pub fn in_memory(config: SessionConfig) -> Result<Self, SessionError> {
        config.validate()?;
        Self::assemble(config, None)
    }

    fn assemble(
        config: SessionConfig,
        storage: Option<Arc<PersistentStorage>>,
    ) -> Result<Self, SessionError> {
        let store = Arc::new(GraphStore::new());
        let node_ids = Arc::new(NodeIdentityMap::new());
        let edge_ids = Arc::new(EdgeIdentityMap::new());

        let indexed: HashSet<String> = config.indexed_properties.iter().cloned().collect();
        let exact: HashSet<String> = config.exact_indexed_properties.iter().cloned().collect();
        let mirror = Arc::new(IndexMirror::new(indexed, exact));

        if let Some(storage) = &storage {
            let (nodes, edges) = storage.load_into(&store, &node_ids, &edge_ids)?;
            if nodes + edges > 0 {
                info!(nodes, edges, "continuing from persisted session");
            }
            mirror.rebuild(&store);
        }

        let writer = Arc::new(GraphWriter::new(store, node_ids, edge_ids, mirror, storage));
        let visitor = Arc::new(GraphMapper::new(
            Arc::clone(&writer),
            &config.mapped_properties,
        ));

        let postprocessors: Vec<Box<dyn Postprocessor>> = vec![
            Box::new(AnonymousNodeTagger),
            Box::new(CliqueResolver::default()),
            Box::new(EdgeLabeler),
            Box::new(CategoryLabeler::new(config.categories.clone())),
        ];

        let orchestrator =
            LoadOrchestrator::new(config, Arc::clone(&writer), visitor, postprocessors);
        Ok(Session {
            writer,
            orchestrator,
        })
    }

    /// Run the session to completion
    pub fn run(&self) -> Result<LoadSummary, SessionError> {
        Ok(self.orchestrator.run()?)
    }

    pub fn state(&self) -> SessionState {
        self.orchestrator.state()
    }

    pub fn writer(&self) -> &Arc<GraphWriter> {
        &self.writer
    }
}
