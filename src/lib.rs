//! Ontograph
//!
//! A concurrent bulk loader that turns ontology documents into a single
//! deduplicated property graph. Producers parse sources in parallel and
//! feed decomposed work items through a bounded queue to consumers,
//! which write nodes, edges and properties through an identity-resolving
//! write layer: the same external key never creates two nodes, and the
//! same (start, end, type) triple never creates two edges, no matter how
//! the workers interleave.
//!
//! # Example
//!
//! ```no_run
//! use ontograph::config::SessionConfig;
//! use ontograph::session::Session;
//!
//! let config = SessionConfig::new("/tmp/graph", &["/data/pizza.ttl"]);
//! let session = Session::open(config).unwrap();
//! let summary = session.run().unwrap();
//! println!("{} nodes, {} edges", summary.node_count, summary.edge_count);
//! ```

#![allow(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod graph;
pub mod identity;
pub mod index;
pub mod ingest;
pub mod ontology;
pub mod persistence;
pub mod postprocess;
pub mod session;
pub mod writer;

// Re-export main types for convenience
pub use config::{SessionConfig, SourceConfig, SourceErrorPolicy};
pub use graph::{
    Edge, EdgeId, GraphError, GraphResult, GraphStore, Label, Node, NodeId, PropertyMap,
    PropertyValue, RelType,
};
pub use identity::{EdgeIdentityMap, EdgeKey, NodeIdentityMap};
pub use index::IndexMirror;
pub use ingest::{
    Fragment, GraphMapper, IngestError, IngestVisitor, LoadOrchestrator, LoadSummary,
    SessionState, VisitError, WorkItem,
};
pub use ontology::{Ontology, OntologyError, Reasoner, ReasonerKind};
pub use persistence::{PersistentStorage, StorageError};
pub use session::{Session, SessionError};
pub use writer::{EntityRef, GraphWriter, WriteError};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get version string
pub fn version() -> &'static str {
    VERSION
}
