//! Concurrent ingestion pipeline
//!
//! Producers parse ontology sources in parallel and funnel decomposed
//! work items through one bounded queue to consumers, which apply them
//! through the injected visitor. The orchestrator owns worker lifecycle,
//! drain detection and failure propagation.

pub mod orchestrator;
pub mod pipeline;
pub mod visitor;
pub mod work;

pub use orchestrator::{LoadOrchestrator, LoadSummary, SessionState};
pub use pipeline::{ConsumerStats, ControlTask, ProducerStats};
pub use visitor::{GraphMapper, IngestVisitor, VisitError};
pub use work::{decompose, Fragment, WorkItem};

use crate::graph::GraphError;
use crate::ontology::OntologyError;
use crate::persistence::StorageError;
use crate::writer::WriteError;
use std::time::Duration;
use thiserror::Error;

/// Fatal session errors. Item-level failures never appear here; they
/// are logged and counted by the consumer that saw them.
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("source {location} failed: {source}")]
    Source {
        location: String,
        #[source]
        source: OntologyError,
    },

    #[error("work queue closed unexpectedly")]
    QueueClosed,

    #[error("worker thread died without reporting a result")]
    WorkerPanic,

    #[error("could not spawn worker thread: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("session did not shut down within {0:?}")]
    ShutdownTimeout(Duration),

    #[error(transparent)]
    Write(#[from] WriteError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("postprocessor {name} failed: {source}")]
    Postprocess {
        name: &'static str,
        #[source]
        source: GraphError,
    },
}
