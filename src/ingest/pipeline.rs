//! Producer and consumer workers
//!
//! Producers take "load this source" tasks from the control queue, parse
//! and decompose the source, and push work items onto the bounded shared
//! queue, blocking when it is full. That blocking is the pipeline's only
//! flow control. Consumers drain the queue and dispatch each item to the
//! injected visitor. A poison pill on either queue terminates the worker
//! that takes it.

use super::visitor::IngestVisitor;
use super::work::{decompose, WorkItem};
use super::IngestError;
use crate::config::{SourceConfig, SourceErrorPolicy};
use crate::ontology::{load_ontology, reasoner_for, OntologyError};
use crossbeam_channel::{Receiver, Sender};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Task on the producer control queue
#[derive(Debug, Clone)]
pub enum ControlTask {
    /// Load one ontology source
    Load(SourceConfig),

    /// Producer-side poison pill
    Shutdown,
}

/// Per-producer counters, merged by the orchestrator
#[derive(Debug, Default, Clone, Copy)]
pub struct ProducerStats {
    pub sources_loaded: u64,
    pub sources_skipped: u64,
    pub items_emitted: u64,
}

/// Per-consumer counters, merged by the orchestrator
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsumerStats {
    pub items_processed: u64,
    pub items_failed: u64,
}

/// Fetch, parse, reason over and decompose one source
fn load_source(source: &SourceConfig) -> Result<Vec<WorkItem>, OntologyError> {
    let ontology = load_ontology(&source.location, source.skip_imports)?;
    let ontology = reasoner_for(source.reasoner).reason(ontology)?;
    Ok(decompose(ontology))
}

/// Producer loop: one source task at a time until a shutdown pill (or
/// the control queue closes).
pub(crate) fn run_producer(
    worker: usize,
    control: Receiver<ControlTask>,
    queue: Sender<WorkItem>,
    abort: Arc<AtomicBool>,
    policy: SourceErrorPolicy,
) -> Result<ProducerStats, IngestError> {
    let mut stats = ProducerStats::default();

    loop {
        let source = match control.recv() {
            Ok(ControlTask::Load(source)) => source,
            Ok(ControlTask::Shutdown) | Err(_) => break,
        };
        if abort.load(Ordering::Relaxed) {
            // keep draining control tasks so the session winds down
            continue;
        }

        debug!(worker, location = %source.location, "loading source");
        let items = match load_source(&source) {
            Ok(items) => items,
            Err(error) => match policy {
                SourceErrorPolicy::Skip => {
                    warn!(worker, location = %source.location, %error, "skipping failed source");
                    stats.sources_skipped += 1;
                    continue;
                }
                SourceErrorPolicy::Abort => {
                    return Err(IngestError::Source {
                        location: source.location.clone(),
                        source: error,
                    })
                }
            },
        };

        let total = items.len();
        for item in items {
            if abort.load(Ordering::Relaxed) {
                return Ok(stats);
            }
            // blocks when the queue is full: backpressure
            queue
                .send(item)
                .map_err(|_| IngestError::QueueClosed)?;
            stats.items_emitted += 1;
        }
        stats.sources_loaded += 1;
        info!(worker, location = %source.location, items = total, "source enqueued");
    }

    Ok(stats)
}

/// Consumer loop: dispatch items to the visitor until a pill arrives or
/// the queue closes with no producers left.
pub(crate) fn run_consumer(
    worker: usize,
    queue: Receiver<WorkItem>,
    visitor: Arc<dyn IngestVisitor>,
    abort: Arc<AtomicBool>,
) -> Result<ConsumerStats, IngestError> {
    let mut stats = ConsumerStats::default();

    loop {
        let (ontology, fragment) = match queue.recv() {
            Ok(WorkItem::Fragment { ontology, fragment }) => (ontology, fragment),
            Ok(WorkItem::PoisonPill) | Err(_) => break,
        };
        if abort.load(Ordering::Relaxed) {
            // drain without applying so blocked producers unwind
            continue;
        }

        match visitor.visit(&ontology, &fragment) {
            Ok(()) => stats.items_processed += 1,
            Err(error) => {
                // one bad item must not poison the load
                stats.items_failed += 1;
                warn!(
                    worker,
                    ontology = ontology.as_ref(),
                    item = %fragment.describe(),
                    %error,
                    "failed to apply work item"
                );
            }
        }
    }

    debug!(
        worker,
        processed = stats.items_processed,
        failed = stats.items_failed,
        "consumer terminated"
    );
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::visitor::{GraphMapper, VisitError};
    use crate::ingest::work::Fragment;
    use crate::writer::GraphWriter;
    use crossbeam_channel::{bounded, unbounded};
    use std::io::Write;

    fn source_file(dir: &tempfile::TempDir, name: &str, body: &str) -> SourceConfig {
        let path = dir.path().join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        write!(file, "{}", body).unwrap();
        SourceConfig {
            location: path.to_string_lossy().into_owned(),
            reasoner: Default::default(),
            skip_imports: true,
        }
    }

    const SIMPLE: &str = r#"@prefix owl: <http://www.w3.org/2002/07/owl#> .
<http://example.org/o> a owl:Ontology .
<http://example.org/o#A> a owl:Class .
"#;

    #[test]
    fn test_producer_emits_then_stops_on_pill() {
        let dir = tempfile::tempdir().unwrap();
        let source = source_file(&dir, "a.ttl", SIMPLE);

        let (control_tx, control_rx) = unbounded();
        let (work_tx, work_rx) = bounded(16);
        control_tx.send(ControlTask::Load(source)).unwrap();
        control_tx.send(ControlTask::Shutdown).unwrap();

        let stats = run_producer(
            0,
            control_rx,
            work_tx,
            Arc::new(AtomicBool::new(false)),
            SourceErrorPolicy::Abort,
        )
        .unwrap();

        assert_eq!(stats.sources_loaded, 1);
        assert_eq!(stats.items_emitted, 2); // header + declaration
        assert_eq!(work_rx.len(), 2);
    }

    #[test]
    fn test_producer_policy_skip_vs_abort() {
        let bad = SourceConfig {
            location: "/missing/nowhere.ttl".to_string(),
            reasoner: Default::default(),
            skip_imports: true,
        };

        let (control_tx, control_rx) = unbounded();
        let (work_tx, _work_rx) = bounded::<WorkItem>(4);
        control_tx.send(ControlTask::Load(bad.clone())).unwrap();
        control_tx.send(ControlTask::Shutdown).unwrap();
        let stats = run_producer(
            0,
            control_rx,
            work_tx,
            Arc::new(AtomicBool::new(false)),
            SourceErrorPolicy::Skip,
        )
        .unwrap();
        assert_eq!(stats.sources_skipped, 1);

        let (control_tx, control_rx) = unbounded();
        let (work_tx, _work_rx) = bounded::<WorkItem>(4);
        control_tx.send(ControlTask::Load(bad)).unwrap();
        control_tx.send(ControlTask::Shutdown).unwrap();
        let err = run_producer(
            0,
            control_rx,
            work_tx,
            Arc::new(AtomicBool::new(false)),
            SourceErrorPolicy::Abort,
        )
        .unwrap_err();
        assert!(matches!(err, IngestError::Source { .. }));
    }

    #[test]
    fn test_backpressure_queue_never_exceeds_capacity() {
        // ~100 declarations, queue capacity 8, no consumer until we
        // start draining by hand
        let mut body = String::from(
            "@prefix owl: <http://www.w3.org/2002/07/owl#> .\n<http://example.org/o> a owl:Ontology .\n",
        );
        for i in 0..100 {
            body.push_str(&format!("<http://example.org/o#C{}> a owl:Class .\n", i));
        }
        let dir = tempfile::tempdir().unwrap();
        let source = source_file(&dir, "big.ttl", &body);

        let capacity = 8;
        let (control_tx, control_rx) = unbounded();
        let (work_tx, work_rx) = bounded(capacity);
        control_tx.send(ControlTask::Load(source)).unwrap();
        control_tx.send(ControlTask::Shutdown).unwrap();

        let producer = std::thread::spawn(move || {
            run_producer(
                0,
                control_rx,
                work_tx,
                Arc::new(AtomicBool::new(false)),
                SourceErrorPolicy::Abort,
            )
        });

        let mut taken = 0u64;
        loop {
            assert!(work_rx.len() <= capacity);
            match work_rx.recv_timeout(std::time::Duration::from_secs(10)) {
                Ok(_) => taken += 1,
                Err(_) => break,
            }
        }
        let stats = producer.join().unwrap().unwrap();
        assert_eq!(stats.items_emitted, 101);
        assert_eq!(taken, 101);
    }

    #[test]
    fn test_consumer_terminates_on_pill() {
        let writer = Arc::new(GraphWriter::in_memory());
        let visitor = Arc::new(GraphMapper::new(Arc::clone(&writer), &[]));

        let (work_tx, work_rx) = bounded(16);
        work_tx
            .send(WorkItem::Fragment {
                ontology: Arc::from("http://example.org/o"),
                fragment: Fragment::Header {
                    iri: "http://example.org/o".to_string(),
                    version_iri: None,
                    imports: vec![],
                },
            })
            .unwrap();
        work_tx.send(WorkItem::PoisonPill).unwrap();

        let stats = run_consumer(0, work_rx, visitor, Arc::new(AtomicBool::new(false))).unwrap();
        assert_eq!(stats.items_processed, 1);
        assert_eq!(writer.store().node_count(), 1);
    }

    #[test]
    fn test_consumer_survives_bad_item() {
        struct FailOnDeclaration(Arc<GraphMapper>);
        impl IngestVisitor for FailOnDeclaration {
            fn visit(&self, ontology: &str, fragment: &Fragment) -> Result<(), VisitError> {
                if matches!(fragment, Fragment::Declaration(_)) {
                    return Err(VisitError::Malformed("injected".to_string()));
                }
                self.0.visit(ontology, fragment)
            }
        }

        let writer = Arc::new(GraphWriter::in_memory());
        let visitor = Arc::new(FailOnDeclaration(Arc::new(GraphMapper::new(
            Arc::clone(&writer),
            &[],
        ))));

        let (work_tx, work_rx) = bounded(16);
        let tag: Arc<str> = Arc::from("http://example.org/o");
        work_tx
            .send(WorkItem::Fragment {
                ontology: Arc::clone(&tag),
                fragment: Fragment::Header {
                    iri: "http://example.org/o".to_string(),
                    version_iri: None,
                    imports: vec![],
                },
            })
            .unwrap();
        work_tx
            .send(WorkItem::Fragment {
                ontology: Arc::clone(&tag),
                fragment: Fragment::Declaration(crate::ontology::Declaration {
                    kind: crate::ontology::EntityKind::Class,
                    iri: "http://example.org/A".to_string(),
                }),
            })
            .unwrap();
        drop(work_tx); // queue closes instead of a pill

        let stats = run_consumer(0, work_rx, visitor, Arc::new(AtomicBool::new(false))).unwrap();
        assert_eq!(stats.items_processed, 1);
        assert_eq!(stats.items_failed, 1);
    }
}
