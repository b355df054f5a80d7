//! Load orchestration
//!
//! Spawns the fixed worker pool, feeds the control queue, watches worker
//! completions as they happen, and, once the pipeline drains, flushes
//! the write layer and runs the postprocessing passes in order.
//!
//! Termination is a well-ordered event, never a poll: producers stop on
//! control-queue pills, the orchestrator observes every producer
//! completion on the done-channel, and only then places one poison pill
//! per consumer on the shared queue. Dropping the last sender doubles as
//! a close signal should a pill go missing.

use super::pipeline::{run_consumer, run_producer, ConsumerStats, ControlTask, ProducerStats};
use super::visitor::IngestVisitor;
use super::work::WorkItem;
use super::IngestError;
use crate::config::SessionConfig;
use crate::postprocess::{PostprocessContext, Postprocessor};
use crate::writer::GraphWriter;
use crossbeam_channel::{bounded, unbounded, Receiver, RecvTimeoutError, Sender};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{error, info};

/// Session lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Running,
    Draining,
    Stopped,
    Failed,
}

/// Final counters of a successful session
#[derive(Debug, Clone, Default)]
pub struct LoadSummary {
    pub sources_loaded: u64,
    pub sources_skipped: u64,
    pub items_emitted: u64,
    pub items_processed: u64,
    pub items_failed: u64,
    pub nodes_created: u64,
    pub edges_created: u64,
    pub properties_written: u64,
    pub node_count: usize,
    pub edge_count: usize,
    pub elapsed: Duration,
}

enum WorkerDone {
    Producer(Result<ProducerStats, IngestError>),
    Consumer(Result<ConsumerStats, IngestError>),
}

/// Runs one ingestion session end to end
pub struct LoadOrchestrator {
    config: SessionConfig,
    writer: Arc<GraphWriter>,
    visitor: Arc<dyn IngestVisitor>,
    postprocessors: Vec<Box<dyn Postprocessor>>,
    state: Mutex<SessionState>,
}

impl LoadOrchestrator {
    pub fn new(
        config: SessionConfig,
        writer: Arc<GraphWriter>,
        visitor: Arc<dyn IngestVisitor>,
        postprocessors: Vec<Box<dyn Postprocessor>>,
    ) -> Self {
        LoadOrchestrator {
            config,
            writer,
            visitor,
            postprocessors,
            state: Mutex::new(SessionState::Idle),
        }
    }

    pub fn state(&self) -> SessionState {
        *self.state.lock().unwrap()
    }

    fn set_state(&self, state: SessionState) {
        *self.state.lock().unwrap() = state;
    }

    /// Run the session: ingest every source, drain, flush, postprocess.
    pub fn run(&self) -> Result<LoadSummary, IngestError> {
        let start = Instant::now();
        let producer_count = self.config.producer_count();
        let consumer_count = self.config.consumer_count();
        info!(
            producers = producer_count,
            consumers = consumer_count,
            sources = self.config.sources.len(),
            queue_capacity = self.config.queue_capacity,
            "starting ingestion session"
        );
        self.set_state(SessionState::Running);

        let (control_tx, control_rx) = bounded(self.config.sources.len() + producer_count);
        let (work_tx, work_rx) = bounded(self.config.queue_capacity);
        let (done_tx, done_rx) = unbounded();
        let abort = Arc::new(AtomicBool::new(false));

        // every source task, then exactly one pill per producer
        for source in &self.config.sources {
            control_tx
                .send(ControlTask::Load(source.clone()))
                .map_err(|_| IngestError::QueueClosed)?;
        }
        for _ in 0..producer_count {
            control_tx
                .send(ControlTask::Shutdown)
                .map_err(|_| IngestError::QueueClosed)?;
        }
        drop(control_tx);

        let mut handles: Vec<JoinHandle<()>> = Vec::with_capacity(producer_count + consumer_count);
        for worker in 0..producer_count {
            let control = control_rx.clone();
            let queue = work_tx.clone();
            let done = done_tx.clone();
            let abort = Arc::clone(&abort);
            let policy = self.config.on_source_error;
            let handle = thread::Builder::new()
                .name(format!("producer-{}", worker))
                .spawn(move || {
                    let result = run_producer(worker, control, queue, abort, policy);
                    let _ = done.send(WorkerDone::Producer(result));
                })
                .map_err(IngestError::Spawn)?;
            handles.push(handle);
        }
        drop(control_rx);

        for worker in 0..consumer_count {
            let queue = work_rx.clone();
            let visitor = Arc::clone(&self.visitor);
            let done = done_tx.clone();
            let abort = Arc::clone(&abort);
            let handle = thread::Builder::new()
                .name(format!("consumer-{}", worker))
                .spawn(move || {
                    let result = run_consumer(worker, queue, visitor, abort);
                    let _ = done.send(WorkerDone::Consumer(result));
                })
                .map_err(IngestError::Spawn)?;
            handles.push(handle);
        }
        drop(done_tx);

        let outcome = self.supervise(
            done_rx,
            work_tx,
            &work_rx,
            &abort,
            producer_count,
            consumer_count,
        );
        let mut summary = match outcome {
            Ok(summary) => {
                for handle in handles {
                    let _ = handle.join();
                }
                summary
            }
            Err(e) => {
                // on a wedged shutdown the workers may never finish;
                // joining would hang the caller too
                if !matches!(e, IngestError::ShutdownTimeout(_)) {
                    for handle in handles {
                        let _ = handle.join();
                    }
                }
                self.set_state(SessionState::Failed);
                return Err(e);
            }
        };

        // drained: persist the ingested graph, then postprocess
        self.set_state(SessionState::Stopped);
        self.writer.flush()?;

        let ctx = PostprocessContext::new(&self.writer);
        for pass in &self.postprocessors {
            let pass_start = Instant::now();
            pass.run(&ctx).map_err(|source| IngestError::Postprocess {
                name: pass.name(),
                source,
            })?;
            info!(pass = pass.name(), elapsed = ?pass_start.elapsed(), "postprocessor finished");
        }
        self.writer.flush()?;

        summary.nodes_created = self.writer.counters().nodes_created();
        summary.edges_created = self.writer.counters().edges_created();
        summary.properties_written = self.writer.counters().properties_written();
        summary.node_count = self.writer.store().node_count();
        summary.edge_count = self.writer.store().edge_count();
        summary.elapsed = start.elapsed();
        Ok(summary)
    }

    /// Wait on worker completions as they happen; a failure surfaces
    /// immediately instead of after every other worker finishes.
    fn supervise(
        &self,
        done_rx: Receiver<WorkerDone>,
        work_tx: Sender<WorkItem>,
        work_rx: &Receiver<WorkItem>,
        abort: &AtomicBool,
        producer_count: usize,
        consumer_count: usize,
    ) -> Result<LoadSummary, IngestError> {
        // hang safety net on the final wait, not a normal control path
        let timeout = Duration::from_secs(self.config.shutdown_timeout_hours * 3600);

        let mut work_tx = Some(work_tx);
        let mut producers_left = producer_count;
        let mut consumers_left = consumer_count;
        let mut failure: Option<IngestError> = None;
        let mut summary = LoadSummary::default();

        while producers_left + consumers_left > 0 {
            match done_rx.recv_timeout(timeout) {
                Ok(WorkerDone::Producer(result)) => {
                    producers_left -= 1;
                    match result {
                        Ok(stats) => {
                            summary.sources_loaded += stats.sources_loaded;
                            summary.sources_skipped += stats.sources_skipped;
                            summary.items_emitted += stats.items_emitted;
                        }
                        Err(e) => self.fail(abort, work_rx, &mut failure, e),
                    }
                    if producers_left == 0 {
                        if failure.is_none() {
                            // all producers done: fan-in, one pill per
                            // consumer, then close the queue
                            self.set_state(SessionState::Draining);
                            if let Some(tx) = &work_tx {
                                for _ in 0..consumer_count {
                                    if tx.send(WorkItem::PoisonPill).is_err() {
                                        break;
                                    }
                                }
                            }
                        }
                        work_tx = None;
                    }
                }
                Ok(WorkerDone::Consumer(result)) => {
                    consumers_left -= 1;
                    match result {
                        Ok(stats) => {
                            summary.items_processed += stats.items_processed;
                            summary.items_failed += stats.items_failed;
                        }
                        Err(e) => self.fail(abort, work_rx, &mut failure, e),
                    }
                }
                Err(RecvTimeoutError::Timeout) => {
                    abort.store(true, Ordering::Relaxed);
                    return Err(IngestError::ShutdownTimeout(timeout));
                }
                Err(RecvTimeoutError::Disconnected) => {
                    // a worker died without reporting
                    return Err(IngestError::WorkerPanic);
                }
            }
        }

        match failure {
            Some(e) => Err(e),
            None => Ok(summary),
        }
    }

    fn fail(
        &self,
        abort: &AtomicBool,
        work_rx: &Receiver<WorkItem>,
        failure: &mut Option<IngestError>,
        error: IngestError,
    ) {
        error!(%error, "worker failed, aborting session");
        abort.store(true, Ordering::Relaxed);
        // unblock producers stuck on a full queue
        while work_rx.try_recv().is_ok() {}
        if failure.is_none() {
            *failure = Some(error);
        }
    }
}
