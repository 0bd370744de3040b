use crate::{
    actor::ProgressHandle,
    error::RunnerError,
    execution::worker::{SharedQueue, WorkerContext, run_worker},
};
use connectors::{
    source::{SourceReader, SourceRecord},
    sql::insert::ConnectionProvider,
};
use engine_config::Settings;
use engine_core::{BatchSummary, ProgressSnapshot, RetryPolicy};
use engine_processing::Clock;
use futures::future::join_all;
use model::{
    MappingContract,
    execution::work::{WorkItem, WorkResult},
};
use std::{
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::{
    sync::{Mutex, mpsc},
    task::{JoinError, JoinHandle},
};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

const PROGRESS_MAILBOX: usize = 1024;

#[derive(Debug, Clone, PartialEq)]
pub struct CoordinatorConfig {
    pub workers: usize,
    pub item_timeout: Duration,
    pub queue_capacity: usize,
    pub progress_interval: usize,
    pub max_failed_listed: usize,
    pub retry: RetryPolicy,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self::from(&Settings::default())
    }
}

impl From<&Settings> for CoordinatorConfig {
    fn from(settings: &Settings) -> Self {
        Self {
            workers: settings.workers.max(1),
            item_timeout: settings.item_timeout(),
            queue_capacity: settings.queue_capacity.max(1),
            progress_interval: settings.progress_interval,
            max_failed_listed: settings.max_failed_listed,
            retry: RetryPolicy::new(
                settings.retry_attempts,
                settings.retry_base_delay(),
                settings.retry_base_delay() * 16,
            ),
        }
    }
}

/// Everything a finished run reports.
#[derive(Debug, Clone)]
pub struct BatchOutcome {
    /// One result per dispatched item, ordered by `sequence`.
    pub results: Vec<WorkResult>,
    pub summary: BatchSummary,
    pub snapshot: ProgressSnapshot,
}

/// Fans work items out to a fixed pool of workers. Each worker owns its
/// own validator, mapper and insert connection.
pub struct Coordinator {
    contract: Arc<MappingContract>,
    provider: Arc<dyn ConnectionProvider>,
    config: CoordinatorConfig,
    clock: Option<Arc<dyn Clock>>,
    cancel: CancellationToken,
}

impl Coordinator {
    pub fn new(
        contract: Arc<MappingContract>,
        provider: Arc<dyn ConnectionProvider>,
        config: CoordinatorConfig,
    ) -> Self {
        Self {
            contract,
            provider,
            config,
            clock: None,
            cancel: CancellationToken::new(),
        }
    }

    /// Fixes the mapper clock, making `default_getutcdate_if_null` values
    /// reproducible.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Builds every worker context, then starts the pool. Fails only when
    /// a worker cannot be set up.
    pub async fn start(&self) -> Result<ActiveRun, RunnerError> {
        let mut contexts = Vec::with_capacity(self.config.workers);
        for id in 0..self.config.workers {
            let ctx = WorkerContext::new(
                id,
                self.contract.clone(),
                self.provider.clone(),
                self.clock.clone(),
                self.config.retry.clone(),
                self.config.item_timeout,
            )
            .await?;
            contexts.push(ctx);
        }

        let (progress, progress_task) =
            ProgressHandle::spawn(self.config.progress_interval, PROGRESS_MAILBOX);
        let (tx, rx) = mpsc::channel::<WorkItem>(self.config.queue_capacity);
        let queue: SharedQueue = Arc::new(Mutex::new(rx));

        let workers = contexts
            .into_iter()
            .map(|ctx| {
                tokio::spawn(run_worker(
                    ctx,
                    queue.clone(),
                    progress.clone(),
                    self.cancel.clone(),
                ))
            })
            .collect();

        info!(workers = self.config.workers, "Worker pool started");
        Ok(ActiveRun {
            tx,
            workers,
            progress,
            progress_task,
            cancel: self.cancel.clone(),
            started: Instant::now(),
            max_failed_listed: self.config.max_failed_listed,
            next_sequence: 0,
        })
    }

    /// Processes `items` and waits for every one of them.
    pub async fn process_batch(
        &self,
        items: impl IntoIterator<Item = WorkItem>,
    ) -> Result<BatchOutcome, RunnerError> {
        let mut run = self.start().await?;
        for item in items {
            if !run.submit(item).await {
                break;
            }
        }
        run.finish().await
    }

    /// Drains `source` through the pool, stopping after `limit` records.
    /// A source failure stops dispatching; items already queued still
    /// finish before the error is returned.
    pub async fn run_source(
        &self,
        source: &mut dyn SourceReader,
        limit: Option<usize>,
    ) -> Result<BatchOutcome, RunnerError> {
        let mut run = self.start().await?;
        let mut dispatched = 0usize;
        let mut source_error = None;

        'feed: loop {
            let page = match source.next_batch().await {
                Ok(Some(page)) => page,
                Ok(None) => break,
                Err(err) => {
                    error!(error = %err, "Reading the source failed");
                    source_error = Some(err);
                    break;
                }
            };

            for record in page {
                if limit.is_some_and(|limit| dispatched >= limit) {
                    break 'feed;
                }
                if !run.submit_record(record).await {
                    break 'feed;
                }
                dispatched += 1;
            }
        }

        let outcome = run.finish().await?;
        match source_error {
            Some(err) => Err(err.into()),
            None => Ok(outcome),
        }
    }
}

/// A started worker pool accepting items.
pub struct ActiveRun {
    tx: mpsc::Sender<WorkItem>,
    workers: Vec<JoinHandle<Vec<WorkResult>>>,
    progress: ProgressHandle,
    progress_task: JoinHandle<()>,
    cancel: CancellationToken,
    started: Instant,
    max_failed_listed: usize,
    next_sequence: u64,
}

impl ActiveRun {
    /// Queues an item, waiting for queue capacity. Returns `false` once the
    /// run is cancelled and no more items are accepted.
    pub async fn submit(&mut self, item: WorkItem) -> bool {
        if self.cancel.is_cancelled() {
            return false;
        }
        self.next_sequence = self.next_sequence.max(item.sequence + 1);

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => false,
            sent = self.tx.send(item) => match sent {
                Ok(()) => true,
                Err(_) => {
                    warn!("Work queue closed; every worker has stopped");
                    false
                }
            },
        }
    }

    /// Queues a source record under the next free sequence number.
    pub async fn submit_record(&mut self, record: SourceRecord) -> bool {
        let item = WorkItem::new(
            self.next_sequence,
            record.app_id,
            record.xml,
            record.record_id,
        );
        self.submit(item).await
    }

    pub fn progress(&self) -> &ProgressHandle {
        &self.progress
    }

    /// Closes the queue, waits for the workers and builds the report.
    pub async fn finish(self) -> Result<BatchOutcome, RunnerError> {
        let ActiveRun {
            tx,
            workers,
            progress,
            progress_task,
            cancel,
            started,
            max_failed_listed,
            ..
        } = self;
        drop(tx);

        let results = gather_results(join_all(workers).await);

        let snapshot = progress.snapshot().await?;
        drop(progress);
        progress_task.await?;

        let cancelled = cancel.is_cancelled();
        let summary = BatchSummary::from_results(
            &results,
            snapshot.retries,
            started.elapsed(),
            max_failed_listed,
        )
        .cancelled(cancelled);

        info!(
            total = summary.total,
            successful = summary.successful,
            failed = summary.failed,
            records_inserted = summary.records_inserted,
            cancelled,
            "Run finished"
        );
        Ok(BatchOutcome {
            results,
            summary,
            snapshot,
        })
    }
}

/// Collects every worker's results in sequence order. A worker that did not
/// join is logged and skipped; the other workers' results are kept.
pub(crate) fn gather_results(
    joined: Vec<Result<Vec<WorkResult>, JoinError>>,
) -> Vec<WorkResult> {
    let mut results = Vec::new();
    for (worker, outcome) in joined.into_iter().enumerate() {
        match outcome {
            Ok(worker_results) => results.extend(worker_results),
            Err(err) => error!(worker, error = %err, "Worker task failed; its results are lost"),
        }
    }
    results.sort_by_key(|r| r.sequence);
    results
}
