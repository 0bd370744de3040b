use crate::{actor::ProgressHandle, error::RunnerError};
use connectors::sql::{
    error::{DbError, DbErrorKind},
    insert::{BulkInsert, ConnectionProvider, write_records},
};
use engine_core::{RetryDisposition, RetryPolicy};
use engine_processing::{Clock, DataMapper, Validator};
use futures::FutureExt;
use model::{
    MappingContract,
    contract::tables::TargetTable,
    execution::work::{ErrorStage, WorkItem, WorkResult},
    records::batch::MappedRecords,
};
use std::{
    panic::AssertUnwindSafe,
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::{
    sync::{Mutex, mpsc},
    time::timeout,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Where an item stopped, with the message reported for it.
#[derive(Debug, Clone, PartialEq)]
pub struct StageFailure {
    pub stage: ErrorStage,
    pub message: String,
    pub app_id: Option<i64>,
    /// Insert attempts beyond the first.
    pub retries: u64,
}

impl StageFailure {
    fn new(stage: ErrorStage, message: impl Into<String>) -> Self {
        Self {
            stage,
            message: message.into(),
            app_id: None,
            retries: 0,
        }
    }

    fn with_app_id(mut self, app_id: Option<i64>) -> Self {
        self.app_id = app_id;
        self
    }
}

/// Rows ready for insertion.
struct Prepared {
    app_id: Option<i64>,
    records: MappedRecords,
}

struct Inserted {
    rows: u64,
    retries: u64,
}

/// Everything one worker needs, built once when the worker starts and
/// never shared with another worker.
pub struct WorkerContext {
    id: usize,
    validator: Arc<Validator>,
    mapper: Arc<DataMapper>,
    order: Vec<TargetTable>,
    provider: Arc<dyn ConnectionProvider>,
    conn: Mutex<Box<dyn BulkInsert>>,
    retry: RetryPolicy,
    item_timeout: Duration,
}

impl WorkerContext {
    pub async fn new(
        id: usize,
        contract: Arc<MappingContract>,
        provider: Arc<dyn ConnectionProvider>,
        clock: Option<Arc<dyn Clock>>,
        retry: RetryPolicy,
        item_timeout: Duration,
    ) -> Result<Self, RunnerError> {
        let mut mapper = DataMapper::new(contract.clone())?;
        if let Some(clock) = clock {
            mapper = mapper.with_clock(clock);
        }
        let conn = provider.get_connection().await?;

        debug!(worker = id, "Worker context ready");
        Ok(Self {
            id,
            validator: Arc::new(Validator::new(contract)),
            order: mapper.insertion_order().to_vec(),
            mapper: Arc::new(mapper),
            provider,
            conn: Mutex::new(conn),
            retry,
            item_timeout,
        })
    }

    pub fn id(&self) -> usize {
        self.id
    }

    /// Runs one item to a terminal state. Never fails: timeouts and panics
    /// are reported as `worker_process` failures.
    pub async fn process(&self, item: &WorkItem) -> (WorkResult, u64) {
        let started = Instant::now();

        let run = AssertUnwindSafe(self.run_stages(item)).catch_unwind();
        let outcome = match timeout(self.item_timeout, run).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(_panic)) => Err(StageFailure::new(
                ErrorStage::WorkerProcess,
                "worker panicked while processing the item",
            )),
            Err(_elapsed) => {
                self.abandon_transaction().await;
                Err(StageFailure::new(
                    ErrorStage::WorkerProcess,
                    format!("timed out after {}s", self.item_timeout.as_secs_f64()),
                ))
            }
        };

        let elapsed = started.elapsed();
        match outcome {
            Ok((prepared, inserted)) => {
                let tables = prepared.records.tables_populated(&self.order);
                debug!(
                    worker = self.id,
                    sequence = item.sequence,
                    rows = inserted.rows,
                    "Item processed"
                );
                let result =
                    WorkResult::success(item, prepared.app_id, inserted.rows, tables, elapsed);
                (result, inserted.retries)
            }
            Err(failure) => {
                warn!(
                    worker = self.id,
                    sequence = item.sequence,
                    record = %item.record_id,
                    stage = %failure.stage,
                    error = %failure.message,
                    "Item failed"
                );
                let retries = failure.retries;
                let result = WorkResult::failure(item, failure.stage, failure.message, elapsed)
                    .with_app_id(failure.app_id);
                (result, retries)
            }
        }
    }

    async fn run_stages(&self, item: &WorkItem) -> Result<(Prepared, Inserted), StageFailure> {
        let validator = self.validator.clone();
        let mapper = self.mapper.clone();
        let xml = item.raw_xml.clone();
        let record_id = item.record_id.clone();

        let prepared = tokio::task::spawn_blocking(move || {
            prepare(&validator, &mapper, &xml, &record_id)
        })
        .await
        .map_err(|err| {
            StageFailure::new(ErrorStage::WorkerProcess, format!("worker task failed: {err}"))
        })??;

        let inserted = self
            .insert(&prepared.records)
            .await
            .map_err(|f| f.with_app_id(prepared.app_id))?;
        Ok((prepared, inserted))
    }

    /// Writes the mapped rows in one transaction, retrying transient
    /// database errors.
    async fn insert(&self, records: &MappedRecords) -> Result<Inserted, StageFailure> {
        let provider = self.provider.as_ref();
        let order = self.order.as_slice();
        let conn = &self.conn;

        let attempt = || async move {
            let mut conn = conn.lock().await;
            write_records(&mut **conn, provider, records, order).await
        };
        let classify = |err: &DbError| {
            if err.is_transient() {
                RetryDisposition::Retry
            } else {
                RetryDisposition::Stop
            }
        };

        match self.retry.run(attempt, classify).await {
            Ok((0, _)) => Err(StageFailure::new(
                ErrorStage::Insertion,
                "no rows were inserted",
            )),
            Ok((rows, attempts)) => Ok(Inserted {
                rows,
                retries: u64::from(attempts.saturating_sub(1)),
            }),
            Err(err) => {
                let attempts = err.attempts();
                let err = err.into_inner();
                debug!(worker = self.id, attempts, error = ?err, "Insert failed");
                let mut failure = StageFailure::new(insert_stage(&err), err.to_string());
                failure.retries = u64::from(attempts.saturating_sub(1));
                Err(failure)
            }
        }
    }

    /// A timed-out item may leave its transaction open on the connection.
    async fn abandon_transaction(&self) {
        let mut conn = self.conn.lock().await;
        if let Err(err) = conn.rollback().await {
            debug!(worker = self.id, error = %err, "No transaction to roll back");
        }
    }
}

/// Validation, parsing and mapping. CPU-bound, so it runs on the blocking pool.
fn prepare(
    validator: &Validator,
    mapper: &DataMapper,
    xml: &str,
    record_id: &str,
) -> Result<Prepared, StageFailure> {
    let (validation, tree) = validator.validate_document(xml, record_id);

    if let Some(err) = &validation.parse_error {
        return Err(StageFailure::new(ErrorStage::Parsing, err.to_string()));
    }
    if !validation.can_process {
        let message = if validation.validation_errors.is_empty() {
            "document did not pass validation".to_string()
        } else {
            validation.validation_errors.join("; ")
        };
        return Err(StageFailure::new(ErrorStage::Validation, message).with_app_id(validation.app_id));
    }
    let Some(tree) = tree else {
        return Err(StageFailure::new(ErrorStage::Parsing, "document was not parsed"));
    };

    let records = mapper.map(&tree, &validation).map_err(|err| {
        StageFailure::new(ErrorStage::Mapping, err.to_string()).with_app_id(validation.app_id)
    })?;

    Ok(Prepared {
        app_id: validation.app_id,
        records,
    })
}

fn insert_stage(err: &DbError) -> ErrorStage {
    match err.classify() {
        DbErrorKind::ConstraintViolation => ErrorStage::ConstraintViolation,
        DbErrorKind::Database => ErrorStage::DatabaseError,
        DbErrorKind::System => ErrorStage::SystemError,
    }
}

pub type SharedQueue = Arc<Mutex<mpsc::Receiver<WorkItem>>>;

/// Pulls items until the queue closes or the run is cancelled.
pub async fn run_worker(
    ctx: WorkerContext,
    queue: SharedQueue,
    progress: ProgressHandle,
    cancel: CancellationToken,
) -> Vec<WorkResult> {
    let mut results = Vec::new();

    loop {
        let next = {
            let mut rx = queue.lock().await;
            tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                item = rx.recv() => item,
            }
        };
        let Some(item) = next else {
            break;
        };

        let (result, retries) = ctx.process(&item).await;
        if let Err(err) = progress.retried(retries).await {
            warn!(worker = ctx.id(), error = %err, "Progress aggregator unavailable");
        }
        if let Err(err) = progress.completed(result.clone()).await {
            warn!(worker = ctx.id(), error = %err, "Progress aggregator unavailable");
        }
        results.push(result);
    }

    debug!(worker = ctx.id(), items = results.len(), "Worker finished");
    results
}
