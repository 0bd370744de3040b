use model::execution::work::{ErrorStage, WorkResult};
use serde::Serialize;
use std::{collections::BTreeMap, time::Duration};

/// Running totals over completed work items. Owned by a single aggregator,
/// so it needs no interior synchronisation.
#[derive(Debug, Clone, Default)]
pub struct ProgressTracker {
    processed: u64,
    successful: u64,
    failed: u64,
    records_inserted: u64,
    retries: u64,
    by_stage: BTreeMap<ErrorStage, u64>,
}

/// Point-in-time copy of the progress counters.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProgressSnapshot {
    pub processed: u64,
    pub successful: u64,
    pub failed: u64,
    pub records_inserted: u64,
    pub retries: u64,
    pub failures_by_stage: BTreeMap<ErrorStage, u64>,
    #[serde(serialize_with = "as_secs")]
    pub elapsed: Duration,
    pub items_per_minute: f64,
}

fn as_secs<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_f64(d.as_secs_f64())
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, result: &WorkResult) {
        self.processed += 1;
        if result.success {
            self.successful += 1;
            self.records_inserted += result.records_inserted;
        } else {
            self.failed += 1;
            let stage = result.error_stage.unwrap_or(ErrorStage::Unknown);
            *self.by_stage.entry(stage).or_default() += 1;
        }
    }

    pub fn record_retries(&mut self, count: u64) {
        self.retries += count;
    }

    pub fn processed(&self) -> u64 {
        self.processed
    }

    pub fn snapshot(&self, elapsed: Duration) -> ProgressSnapshot {
        ProgressSnapshot {
            processed: self.processed,
            successful: self.successful,
            failed: self.failed,
            records_inserted: self.records_inserted,
            retries: self.retries,
            failures_by_stage: self.by_stage.clone(),
            elapsed,
            items_per_minute: rate_per_minute(self.processed, elapsed),
        }
    }
}

pub fn rate_per_minute(count: u64, elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64();
    if secs <= f64::EPSILON {
        0.0
    } else {
        count as f64 * 60.0 / secs
    }
}
