use crate::metrics::{ProgressSnapshot, rate_per_minute};
use model::execution::work::{ErrorStage, WorkResult};
use serde::Serialize;
use std::{collections::BTreeMap, fmt, time::Duration};

/// Failure messages in the summary are cut to this many characters.
pub const MAX_MESSAGE_CHARS: usize = 200;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailedItem {
    pub sequence: u64,
    pub app_id: Option<i64>,
    pub stage: ErrorStage,
    pub message: String,
}

/// End-of-run report built from the sequence-ordered results.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchSummary {
    pub total: u64,
    pub successful: u64,
    pub failed: u64,
    pub records_inserted: u64,
    pub retries: u64,
    pub failures_by_stage: BTreeMap<ErrorStage, u64>,
    pub failed_items: Vec<FailedItem>,
    pub elapsed_secs: f64,
    pub items_per_minute: f64,
    pub cancelled: bool,
}

impl BatchSummary {
    /// `max_failed_listed` bounds the number of failures listed individually.
    pub fn from_results(
        results: &[WorkResult],
        retries: u64,
        elapsed: Duration,
        max_failed_listed: usize,
    ) -> Self {
        let mut failures_by_stage = BTreeMap::new();
        let mut failed_items = Vec::new();
        let mut successful = 0;
        let mut records_inserted = 0;

        for result in results {
            if result.success {
                successful += 1;
                records_inserted += result.records_inserted;
                continue;
            }
            let stage = result.error_stage.unwrap_or(ErrorStage::Unknown);
            *failures_by_stage.entry(stage).or_default() += 1;
            if failed_items.len() < max_failed_listed {
                failed_items.push(FailedItem {
                    sequence: result.sequence,
                    app_id: result.app_id,
                    stage,
                    message: truncate(result.error_message.as_deref().unwrap_or_default()),
                });
            }
        }

        let total = results.len() as u64;
        Self {
            total,
            successful,
            failed: total - successful,
            records_inserted,
            retries,
            failures_by_stage,
            failed_items,
            elapsed_secs: elapsed.as_secs_f64(),
            items_per_minute: rate_per_minute(total, elapsed),
            cancelled: false,
        }
    }

    pub fn cancelled(mut self, cancelled: bool) -> Self {
        self.cancelled = cancelled;
        self
    }

    pub fn matches_snapshot(&self, snapshot: &ProgressSnapshot) -> bool {
        self.total == snapshot.processed
            && self.successful == snapshot.successful
            && self.failures_by_stage == snapshot.failures_by_stage
    }
}

fn truncate(message: &str) -> String {
    if message.chars().count() <= MAX_MESSAGE_CHARS {
        return message.to_string();
    }
    let mut cut: String = message.chars().take(MAX_MESSAGE_CHARS - 3).collect();
    cut.push_str("...");
    cut
}

impl fmt::Display for BatchSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Processed {} item(s): {} succeeded, {} failed, {} row(s) inserted",
            self.total, self.successful, self.failed, self.records_inserted
        )?;
        writeln!(
            f,
            "Elapsed {:.1}s ({:.1} items/min), {} retr{}",
            self.elapsed_secs,
            self.items_per_minute,
            self.retries,
            if self.retries == 1 { "y" } else { "ies" }
        )?;
        if self.cancelled {
            writeln!(f, "Run was cancelled before the source was exhausted")?;
        }
        for (stage, count) in &self.failures_by_stage {
            writeln!(f, "  {stage:<22} {count}")?;
        }
        for item in &self.failed_items {
            let id = item
                .app_id
                .map(|id| id.to_string())
                .unwrap_or_else(|| format!("#{}", item.sequence));
            writeln!(f, "  - {id} [{}] {}", item.stage, item.message)?;
        }
        Ok(())
    }
}
