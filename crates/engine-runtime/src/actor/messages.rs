use engine_core::ProgressSnapshot;
use model::execution::work::WorkResult;
use tokio::sync::oneshot;

/// Messages for the progress aggregator.
#[derive(Debug)]
pub enum ProgressMsg {
    /// A work item reached a terminal state.
    Completed(Box<WorkResult>),

    /// Extra insert attempts spent on transient database errors.
    Retried(u64),

    /// Reply with the current counters.
    Snapshot(oneshot::Sender<ProgressSnapshot>),
}
