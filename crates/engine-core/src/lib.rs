pub mod metrics;
pub mod retry;
pub mod summary;

pub use metrics::{ProgressSnapshot, ProgressTracker};
pub use retry::{RetryDisposition, RetryError, RetryPolicy};
pub use summary::BatchSummary;
