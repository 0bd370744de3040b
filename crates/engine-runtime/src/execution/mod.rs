pub mod coordinator;
pub mod worker;

pub use coordinator::{ActiveRun, BatchOutcome, Coordinator, CoordinatorConfig};
pub use worker::{StageFailure, WorkerContext};
