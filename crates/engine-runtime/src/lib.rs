pub mod actor;
pub mod error;
pub mod execution;


pub use error::{ActorError, RunnerError};
pub use execution::{BatchOutcome, Coordinator, CoordinatorConfig};
