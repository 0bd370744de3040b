use connectors::{source::error::SourceError, sql::error::DbError};
use engine_processing::ProcessingError;
use thiserror::Error;

/// Errors that stop a run as a whole. Failures of a single work item never
/// surface here; they become failed [`model::execution::work::WorkResult`]s.
#[derive(Debug, Error)]
pub enum RunnerError {
    /// A worker could not open its insert connection.
    #[error("Database error: {0}")]
    Database(#[from] DbError),

    /// The contract could not be turned into a mapper.
    #[error("Processing setup error: {0}")]
    Processing(#[from] ProcessingError),

    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    #[error("Actor error: {0}")]
    Actor(#[from] ActorError),

    /// A worker task was cancelled or panicked outside item processing.
    #[error("Task join error: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),
}

/// Common error type for all actors in the engine.
#[derive(Debug, Error)]
pub enum ActorError {
    #[error("Mailbox closed")]
    MailboxClosed,

    #[error("Actor internal error: {0}")]
    Internal(String),
}
