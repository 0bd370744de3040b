use connectors::source::error::SourceError;
use engine_config::{ContractError, SettingsError};
use engine_processing::ProcessingError;
use engine_runtime::RunnerError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("Failed to read {path}: {source}")]
    FileRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to load the mapping contract: {0}")]
    Contract(#[from] ContractError),

    #[error("Invalid settings: {0}")]
    Settings(#[from] SettingsError),

    #[error("Failed to open the source: {0}")]
    Source(#[from] SourceError),

    #[error("Failed to run the migration: {0}")]
    Runner(#[from] RunnerError),

    #[error("Failed to map the document: {0}")]
    Processing(#[from] ProcessingError),

    #[error("Document rejected: {0}")]
    Rejected(String),

    #[error("Failed to serialize data to JSON: {0}")]
    JsonSerialize(#[from] serde_json::Error),

    #[error("Shutdown requested")]
    ShutdownRequested,
}
