use crate::sql::error::DbError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("I/O error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Database error: {0}")]
    Database(#[from] DbError),

    #[error("Unexpected source row: {0}")]
    InvalidRow(String),
}
