pub mod directory;
pub mod error;
pub mod mssql;

use async_trait::async_trait;
use error::SourceError;

/// One raw document pulled from a source.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceRecord {
    /// Key known before parsing, if the source stores one next to the XML.
    pub app_id: Option<i64>,
    pub xml: String,
    /// Human-readable origin used in logs and failure listings.
    pub record_id: String,
}

/// Streams source documents in pages. `Ok(None)` signals exhaustion.
#[async_trait]
pub trait SourceReader: Send {
    async fn next_batch(&mut self) -> Result<Option<Vec<SourceRecord>>, SourceError>;
}

pub use directory::DirectorySource;
pub use mssql::MssqlSource;
