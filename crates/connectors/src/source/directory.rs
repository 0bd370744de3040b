use crate::source::{SourceReader, SourceRecord, error::SourceError};
use async_trait::async_trait;
use std::{
    collections::VecDeque,
    path::{Path, PathBuf},
};
use tracing::{debug, info};

/// Reads `*.xml` files from one directory in file-name order. A numeric file
/// stem (`1001.xml`) is taken as the record's app id.
#[derive(Debug)]
pub struct DirectorySource {
    files: VecDeque<PathBuf>,
    page_size: usize,
}

impl DirectorySource {
    pub async fn open(dir: impl AsRef<Path>, page_size: usize) -> Result<Self, SourceError> {
        let dir = dir.as_ref();
        let io_err = |source| SourceError::Io {
            path: dir.display().to_string(),
            source,
        };

        let mut entries = tokio::fs::read_dir(dir).await.map_err(io_err)?;
        let mut files = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(io_err)? {
            let path = entry.path();
            let is_xml = path
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("xml"));
            if is_xml && entry.file_type().await.map_err(io_err)?.is_file() {
                files.push(path);
            }
        }
        files.sort();

        info!(dir = %dir.display(), files = files.len(), "Opened XML directory");
        Ok(Self {
            files: files.into(),
            page_size: page_size.max(1),
        })
    }

    /// Drops files whose numeric stem is not greater than `app_id`.
    pub fn start_after(mut self, app_id: Option<i64>) -> Self {
        if let Some(after) = app_id {
            self.files
                .retain(|path| stem_app_id(path).is_none_or(|id| id > after));
        }
        self
    }

    pub fn remaining(&self) -> usize {
        self.files.len()
    }
}

fn stem_app_id(path: &Path) -> Option<i64> {
    path.file_stem()?.to_str()?.trim().parse().ok()
}

#[async_trait]
impl SourceReader for DirectorySource {
    async fn next_batch(&mut self) -> Result<Option<Vec<SourceRecord>>, SourceError> {
        if self.files.is_empty() {
            return Ok(None);
        }

        let take = self.page_size.min(self.files.len());
        let mut batch = Vec::with_capacity(take);
        for path in self.files.drain(..take) {
            let xml = tokio::fs::read_to_string(&path)
                .await
                .map_err(|source| SourceError::Io {
                    path: path.display().to_string(),
                    source,
                })?;
            batch.push(SourceRecord {
                app_id: stem_app_id(&path),
                xml,
                record_id: path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| path.display().to_string()),
            });
        }

        debug!(records = batch.len(), remaining = self.files.len(), "Read XML files");
        Ok(Some(batch))
    }
}
