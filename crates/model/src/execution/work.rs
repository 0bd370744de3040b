use serde::{Deserialize, Serialize};
use std::{fmt, time::Duration};

/// One source record queued for end-to-end processing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem {
    pub sequence: u64,
    pub app_id: Option<i64>,
    pub raw_xml: String,
    pub record_id: String,
}

impl WorkItem {
    pub fn new(sequence: u64, app_id: Option<i64>, raw_xml: String, record_id: String) -> Self {
        Self {
            sequence,
            app_id,
            raw_xml,
            record_id,
        }
    }
}

/// Where processing of a work item stopped.
///
/// Variants are listed in the order failures are checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorStage {
    Validation,
    Parsing,
    Mapping,
    Insertion,
    ConstraintViolation,
    DatabaseError,
    SystemError,
    Unknown,
    WorkerProcess,
}

impl ErrorStage {
    pub const ALL: [ErrorStage; 9] = [
        ErrorStage::Validation,
        ErrorStage::Parsing,
        ErrorStage::Mapping,
        ErrorStage::Insertion,
        ErrorStage::ConstraintViolation,
        ErrorStage::DatabaseError,
        ErrorStage::SystemError,
        ErrorStage::Unknown,
        ErrorStage::WorkerProcess,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorStage::Validation => "validation",
            ErrorStage::Parsing => "parsing",
            ErrorStage::Mapping => "mapping",
            ErrorStage::Insertion => "insertion",
            ErrorStage::ConstraintViolation => "constraint_violation",
            ErrorStage::DatabaseError => "database_error",
            ErrorStage::SystemError => "system_error",
            ErrorStage::Unknown => "unknown",
            ErrorStage::WorkerProcess => "worker_process",
        }
    }
}

impl fmt::Display for ErrorStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one work item. Exactly one is produced per [`WorkItem`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkResult {
    pub sequence: u64,
    pub app_id: Option<i64>,
    pub success: bool,
    pub error_stage: Option<ErrorStage>,
    pub error_message: Option<String>,
    pub records_inserted: u64,
    #[serde(with = "duration_millis")]
    pub processing_time: Duration,
    pub tables_populated: Vec<String>,
}

impl WorkResult {
    pub fn success(
        item: &WorkItem,
        app_id: Option<i64>,
        records_inserted: u64,
        tables_populated: Vec<String>,
        processing_time: Duration,
    ) -> Self {
        Self {
            sequence: item.sequence,
            app_id: app_id.or(item.app_id),
            success: true,
            error_stage: None,
            error_message: None,
            records_inserted,
            processing_time,
            tables_populated,
        }
    }

    pub fn failure(
        item: &WorkItem,
        stage: ErrorStage,
        message: impl Into<String>,
        processing_time: Duration,
    ) -> Self {
        Self {
            sequence: item.sequence,
            app_id: item.app_id,
            success: false,
            error_stage: Some(stage),
            error_message: Some(message.into()),
            records_inserted: 0,
            processing_time,
            tables_populated: Vec::new(),
        }
    }

    pub fn with_app_id(mut self, app_id: Option<i64>) -> Self {
        if app_id.is_some() {
            self.app_id = app_id;
        }
        self
    }
}

mod duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(d)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item() -> WorkItem {
        WorkItem::new(4, None, "<Provenir/>".into(), "file-4".into())
    }

    #[test]
    fn failure_carries_stage_and_no_rows() {
        let r = WorkResult::failure(&item(), ErrorStage::Parsing, "bad xml", Duration::ZERO)
            .with_app_id(Some(12));
        assert!(!r.success);
        assert_eq!(r.sequence, 4);
        assert_eq!(r.app_id, Some(12));
        assert_eq!(r.error_stage, Some(ErrorStage::Parsing));
        assert_eq!(r.records_inserted, 0);
    }

    #[test]
    fn stage_names_are_snake_case() {
        let json = serde_json::to_string(&ErrorStage::ConstraintViolation).unwrap();
        assert_eq!(json, "\"constraint_violation\"");
        assert_eq!(ErrorStage::WorkerProcess.to_string(), "worker_process");
    }
}
