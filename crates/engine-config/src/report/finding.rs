use serde::Serialize;
use std::fmt;

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum Severity {
    Warning,
    Error,
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum FindingKind {
    Structure,  // root element, identifiers, tables
    Mapping,    // per-mapping issues
    Expression, // calculated fields
    Lookup,     // enum and bit tables
    Relationship,
}

/// One problem found in a mapping contract.
#[derive(Serialize, Debug, Clone, PartialEq, Eq, Hash)]
pub struct Finding {
    pub code: String,    // stable programmatic id
    pub message: String, // human-readable
    pub severity: Severity,
    pub kind: FindingKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>, // e.g. `mappings[3]`
}

pub const CODE_INVALID_JSON: &str = "INVALID_JSON";
pub const CODE_MISSING_ROOT: &str = "MISSING_ROOT";
pub const CODE_PATH_NOT_ROOTED: &str = "PATH_NOT_ROOTED";
pub const CODE_UNKNOWN_TABLE: &str = "UNKNOWN_TABLE";
pub const CODE_UNKNOWN_MAPPING_TYPE: &str = "UNKNOWN_MAPPING_TYPE";
pub const CODE_UNKNOWN_DATA_TYPE: &str = "UNKNOWN_DATA_TYPE";
pub const CODE_DUPLICATE_MAPPING: &str = "DUPLICATE_MAPPING";
pub const CODE_EXPRESSION_MISSING: &str = "EXPRESSION_MISSING";
pub const CODE_EXPRESSION_INVALID: &str = "EXPRESSION_INVALID";
pub const CODE_EXPRESSION_UNUSED: &str = "EXPRESSION_UNUSED";
pub const CODE_ENUM_MISSING: &str = "ENUM_MISSING";
pub const CODE_CRITICAL_ENUM_DEFAULT: &str = "CRITICAL_ENUM_DEFAULT";
pub const CODE_KEY_VALUE_TABLE: &str = "KEY_VALUE_TABLE";
pub const CODE_SLOT_GROUP: &str = "SLOT_GROUP";
pub const CODE_IDENTIFIER_MISSING: &str = "IDENTIFIER_MISSING";
pub const CODE_ORPHAN_RELATIONSHIP: &str = "ORPHAN_RELATIONSHIP";

impl Finding {
    pub fn new(code: &str, message: String, severity: Severity, kind: FindingKind) -> Self {
        Finding {
            code: code.to_string(),
            message,
            severity,
            kind,
            subject: None,
        }
    }

    pub fn error(code: &str, message: impl Into<String>, kind: FindingKind) -> Self {
        Finding::new(code, message.into(), Severity::Error, kind)
    }

    pub fn warning(code: &str, message: impl Into<String>, kind: FindingKind) -> Self {
        Finding::new(code, message.into(), Severity::Warning, kind)
    }

    pub fn at(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.subject {
            Some(subject) => write!(f, "[{}] {}: {}", self.code, subject, self.message),
            None => write!(f, "[{}] {}", self.code, self.message),
        }
    }
}
