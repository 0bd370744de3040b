use crate::report::finding::Finding;
use thiserror::Error;

/// Errors raised while loading a mapping contract.
#[derive(Debug, Error)]
pub enum ContractError {
    #[error("Failed to read contract {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Contract is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// At least one finding has error severity.
    #[error("Contract has {} error(s); first: {}", errors(.0), first_error(.0))]
    Invalid(Vec<Finding>),
}

fn errors(findings: &[Finding]) -> usize {
    findings.iter().filter(|f| f.is_error()).count()
}

fn first_error(findings: &[Finding]) -> String {
    findings
        .iter()
        .find(|f| f.is_error())
        .map(ToString::to_string)
        .unwrap_or_default()
}

impl ContractError {
    pub fn findings(&self) -> &[Finding] {
        match self {
            ContractError::Invalid(findings) => findings,
            _ => &[],
        }
    }
}
