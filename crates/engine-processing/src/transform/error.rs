use expression_engine::ExpressionError;
use model::core::data_type::DataType;
use thiserror::Error;

/// How the mapper reacts to a failed stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorType {
    /// The field is treated as absent; the row survives.
    Field,
    /// The whole row is dropped.
    Row,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransformError {
    #[error("No value for critical enum '{enum_type}' (source {value:?})")]
    CriticalEnumMissing {
        enum_type: String,
        value: Option<String>,
    },

    #[error("Expression failed: {0}")]
    Expression(#[from] ExpressionError),

    #[error("Cannot convert '{value}' to {data_type}")]
    Coercion { value: String, data_type: DataType },

    #[error("Value {value} is out of range for {data_type}")]
    OutOfRange { value: String, data_type: DataType },
}

impl TransformError {
    pub fn error_type(&self) -> ErrorType {
        match self {
            TransformError::CriticalEnumMissing { .. } => ErrorType::Row,
            TransformError::Expression(_)
            | TransformError::Coercion { .. }
            | TransformError::OutOfRange { .. } => ErrorType::Field,
        }
    }
}
