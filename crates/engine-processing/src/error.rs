use connectors::xml::XmlError;
use expression_engine::ExpressionError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProcessingError {
    #[error("Failed to parse XML: {0}")]
    Parse(#[from] XmlError),

    #[error("Invalid expression for {table}.{column}: {source}")]
    Expression {
        table: String,
        column: String,
        #[source]
        source: ExpressionError,
    },

    #[error("Calculated field {table}.{column} has no expression")]
    MissingExpression { table: String, column: String },

    #[error("Document has no usable app_id")]
    MissingAppId,

    #[error("Mapping produced no rows for app_id {app_id}")]
    EmptyResult { app_id: i64 },
}
