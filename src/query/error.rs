use thiserror::Error;

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),

    #[error("Unsupported operator: {0}")]
    UnsupportedOperator(String),

    #[error("Unknown field: {0}")]
    UnknownField(String),
}
