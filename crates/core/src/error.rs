use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid data: {0}")]
    InvalidData(String),

    #[error("duplicate column header: {0}")]
    DuplicateHeader(String),

    #[error("import failed for {path}: {reason}")]
    Import { path: String, reason: String },

    #[error("state invariant violated: {0}")]
    InvariantViolation(String),
}
