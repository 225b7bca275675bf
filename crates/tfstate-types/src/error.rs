use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid lock payload: {0}")]
    LockParse(String),

    #[error("error parsing \"{field}\" from {payload}")]
    MissingLockField { field: &'static str, payload: String },
}

/// Result alias for type operations.
pub type TypeResult<T> = Result<T, TypeError>;
