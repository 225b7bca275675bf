use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    /// Another holder owns the lock. Carries the stored lock envelope so the
    /// client can report who holds it.
    #[error("state is locked")]
    Conflict { lock: Vec<u8> },

    #[error("Not implemented")]
    UnsupportedMethod(String),

    /// The client disconnected before the store was written.
    #[error("request cancelled")]
    Cancelled,

    #[error("{0}")]
    Store(#[from] tfstate_store::StoreError),

    #[error("{0}")]
    LockParse(#[from] tfstate_types::TypeError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ServerError {
    /// HTTP status for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Conflict { .. } => StatusCode::LOCKED,
            Self::UnsupportedMethod(_) => StatusCode::NOT_IMPLEMENTED,
            Self::Cancelled => StatusCode::REQUEST_TIMEOUT,
            Self::Store(_)
            | Self::LockParse(_)
            | Self::Config(_)
            | Self::Io(_)
            | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        match self {
            Self::Conflict { lock } => (status, lock).into_response(),
            other => (status, other.to_string()).into_response(),
        }
    }
}

pub type ServerResult<T> = Result<T, ServerError>;
