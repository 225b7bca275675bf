/// Errors from state store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Failure reported by SQLite (open, prepare, query, exec, commit).
    #[error("{0}")]
    Sqlite(#[from] rusqlite::Error),

    /// A table or column name that cannot be used as an SQL identifier.
    #[error("invalid schema identifier {name:?}: {reason}")]
    InvalidSchema { name: String, reason: &'static str },

    /// A thread panicked while holding the store's lock.
    #[error("{0} lock poisoned")]
    Poisoned(&'static str),

    /// I/O error preparing the database location.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
