//! # Database Errors
//!
//! Error types for the database client layer.

use thiserror::Error;

/// Result type for database operations
pub type DbResult<T> = Result<T, DbError>;

/// Database client errors
#[derive(Debug, Error)]
pub enum DbError {
    /// Connection settings could not be used
    #[error("Configuration error: {0}")]
    Config(String),

    /// No connection could be obtained from the pool
    #[error("Connection unavailable: {0}")]
    Unavailable(String),

    /// The server rejected the statement; carries the server's own message
    #[error("{0}")]
    Execution(String),

    /// A returned row could not be converted to JSON
    #[error("Failed to decode row: {0}")]
    Decode(String),
}

impl From<tokio_postgres::Error> for DbError {
    fn from(err: tokio_postgres::Error) -> Self {
        match err.as_db_error() {
            Some(db_err) => DbError::Execution(db_err.to_string()),
            None if err.is_closed() => DbError::Unavailable(err.to_string()),
            None => DbError::Execution(postgres_message(&err)),
        }
    }
}

impl From<deadpool_postgres::PoolError> for DbError {
    fn from(err: deadpool_postgres::PoolError) -> Self {
        DbError::Unavailable(err.to_string())
    }
}

/// Flatten a driver error and its sources into one line. Parameter
/// conversion failures only say what went wrong in the source chain.
fn postgres_message(err: &tokio_postgres::Error) -> String {
    let mut message = err.to_string();
    let mut source = std::error::Error::source(err);
    while let Some(cause) = source {
        let text = cause.to_string();
        if !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = cause.source();
    }
    message
}
