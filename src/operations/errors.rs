//! # Operation Errors
//!
//! Failures raised while turning a request into SQL and running it.

use thiserror::Error;

use crate::db::DbError;

/// Result type for facade operations
pub type OperationResult<T> = Result<T, OperationError>;

/// Operation errors
#[derive(Debug, Error)]
pub enum OperationError {
    /// Request rejected before any SQL was sent
    #[error("{0}")]
    Validation(String),

    /// The named table does not exist
    #[error("Table '{0}' not found")]
    TableNotFound(String),

    /// One step of a multi-statement transaction run failed
    #[error("Step {index} failed: {source}")]
    StepFailed {
        index: usize,
        source: Box<OperationError>,
    },

    /// The database rejected or could not run the statement
    #[error(transparent)]
    Database(#[from] DbError),
}

impl OperationError {
    pub fn validation(message: impl Into<String>) -> Self {
        OperationError::Validation(message.into())
    }

    /// The error that actually caused the failure, looking through step
    /// wrappers.
    pub fn root(&self) -> &OperationError {
        match self {
            OperationError::StepFailed { source, .. } => source.root(),
            other => other,
        }
    }
}
