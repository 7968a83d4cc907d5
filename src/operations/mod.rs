//! # Facade Operations
//!
//! Each submodule turns one family of requests into SQL and runs it on a
//! [`Session`](crate::db::Session). Request shapes live here so the HTTP
//! layer only deals with routing and status codes.

mod errors;

pub mod index;
pub mod select;
pub mod sequence;
pub mod table;
pub mod transaction;
pub mod view;

use serde::Serialize;

pub use errors::{OperationError, OperationResult};

/// Status message returned by mutating operations
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Message {
    pub message: String,
}

impl Message {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
