//! # Database Access
//!
//! The `Database`/`Session` seam every operation runs against, plus the
//! statement builder and the PostgreSQL implementation behind it.

mod errors;
mod fragment;
mod param;
mod pool;
mod scripted;
mod statement;

use async_trait::async_trait;
use serde_json::{Map, Value};

pub use errors::{DbError, DbResult};
pub use fragment::{quote_literal, SqlFragment};
pub use param::JsonParam;
pub use pool::{PgDatabase, PgSession};
pub use scripted::ScriptedDatabase;
pub use statement::{render_literal, Statement};

/// One result row, keyed by column name in select-list order
pub type Row = Map<String, Value>;

/// Source of database sessions
#[async_trait]
pub trait Database: Send + Sync {
    /// Check out a session. Statements on one session share a connection,
    /// so transaction state carries between them.
    async fn session(&self) -> DbResult<Box<dyn Session>>;
}

/// A connection checked out for the duration of one request
#[async_trait]
pub trait Session: Send {
    /// Run a row-returning statement
    async fn query(&mut self, statement: &Statement) -> DbResult<Vec<Row>>;

    /// Run a command and return the affected-row count
    async fn execute(&mut self, statement: &Statement) -> DbResult<u64>;
}
