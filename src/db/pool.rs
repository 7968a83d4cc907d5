//! # PostgreSQL Connection Pool
//!
//! `Database` implementation over a `deadpool-postgres` pool. One pooled
//! client is checked out per session and returned when the session drops.

use std::str::FromStr;

use async_trait::async_trait;
use deadpool_postgres::{Manager, ManagerConfig, Object, Pool, RecyclingMethod};
use serde_json::Value;
use tokio_postgres::types::ToSql;
use tokio_postgres::NoTls;
use tracing::debug;

use super::errors::{DbError, DbResult};
use super::param::JsonParam;
use super::statement::Statement;
use super::{Database, Row, Session};

/// Pooled PostgreSQL database
pub struct PgDatabase {
    pool: Pool,
}

impl PgDatabase {
    /// Build a pool for `url`. No connection is opened until the first
    /// session is requested.
    pub fn connect(url: &str, pool_size: usize) -> DbResult<Self> {
        let config = tokio_postgres::Config::from_str(url)
            .map_err(|e| DbError::Config(format!("Invalid database url: {e}")))?;

        // Clean recycling drops LISTEN registrations and session advisory
        // locks before a client is handed to the next request.
        let manager_config = ManagerConfig {
            recycling_method: RecyclingMethod::Clean,
        };
        let manager = Manager::from_config(config, NoTls, manager_config);

        let pool = Pool::builder(manager)
            .max_size(pool_size)
            .build()
            .map_err(|e| DbError::Config(format!("Failed to create pool: {e}")))?;

        Ok(Self { pool })
    }
}

#[async_trait]
impl Database for PgDatabase {
    async fn session(&self) -> DbResult<Box<dyn Session>> {
        let client = self.pool.get().await?;
        Ok(Box::new(PgSession { client }))
    }
}

/// A single pooled connection
pub struct PgSession {
    client: Object,
}

#[async_trait]
impl Session for PgSession {
    async fn query(&mut self, statement: &Statement) -> DbResult<Vec<Row>> {
        debug!(sql = %statement.render(), "query");

        // Every row comes back as one json value so column order and types
        // the driver cannot decode natively (numeric, intervals, ...) survive.
        let wrapped = format!("SELECT row_to_json(q) FROM ({}) AS q", statement.sql());
        let params = bind(statement);
        let refs = param_refs(&params);

        let rows = self.client.query(wrapped.as_str(), &refs).await?;
        rows.iter().map(decode_row).collect()
    }

    async fn execute(&mut self, statement: &Statement) -> DbResult<u64> {
        debug!(sql = %statement.render(), "execute");

        let params = bind(statement);
        let refs = param_refs(&params);

        Ok(self.client.execute(statement.sql(), &refs).await?)
    }
}

fn bind(statement: &Statement) -> Vec<JsonParam<'_>> {
    statement.params().iter().map(JsonParam).collect()
}

fn param_refs<'a>(params: &'a [JsonParam<'a>]) -> Vec<&'a (dyn ToSql + Sync)> {
    params.iter().map(|p| p as &(dyn ToSql + Sync)).collect()
}

fn decode_row(row: &tokio_postgres::Row) -> DbResult<Row> {
    let value: Value = row
        .try_get(0)
        .map_err(|e| DbError::Decode(e.to_string()))?;

    match value {
        Value::Object(map) => Ok(map),
        other => Err(DbError::Decode(format!("expected a json object, got {other}"))),
    }
}
