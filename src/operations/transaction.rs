//! # Transaction Control
//!
//! Every control verb is one SQL statement issued on the caller's session.
//! The server enforces transactional legality; this module only tracks
//! whether a transaction may still be open so the session can be rolled
//! back before its connection is reused.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use super::{OperationError, OperationResult};
use crate::db::{quote_literal, DbError, Session, SqlFragment, Statement};

/// Standard isolation levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IsolationLevel {
    #[serde(rename = "READ UNCOMMITTED")]
    ReadUncommitted,
    #[serde(rename = "READ COMMITTED")]
    ReadCommitted,
    #[serde(rename = "REPEATABLE READ")]
    RepeatableRead,
    #[serde(rename = "SERIALIZABLE")]
    Serializable,
}

impl IsolationLevel {
    pub fn as_sql(&self) -> &'static str {
        match self {
            IsolationLevel::ReadUncommitted => "READ UNCOMMITTED",
            IsolationLevel::ReadCommitted => "READ COMMITTED",
            IsolationLevel::RepeatableRead => "REPEATABLE READ",
            IsolationLevel::Serializable => "SERIALIZABLE",
        }
    }
}

/// One transaction-control verb
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum TransactionOp {
    Begin,
    Commit,
    Rollback,
    /// Same as `Commit`
    End,
    /// Same as `Rollback`
    Abort,
    Savepoint {
        savepoint_name: SqlFragment,
    },
    RollbackToSavepoint {
        savepoint_name: SqlFragment,
    },
    ReleaseSavepoint {
        savepoint_name: SqlFragment,
    },
    SetTransactionIsolation {
        isolation_level: IsolationLevel,
    },
    SetSessionIsolation {
        isolation_level: IsolationLevel,
    },
    LockTable {
        table_name: SqlFragment,
    },
    SetSnapshot {
        snapshot_id: String,
    },
    ExportSnapshot,
    PrepareTransaction {
        transaction_id: String,
    },
    CommitPrepared {
        transaction_id: String,
    },
    RollbackPrepared {
        transaction_id: String,
    },
    Listen {
        channel_name: SqlFragment,
    },
    Notify {
        channel_name: SqlFragment,
        #[serde(default)]
        message: String,
    },
    Unlisten {
        channel_name: SqlFragment,
    },
    AdvisoryLock {
        key: i64,
    },
    AdvisoryUnlock {
        key: i64,
    },
    AdvisoryXactLock {
        key: i64,
    },
    AdvisoryUnlockAll,
    /// Arbitrary trusted SQL, run as-is
    Statement {
        sql: SqlFragment,
    },
}

/// What a verb did
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Outcome {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapshot_id: Option<String>,
}

impl Outcome {
    fn message(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            snapshot_id: None,
        }
    }
}

/// Transaction state as far as the issued verbs tell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TxState {
    Idle,
    Open,
    /// A raw statement ran; it may have opened or closed a transaction
    Unknown,
}

impl TransactionOp {
    /// The statement this verb sends
    pub fn statement(&self) -> Statement {
        match self {
            TransactionOp::Begin => Statement::raw("BEGIN"),
            TransactionOp::Commit | TransactionOp::End => Statement::raw("COMMIT"),
            TransactionOp::Rollback | TransactionOp::Abort => Statement::raw("ROLLBACK"),
            TransactionOp::Savepoint { savepoint_name } => {
                Statement::raw(format!("SAVEPOINT {savepoint_name}"))
            }
            TransactionOp::RollbackToSavepoint { savepoint_name } => {
                Statement::raw(format!("ROLLBACK TO SAVEPOINT {savepoint_name}"))
            }
            TransactionOp::ReleaseSavepoint { savepoint_name } => {
                Statement::raw(format!("RELEASE SAVEPOINT {savepoint_name}"))
            }
            TransactionOp::SetTransactionIsolation { isolation_level } => Statement::raw(format!(
                "SET TRANSACTION ISOLATION LEVEL {}",
                isolation_level.as_sql()
            )),
            TransactionOp::SetSessionIsolation { isolation_level } => Statement::raw(format!(
                "SET SESSION CHARACTERISTICS AS TRANSACTION ISOLATION LEVEL {}",
                isolation_level.as_sql()
            )),
            TransactionOp::LockTable { table_name } => {
                Statement::raw(format!("LOCK TABLE {table_name}"))
            }
            TransactionOp::SetSnapshot { snapshot_id } => Statement::raw(format!(
                "SET TRANSACTION SNAPSHOT {}",
                quote_literal(snapshot_id)
            )),
            TransactionOp::ExportSnapshot => {
                Statement::raw("SELECT pg_export_snapshot() AS snapshot_id")
            }
            TransactionOp::PrepareTransaction { transaction_id } => Statement::raw(format!(
                "PREPARE TRANSACTION {}",
                quote_literal(transaction_id)
            )),
            TransactionOp::CommitPrepared { transaction_id } => Statement::raw(format!(
                "COMMIT PREPARED {}",
                quote_literal(transaction_id)
            )),
            TransactionOp::RollbackPrepared { transaction_id } => Statement::raw(format!(
                "ROLLBACK PREPARED {}",
                quote_literal(transaction_id)
            )),
            TransactionOp::Listen { channel_name } => {
                Statement::raw(format!("LISTEN {channel_name}"))
            }
            TransactionOp::Notify {
                channel_name,
                message,
            } => Statement::raw(format!("NOTIFY {channel_name}, {}", quote_literal(message))),
            TransactionOp::Unlisten { channel_name } => {
                Statement::raw(format!("UNLISTEN {channel_name}"))
            }
            TransactionOp::AdvisoryLock { key } => advisory("pg_advisory_lock", *key),
            TransactionOp::AdvisoryUnlock { key } => advisory("pg_advisory_unlock", *key),
            TransactionOp::AdvisoryXactLock { key } => advisory("pg_advisory_xact_lock", *key),
            TransactionOp::AdvisoryUnlockAll => Statement::raw("SELECT pg_advisory_unlock_all()"),
            TransactionOp::Statement { sql } => Statement::raw(sql.as_str()),
        }
    }

    fn success_message(&self) -> String {
        match self {
            TransactionOp::Begin => "Transaction begun".to_string(),
            TransactionOp::Commit | TransactionOp::End => "Transaction committed".to_string(),
            TransactionOp::Rollback | TransactionOp::Abort => {
                "Transaction rolled back".to_string()
            }
            TransactionOp::Savepoint { savepoint_name } => {
                format!("Savepoint '{savepoint_name}' created")
            }
            TransactionOp::RollbackToSavepoint { savepoint_name } => {
                format!("Rolled back to savepoint '{savepoint_name}'")
            }
            TransactionOp::ReleaseSavepoint { savepoint_name } => {
                format!("Savepoint '{savepoint_name}' released")
            }
            TransactionOp::SetTransactionIsolation { isolation_level } => format!(
                "Transaction isolation level set to {}",
                isolation_level.as_sql()
            ),
            TransactionOp::SetSessionIsolation { isolation_level } => format!(
                "Session isolation level set to {}",
                isolation_level.as_sql()
            ),
            TransactionOp::LockTable { table_name } => format!("Table '{table_name}' locked"),
            TransactionOp::SetSnapshot { snapshot_id } => {
                format!("Transaction snapshot set to '{snapshot_id}'")
            }
            TransactionOp::ExportSnapshot => "Snapshot exported".to_string(),
            TransactionOp::PrepareTransaction { transaction_id } => {
                format!("Transaction prepared with id '{transaction_id}'")
            }
            TransactionOp::CommitPrepared { transaction_id } => {
                format!("Prepared transaction '{transaction_id}' committed")
            }
            TransactionOp::RollbackPrepared { transaction_id } => {
                format!("Prepared transaction '{transaction_id}' rolled back")
            }
            TransactionOp::Listen { channel_name } => {
                format!("Listening on channel '{channel_name}'")
            }
            TransactionOp::Notify {
                channel_name,
                message,
            } => format!("Notification sent on channel '{channel_name}' with message '{message}'"),
            TransactionOp::Unlisten { channel_name } => {
                format!("Stopped listening on channel '{channel_name}'")
            }
            TransactionOp::AdvisoryLock { key } => format!("Advisory lock acquired for key {key}"),
            TransactionOp::AdvisoryUnlock { key } => {
                format!("Advisory lock released for key {key}")
            }
            TransactionOp::AdvisoryXactLock { key } => {
                format!("Advisory transaction lock acquired for key {key}")
            }
            TransactionOp::AdvisoryUnlockAll => "All advisory locks released".to_string(),
            TransactionOp::Statement { .. } => "Statement executed".to_string(),
        }
    }

    /// Transaction state after this verb succeeds
    fn next_state(&self, current: TxState) -> TxState {
        match self {
            TransactionOp::Begin => TxState::Open,
            TransactionOp::Commit
            | TransactionOp::End
            | TransactionOp::Rollback
            | TransactionOp::Abort
            | TransactionOp::PrepareTransaction { .. } => TxState::Idle,
            TransactionOp::Statement { .. } => TxState::Unknown,
            _ => current,
        }
    }
}

fn advisory(func: &str, key: i64) -> Statement {
    let mut stmt = Statement::raw(format!("SELECT {func}("));
    stmt.push_param(Value::from(key));
    stmt.push_str("::bigint)");
    stmt
}

/// Runs verbs on one session and remembers whether a transaction may be
/// left open.
pub struct TransactionRunner<'a> {
    session: &'a mut dyn Session,
    state: TxState,
}

impl<'a> TransactionRunner<'a> {
    pub fn new(session: &'a mut dyn Session) -> Self {
        Self {
            session,
            state: TxState::Idle,
        }
    }

    pub async fn run(&mut self, op: &TransactionOp) -> OperationResult<Outcome> {
        let stmt = op.statement();

        if let TransactionOp::ExportSnapshot = op {
            let rows = match self.session.query(&stmt).await {
                Ok(rows) => rows,
                Err(err) => return Err(self.failed(err)),
            };
            let snapshot_id = rows
                .into_iter()
                .next()
                .and_then(|mut row| row.remove("snapshot_id"))
                .and_then(|v| v.as_str().map(str::to_string));
            return Ok(Outcome {
                message: op.success_message(),
                snapshot_id,
            });
        }

        if let Err(err) = self.session.execute(&stmt).await {
            return Err(self.failed(err));
        }

        self.state = op.next_state(self.state);
        Ok(Outcome::message(op.success_message()))
    }

    /// A failed statement inside a transaction leaves it aborted until
    /// rolled back, and outside one we cannot tell what it left behind.
    fn failed(&mut self, err: DbError) -> OperationError {
        if self.state == TxState::Idle {
            self.state = TxState::Unknown;
        }
        err.into()
    }

    /// Run `ops` in order, stopping at the first failure
    pub async fn run_all(&mut self, ops: &[TransactionOp]) -> OperationResult<Vec<Outcome>> {
        let mut outcomes = Vec::with_capacity(ops.len());
        for (index, op) in ops.iter().enumerate() {
            match self.run(op).await {
                Ok(outcome) => outcomes.push(outcome),
                Err(err) => {
                    return Err(OperationError::StepFailed {
                        index,
                        source: Box::new(err),
                    })
                }
            }
        }
        Ok(outcomes)
    }

    /// Roll back anything that may still be open. Call before the session
    /// is released.
    pub async fn finish(self) {
        if self.state == TxState::Idle {
            return;
        }
        if let Err(err) = self.session.execute(&Statement::raw("ROLLBACK")).await {
            warn!(error = %err, "failed to roll back open transaction");
        }
    }
}
