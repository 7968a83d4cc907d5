//! Transaction HTTP Routes
//!
//! One POST route per control verb under `/transactions`, plus
//! `/transactions/sequence` for running several verbs on one connection.
//!
//! Each request gets its own pooled session. Anything the request leaves
//! open is rolled back before the session is released, so a lone `begin`
//! has no lasting effect; use `/sequence` to group verbs.

use std::sync::Arc;

use axum::{
    extract::State,
    routing::{post, MethodRouter},
    Json, Router,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::errors::ApiResult;
use super::state::DatabaseState;
use crate::db::SqlFragment;
use crate::operations::transaction::{IsolationLevel, Outcome, TransactionOp, TransactionRunner};

type Op = TransactionOp;

// ==================
// Request/Response Types
// ==================

#[derive(Debug, Deserialize)]
pub struct SavepointRequest {
    pub savepoint_name: SqlFragment,
}

#[derive(Debug, Deserialize)]
pub struct IsolationRequest {
    pub isolation_level: IsolationLevel,
}

#[derive(Debug, Deserialize)]
pub struct LockTableRequest {
    pub table_name: SqlFragment,
}

#[derive(Debug, Deserialize)]
pub struct SnapshotRequest {
    pub snapshot_id: String,
}

#[derive(Debug, Deserialize)]
pub struct PreparedTransactionRequest {
    pub transaction_id: String,
}

#[derive(Debug, Deserialize)]
pub struct ChannelRequest {
    pub channel_name: SqlFragment,
}

#[derive(Debug, Deserialize)]
pub struct NotifyRequest {
    pub channel_name: SqlFragment,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct AdvisoryLockRequest {
    pub key: i64,
}

#[derive(Debug, Deserialize)]
pub struct SequenceRequest {
    pub steps: Vec<TransactionOp>,
}

#[derive(Debug, Serialize)]
pub struct SequenceResponse {
    pub results: Vec<Outcome>,
}

// ==================
// Transaction Routes
// ==================

/// Create transaction routes
pub fn transaction_routes(state: Arc<DatabaseState>) -> Router {
    Router::new()
        // Transaction control
        .route("/begin", verb(Op::Begin))
        .route("/commit", verb(Op::Commit))
        .route("/rollback", verb(Op::Rollback))
        .route("/end", verb(Op::End))
        .route("/abort", verb(Op::Abort))
        // Savepoints
        .route(
            "/savepoint",
            verb_with(|r: SavepointRequest| Op::Savepoint {
                savepoint_name: r.savepoint_name,
            }),
        )
        .route(
            "/rollback_to_savepoint",
            verb_with(|r: SavepointRequest| Op::RollbackToSavepoint {
                savepoint_name: r.savepoint_name,
            }),
        )
        .route(
            "/release_savepoint",
            verb_with(|r: SavepointRequest| Op::ReleaseSavepoint {
                savepoint_name: r.savepoint_name,
            }),
        )
        // Isolation
        .route(
            "/set_transaction_isolation",
            verb_with(|r: IsolationRequest| Op::SetTransactionIsolation {
                isolation_level: r.isolation_level,
            }),
        )
        .route(
            "/set_session_isolation",
            verb_with(|r: IsolationRequest| Op::SetSessionIsolation {
                isolation_level: r.isolation_level,
            }),
        )
        // Locking
        .route(
            "/lock_table",
            verb_with(|r: LockTableRequest| Op::LockTable {
                table_name: r.table_name,
            }),
        )
        // Snapshots
        .route(
            "/set_snapshot",
            verb_with(|r: SnapshotRequest| Op::SetSnapshot {
                snapshot_id: r.snapshot_id,
            }),
        )
        .route("/export_snapshot", verb(Op::ExportSnapshot))
        // Two-phase commit
        .route(
            "/prepare_transaction",
            verb_with(|r: PreparedTransactionRequest| Op::PrepareTransaction {
                transaction_id: r.transaction_id,
            }),
        )
        .route(
            "/commit_prepared",
            verb_with(|r: PreparedTransactionRequest| Op::CommitPrepared {
                transaction_id: r.transaction_id,
            }),
        )
        .route(
            "/rollback_prepared",
            verb_with(|r: PreparedTransactionRequest| Op::RollbackPrepared {
                transaction_id: r.transaction_id,
            }),
        )
        // Notifications
        .route(
            "/listen",
            verb_with(|r: ChannelRequest| Op::Listen {
                channel_name: r.channel_name,
            }),
        )
        .route(
            "/notify",
            verb_with(|r: NotifyRequest| Op::Notify {
                channel_name: r.channel_name,
                message: r.message,
            }),
        )
        .route(
            "/unlisten",
            verb_with(|r: ChannelRequest| Op::Unlisten {
                channel_name: r.channel_name,
            }),
        )
        // Advisory locks
        .route(
            "/advisory_lock",
            verb_with(|r: AdvisoryLockRequest| Op::AdvisoryLock { key: r.key }),
        )
        .route(
            "/advisory_unlock",
            verb_with(|r: AdvisoryLockRequest| Op::AdvisoryUnlock { key: r.key }),
        )
        .route(
            "/advisory_xact_lock",
            verb_with(|r: AdvisoryLockRequest| Op::AdvisoryXactLock { key: r.key }),
        )
        .route("/advisory_unlock_all", verb(Op::AdvisoryUnlockAll))
        // Several verbs on one connection
        .route("/sequence", post(sequence_handler))
        .with_state(state)
}

// ==================
// Helper Functions
// ==================

/// Route for a verb that takes no body
fn verb(op: TransactionOp) -> MethodRouter<Arc<DatabaseState>> {
    post(move |State(state): State<Arc<DatabaseState>>| async move { run_one(&state, op).await })
}

/// Route for a verb built from a JSON body
fn verb_with<B, F>(make: F) -> MethodRouter<Arc<DatabaseState>>
where
    B: DeserializeOwned + Send + 'static,
    F: Fn(B) -> TransactionOp + Clone + Send + Sync + 'static,
{
    post(
        move |State(state): State<Arc<DatabaseState>>, Json(body): Json<B>| async move {
            run_one(&state, make(body)).await
        },
    )
}

async fn run_one(state: &DatabaseState, op: TransactionOp) -> ApiResult<Json<Outcome>> {
    let mut session = state.session().await?;
    let mut runner = TransactionRunner::new(session.as_mut());
    let result = runner.run(&op).await;
    runner.finish().await;
    Ok(Json(result?))
}

// ==================
// Sequence Handler
// ==================

async fn sequence_handler(
    State(state): State<Arc<DatabaseState>>,
    Json(request): Json<SequenceRequest>,
) -> ApiResult<Json<SequenceResponse>> {
    let mut session = state.session().await?;
    let mut runner = TransactionRunner::new(session.as_mut());
    let result = runner.run_all(&request.steps).await;
    runner.finish().await;
    Ok(Json(SequenceResponse { results: result? }))
}
