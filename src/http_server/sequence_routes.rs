//! Sequence HTTP Routes

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::Serialize;
use serde_json::Value;

use super::errors::ApiResult;
use super::state::DatabaseState;
use crate::db::{Row, SqlFragment};
use crate::operations::sequence::{
    self, ColumnRef, CreateSequenceRequest, CreatedSequence, RestartRequest, SetValueRequest,
};
use crate::operations::Message;

// ==================
// Response Types
// ==================

#[derive(Debug, Serialize)]
pub struct SequencesResponse {
    pub sequences: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct NextValueResponse {
    pub next_value: Value,
}

#[derive(Debug, Serialize)]
pub struct CurrentValueResponse {
    pub current_value: Value,
}

#[derive(Debug, Serialize)]
pub struct NewValueResponse {
    pub new_value: Value,
}

#[derive(Debug, Serialize)]
pub struct ResetResponse {
    pub new_sequence_value: Value,
}

// ==================
// Sequence Routes
// ==================

/// Create sequence routes
pub fn sequence_routes(state: Arc<DatabaseState>) -> Router {
    Router::new()
        .route("/create", post(create_handler))
        .route("/list", get(list_handler))
        .route("/reset_table", post(reset_table_handler))
        .route("/{seq_name}/next", get(next_handler))
        .route("/{seq_name}/current", get(current_handler))
        .route("/{seq_name}/set", put(set_handler))
        .route("/{seq_name}/restart", put(restart_handler))
        .route("/{seq_name}/drop", delete(drop_handler))
        .route("/{seq_name}/details", get(details_handler))
        .route("/{seq_name}/associate", post(associate_handler))
        .with_state(state)
}

async fn create_handler(
    State(state): State<Arc<DatabaseState>>,
    Json(request): Json<CreateSequenceRequest>,
) -> ApiResult<Json<CreatedSequence>> {
    let mut session = state.session().await?;
    Ok(Json(
        sequence::create_sequence(session.as_mut(), &request).await?,
    ))
}

async fn list_handler(State(state): State<Arc<DatabaseState>>) -> ApiResult<Json<SequencesResponse>> {
    let mut session = state.session().await?;
    let sequences = sequence::list_sequences(session.as_mut()).await?;
    Ok(Json(SequencesResponse { sequences }))
}

async fn next_handler(
    State(state): State<Arc<DatabaseState>>,
    Path(seq_name): Path<SqlFragment>,
) -> ApiResult<Json<NextValueResponse>> {
    let mut session = state.session().await?;
    let next_value = sequence::next_value(session.as_mut(), &seq_name).await?;
    Ok(Json(NextValueResponse { next_value }))
}

async fn current_handler(
    State(state): State<Arc<DatabaseState>>,
    Path(seq_name): Path<SqlFragment>,
) -> ApiResult<Json<CurrentValueResponse>> {
    let mut session = state.session().await?;
    let current_value = sequence::current_value(session.as_mut(), &seq_name).await?;
    Ok(Json(CurrentValueResponse { current_value }))
}

async fn set_handler(
    State(state): State<Arc<DatabaseState>>,
    Path(seq_name): Path<SqlFragment>,
    Json(request): Json<SetValueRequest>,
) -> ApiResult<Json<NewValueResponse>> {
    let mut session = state.session().await?;
    let new_value = sequence::set_value(session.as_mut(), &seq_name, request.value).await?;
    Ok(Json(NewValueResponse { new_value }))
}

async fn restart_handler(
    State(state): State<Arc<DatabaseState>>,
    Path(seq_name): Path<SqlFragment>,
    Json(request): Json<RestartRequest>,
) -> ApiResult<Json<Message>> {
    let mut session = state.session().await?;
    Ok(Json(
        sequence::restart_sequence(session.as_mut(), &seq_name, request.start_with).await?,
    ))
}

async fn drop_handler(
    State(state): State<Arc<DatabaseState>>,
    Path(seq_name): Path<SqlFragment>,
) -> ApiResult<Json<Message>> {
    let mut session = state.session().await?;
    Ok(Json(
        sequence::drop_sequence(session.as_mut(), &seq_name).await?,
    ))
}

async fn details_handler(
    State(state): State<Arc<DatabaseState>>,
    Path(seq_name): Path<SqlFragment>,
) -> ApiResult<Json<Row>> {
    let mut session = state.session().await?;
    Ok(Json(
        sequence::sequence_details(session.as_mut(), &seq_name).await?,
    ))
}

async fn associate_handler(
    State(state): State<Arc<DatabaseState>>,
    Path(seq_name): Path<SqlFragment>,
    Json(owner): Json<ColumnRef>,
) -> ApiResult<Json<Message>> {
    let mut session = state.session().await?;
    Ok(Json(
        sequence::associate_sequence(session.as_mut(), &seq_name, &owner).await?,
    ))
}

async fn reset_table_handler(
    State(state): State<Arc<DatabaseState>>,
    Json(owner): Json<ColumnRef>,
) -> ApiResult<Json<ResetResponse>> {
    let mut session = state.session().await?;
    let new_sequence_value = sequence::reset_for_table(session.as_mut(), &owner).await?;
    Ok(Json(ResetResponse { new_sequence_value }))
}
