//! Index and View HTTP Routes
//!
//! Index DDL plus view definition, contents and updatable-view mutations
//! under `/indexview`.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::Deserialize;

use super::errors::ApiResult;
use super::state::DatabaseState;
use crate::db::{Row, SqlFragment};
use crate::operations::index::{self, CreateIndexRequest, DropIndexRequest};
use crate::operations::view::{
    self, CreateViewRequest, DeleteViewRequest, DropViewRequest, InsertViewRequest,
    ModifyViewRequest, RefreshViewRequest, RenameViewRequest, UpdateViewRequest,
};
use crate::operations::Message;

// ==================
// Query Types
// ==================

#[derive(Debug, Deserialize)]
pub struct FilterQuery {
    /// Condition without the `WHERE` keyword
    pub condition: SqlFragment,
}

#[derive(Debug, Deserialize)]
pub struct JoinQuery {
    pub table_name: SqlFragment,
    /// Condition without the `ON` keyword
    pub condition: SqlFragment,
}

// ==================
// Index/View Routes
// ==================

/// Create index and view routes
pub fn index_view_routes(state: Arc<DatabaseState>) -> Router {
    Router::new()
        // Indexes
        .route("/index/create", post(create_index_handler))
        .route("/index/drop", post(drop_index_handler))
        .route("/index/list", get(list_indexes_handler))
        // View definitions
        .route("/view/create", post(create_view_handler))
        .route("/view/drop", post(drop_view_handler))
        .route("/view/refresh", post(refresh_view_handler))
        .route("/views/rename", put(rename_view_handler))
        .route("/views/modify", put(modify_view_handler))
        // View contents
        .route("/views", get(list_views_handler))
        .route("/views/{view_name}", get(view_data_handler))
        .route("/views/{view_name}/filter", get(filter_view_handler))
        .route("/views/{view_name}/join", get(join_view_handler))
        .route("/views/{view_name}/insert", post(insert_view_handler))
        .route("/views/{view_name}/update", put(update_view_handler))
        .route("/views/{view_name}/delete", delete(delete_view_handler))
        .route("/views/{view_name}/refresh", post(refresh_named_view_handler))
        .with_state(state)
}

// ==================
// Index Handlers
// ==================

async fn create_index_handler(
    State(state): State<Arc<DatabaseState>>,
    Json(request): Json<CreateIndexRequest>,
) -> ApiResult<Json<Message>> {
    let mut session = state.session().await?;
    Ok(Json(index::create_index(session.as_mut(), &request).await?))
}

async fn drop_index_handler(
    State(state): State<Arc<DatabaseState>>,
    Json(request): Json<DropIndexRequest>,
) -> ApiResult<Json<Message>> {
    let mut session = state.session().await?;
    Ok(Json(
        index::drop_index(session.as_mut(), &request.index_name).await?,
    ))
}

async fn list_indexes_handler(
    State(state): State<Arc<DatabaseState>>,
) -> ApiResult<Json<Vec<Row>>> {
    let mut session = state.session().await?;
    Ok(Json(index::list_indexes(session.as_mut()).await?))
}

// ==================
// View Definition Handlers
// ==================

async fn create_view_handler(
    State(state): State<Arc<DatabaseState>>,
    Json(request): Json<CreateViewRequest>,
) -> ApiResult<Json<Message>> {
    let mut session = state.session().await?;
    Ok(Json(view::create_view(session.as_mut(), &request).await?))
}

async fn drop_view_handler(
    State(state): State<Arc<DatabaseState>>,
    Json(request): Json<DropViewRequest>,
) -> ApiResult<Json<Message>> {
    let mut session = state.session().await?;
    Ok(Json(view::drop_view(session.as_mut(), &request).await?))
}

async fn refresh_view_handler(
    State(state): State<Arc<DatabaseState>>,
    Json(request): Json<RefreshViewRequest>,
) -> ApiResult<Json<Message>> {
    let mut session = state.session().await?;
    Ok(Json(
        view::refresh_view(session.as_mut(), &request.view_name).await?,
    ))
}

async fn refresh_named_view_handler(
    State(state): State<Arc<DatabaseState>>,
    Path(view_name): Path<SqlFragment>,
) -> ApiResult<Json<Message>> {
    let mut session = state.session().await?;
    Ok(Json(view::refresh_view(session.as_mut(), &view_name).await?))
}

async fn rename_view_handler(
    State(state): State<Arc<DatabaseState>>,
    Json(request): Json<RenameViewRequest>,
) -> ApiResult<Json<Message>> {
    let mut session = state.session().await?;
    Ok(Json(view::rename_view(session.as_mut(), &request).await?))
}

async fn modify_view_handler(
    State(state): State<Arc<DatabaseState>>,
    Json(request): Json<ModifyViewRequest>,
) -> ApiResult<Json<Message>> {
    let mut session = state.session().await?;
    Ok(Json(view::modify_view(session.as_mut(), &request).await?))
}

// ==================
// View Content Handlers
// ==================

async fn list_views_handler(State(state): State<Arc<DatabaseState>>) -> ApiResult<Json<Vec<Row>>> {
    let mut session = state.session().await?;
    Ok(Json(view::list_views(session.as_mut()).await?))
}

async fn view_data_handler(
    State(state): State<Arc<DatabaseState>>,
    Path(view_name): Path<SqlFragment>,
) -> ApiResult<Json<Vec<Row>>> {
    let mut session = state.session().await?;
    Ok(Json(view::view_data(session.as_mut(), &view_name).await?))
}

async fn filter_view_handler(
    State(state): State<Arc<DatabaseState>>,
    Path(view_name): Path<SqlFragment>,
    Query(query): Query<FilterQuery>,
) -> ApiResult<Json<Vec<Row>>> {
    let mut session = state.session().await?;
    Ok(Json(
        view::filter_view(session.as_mut(), &view_name, &query.condition).await?,
    ))
}

async fn join_view_handler(
    State(state): State<Arc<DatabaseState>>,
    Path(view_name): Path<SqlFragment>,
    Query(query): Query<JoinQuery>,
) -> ApiResult<Json<Vec<Row>>> {
    let mut session = state.session().await?;
    Ok(Json(
        view::join_view(session.as_mut(), &view_name, &query.table_name, &query.condition)
            .await?,
    ))
}

async fn insert_view_handler(
    State(state): State<Arc<DatabaseState>>,
    Path(view_name): Path<SqlFragment>,
    Json(request): Json<InsertViewRequest>,
) -> ApiResult<Json<Message>> {
    let mut session = state.session().await?;
    Ok(Json(
        view::insert_into_view(session.as_mut(), &view_name, &request).await?,
    ))
}

async fn update_view_handler(
    State(state): State<Arc<DatabaseState>>,
    Path(view_name): Path<SqlFragment>,
    Json(request): Json<UpdateViewRequest>,
) -> ApiResult<Json<Message>> {
    let mut session = state.session().await?;
    Ok(Json(
        view::update_view(session.as_mut(), &view_name, &request).await?,
    ))
}

async fn delete_view_handler(
    State(state): State<Arc<DatabaseState>>,
    Path(view_name): Path<SqlFragment>,
    Json(request): Json<DeleteViewRequest>,
) -> ApiResult<Json<Message>> {
    let mut session = state.session().await?;
    Ok(Json(
        view::delete_from_view(session.as_mut(), &view_name, &request).await?,
    ))
}
