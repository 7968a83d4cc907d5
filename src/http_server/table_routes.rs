//! Table HTTP Routes
//!
//! Table catalog, DDL and row mutations under `/table`.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use super::errors::ApiResult;
use super::state::DatabaseState;
use crate::db::{Row, SqlFragment};
use crate::operations::table::{
    self, ColumnDef, CreateTableRequest, DeleteRowRequest, InsertRowRequest, ModifyTableRequest,
    RowsAffected, TableRequest, UpdateRowRequest,
};
use crate::operations::Message;

// ==================
// Request/Response Types
// ==================

#[derive(Debug, Deserialize)]
pub struct TableNameQuery {
    pub table_name: SqlFragment,
}

#[derive(Debug, Serialize)]
pub struct TablesResponse {
    pub tables: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct SchemaResponse {
    pub schema: Vec<ColumnDef>,
}

#[derive(Debug, Serialize)]
pub struct DataResponse {
    pub data: Vec<Row>,
}

// ==================
// Table Routes
// ==================

/// Create table routes
pub fn table_routes(state: Arc<DatabaseState>) -> Router {
    Router::new()
        .route("/tables", get(list_tables_handler))
        .route("/get_table_schema", get(get_table_schema_handler))
        .route("/get_table_data", get(get_table_data_handler))
        .route("/create_table", post(create_table_handler))
        .route("/delete_table", delete(delete_table_handler))
        .route("/modify_table", put(modify_table_handler))
        .route("/insert_row", post(insert_row_handler))
        .route("/update_row", put(update_row_handler))
        .route("/delete_row", delete(delete_row_handler))
        .with_state(state)
}

// ==================
// Catalog Handlers
// ==================

async fn list_tables_handler(
    State(state): State<Arc<DatabaseState>>,
) -> ApiResult<Json<TablesResponse>> {
    let mut session = state.session().await?;
    let tables = table::list_tables(session.as_mut()).await?;
    Ok(Json(TablesResponse { tables }))
}

async fn get_table_schema_handler(
    State(state): State<Arc<DatabaseState>>,
    Query(query): Query<TableNameQuery>,
) -> ApiResult<Json<SchemaResponse>> {
    let mut session = state.session().await?;
    let schema = table::table_schema(session.as_mut(), &query.table_name).await?;
    Ok(Json(SchemaResponse { schema }))
}

async fn get_table_data_handler(
    State(state): State<Arc<DatabaseState>>,
    Query(query): Query<TableNameQuery>,
) -> ApiResult<Json<DataResponse>> {
    let mut session = state.session().await?;
    let data = table::table_data(session.as_mut(), &query.table_name).await?;
    Ok(Json(DataResponse { data }))
}

// ==================
// DDL Handlers
// ==================

async fn create_table_handler(
    State(state): State<Arc<DatabaseState>>,
    Json(request): Json<CreateTableRequest>,
) -> ApiResult<Json<Message>> {
    let mut session = state.session().await?;
    Ok(Json(table::create_table(session.as_mut(), &request).await?))
}

async fn delete_table_handler(
    State(state): State<Arc<DatabaseState>>,
    Json(request): Json<TableRequest>,
) -> ApiResult<Json<Message>> {
    let mut session = state.session().await?;
    Ok(Json(
        table::delete_table(session.as_mut(), &request.table_name).await?,
    ))
}

async fn modify_table_handler(
    State(state): State<Arc<DatabaseState>>,
    Json(request): Json<ModifyTableRequest>,
) -> ApiResult<Json<Message>> {
    let mut session = state.session().await?;
    Ok(Json(table::modify_table(session.as_mut(), &request).await?))
}

// ==================
// Row Handlers
// ==================

async fn insert_row_handler(
    State(state): State<Arc<DatabaseState>>,
    Json(request): Json<InsertRowRequest>,
) -> ApiResult<Json<RowsAffected>> {
    let mut session = state.session().await?;
    Ok(Json(table::insert_row(session.as_mut(), &request).await?))
}

async fn update_row_handler(
    State(state): State<Arc<DatabaseState>>,
    Json(request): Json<UpdateRowRequest>,
) -> ApiResult<Json<RowsAffected>> {
    let mut session = state.session().await?;
    Ok(Json(table::update_row(session.as_mut(), &request).await?))
}

async fn delete_row_handler(
    State(state): State<Arc<DatabaseState>>,
    Json(request): Json<DeleteRowRequest>,
) -> ApiResult<Json<RowsAffected>> {
    let mut session = state.session().await?;
    Ok(Json(table::delete_row(session.as_mut(), &request).await?))
}
