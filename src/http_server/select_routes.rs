//! Select HTTP Routes

use std::sync::Arc;

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};

use super::errors::ApiResult;
use super::state::DatabaseState;
use crate::operations::select::{self, SelectOutput, SelectQuery};
use crate::operations::table;

/// Create select routes
pub fn select_routes(state: Arc<DatabaseState>) -> Router {
    Router::new()
        .route("/select", post(select_handler))
        .route("/tablesview", get(tables_view_handler))
        .with_state(state)
}

/// Build and run a query; echoes the statement with literals filled in
async fn select_handler(
    State(state): State<Arc<DatabaseState>>,
    Json(query): Json<SelectQuery>,
) -> ApiResult<Json<SelectOutput>> {
    let mut session = state.session().await?;
    Ok(Json(select::select(session.as_mut(), &query).await?))
}

async fn tables_view_handler(
    State(state): State<Arc<DatabaseState>>,
) -> ApiResult<Json<Vec<String>>> {
    let mut session = state.session().await?;
    Ok(Json(table::list_tables(session.as_mut()).await?))
}
