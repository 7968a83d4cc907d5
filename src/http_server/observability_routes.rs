//! Observability HTTP Routes
//!
//! Root welcome message and health check.

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use serde::Serialize;
use tracing::warn;

use super::state::DatabaseState;
use crate::db::Statement;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub database: String,
}

#[derive(Debug, Serialize)]
pub struct WelcomeResponse {
    pub message: String,
}

/// Create the root-level routes (`/` and `/health`)
pub fn observability_routes(state: Arc<DatabaseState>) -> Router {
    Router::new()
        .route("/", get(welcome_handler))
        .route("/health", get(health_handler))
        .with_state(state)
}

async fn welcome_handler() -> Json<WelcomeResponse> {
    Json(WelcomeResponse {
        message: "Welcome to the Dynamic SQL API!".to_string(),
    })
}

/// Health check handler. Reports 503 when no database session can be used.
async fn health_handler(State(state): State<Arc<DatabaseState>>) -> impl IntoResponse {
    let database = match ping(&state).await {
        Ok(()) => "ok".to_string(),
        Err(err) => {
            warn!(error = %err, "health check could not reach the database");
            "unavailable".to_string()
        }
    };

    let status = if database == "ok" {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let response = HealthResponse {
        status: if status == StatusCode::OK { "ok" } else { "degraded" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        database,
    };

    (status, Json(response))
}

async fn ping(state: &DatabaseState) -> Result<(), crate::db::DbError> {
    let mut session = state.db.session().await?;
    session.execute(&Statement::raw("SELECT 1")).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_response_serialization() {
        let response = HealthResponse {
            status: "ok".to_string(),
            version: "0.1.0".to_string(),
            database: "ok".to_string(),
        };

        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("\"database\":\"ok\""));
    }
}
