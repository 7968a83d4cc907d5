//! Shared helpers for driving the router in-process

#![allow(dead_code)]

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use pgfacade::db::ScriptedDatabase;
use pgfacade::http_server::HttpServer;
use serde_json::{json, Value};
use tower::ServiceExt;

pub fn app(db: &ScriptedDatabase) -> Router {
    HttpServer::new(Arc::new(db.clone())).router()
}

/// Send one request and return the status plus the JSON body (`null` when
/// the body is not JSON).
pub async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

pub async fn call(db: &ScriptedDatabase, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    send(&app(db), method, uri, body).await
}

pub async fn get(db: &ScriptedDatabase, uri: &str) -> (StatusCode, Value) {
    call(db, "GET", uri, None).await
}

pub async fn post(db: &ScriptedDatabase, uri: &str, body: Value) -> (StatusCode, Value) {
    call(db, "POST", uri, Some(body)).await
}

pub async fn put(db: &ScriptedDatabase, uri: &str, body: Value) -> (StatusCode, Value) {
    call(db, "PUT", uri, Some(body)).await
}

pub async fn delete(db: &ScriptedDatabase, uri: &str, body: Value) -> (StatusCode, Value) {
    call(db, "DELETE", uri, Some(body)).await
}

/// Script a `people (id integer, name varchar)` table
pub fn with_people_table(db: &ScriptedDatabase) {
    db.on_query("information_schema.tables", json!([{"present": 1}]));
    db.on_query(
        "information_schema.columns",
        json!([
            {"column_name": "id", "column_type": "integer"},
            {"column_name": "name", "column_type": "character varying"}
        ]),
    );
}

/// Executed statements that are not catalog lookups
pub fn mutations(db: &ScriptedDatabase) -> Vec<String> {
    db.executed_sql()
        .into_iter()
        .filter(|sql| !sql.contains("information_schema"))
        .collect()
}
