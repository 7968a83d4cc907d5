//! PostgreSQL API Tests
//!
//! Drives the router against a live server through the real pool, so row
//! decoding, parameter type inference and connection recycling are all in
//! play. Set `DATABASE_URL` to run them; without it each test returns early.

mod common;

use std::sync::Arc;

use axum::http::StatusCode;
use axum::Router;
use common::send;
use pgfacade::db::PgDatabase;
use pgfacade::http_server::HttpServer;
use serde_json::{json, Value};

// =============================================================================
// Helpers
// =============================================================================

/// Router over a fresh pool, or `None` when no server is configured
fn live(pool_size: usize) -> Option<Router> {
    let Ok(url) = std::env::var("DATABASE_URL") else {
        eprintln!("DATABASE_URL not set; skipping");
        return None;
    };
    let db = PgDatabase::connect(&url, pool_size).expect("DATABASE_URL should parse");
    Some(HttpServer::new(Arc::new(db)).router())
}

/// Name unique to this test process
fn unique(prefix: &str) -> String {
    format!("{prefix}_{}", std::process::id())
}

async fn fresh_table(app: &Router, table: &str, columns: Value) {
    send(app, "DELETE", "/table/delete_table", Some(json!({"table_name": table}))).await;
    let (status, body) = send(
        app,
        "POST",
        "/table/create_table",
        Some(json!({"table_name": table, "columns": columns})),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
}

async fn drop_table(app: &Router, table: &str) {
    send(app, "DELETE", "/table/delete_table", Some(json!({"table_name": table}))).await;
}

async fn insert(app: &Router, table: &str, row: Value) {
    let (status, body) = send(
        app,
        "POST",
        "/table/insert_row",
        Some(json!({"table_name": table, "row_data": row})),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
}

async fn select(app: &Router, query: Value) -> Value {
    let (status, body) = send(app, "POST", "/select/select", Some(query)).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    body
}

// =============================================================================
// Tables and Rows
// =============================================================================

/// A created table reports back the columns it was created with
#[tokio::test]
async fn test_create_then_schema() {
    let Some(app) = live(2) else { return };
    let table = unique("pgf_schema");

    fresh_table(
        &app,
        &table,
        json!([
            {"column_name": "id", "column_type": "SERIAL PRIMARY KEY"},
            {"column_name": "label", "column_type": "TEXT"},
            {"column_name": "amount", "column_type": "NUMERIC(10,2)"}
        ]),
    )
    .await;

    let (status, body) = send(
        &app,
        "GET",
        &format!("/table/get_table_schema?table_name={table}"),
        None,
    )
    .await;
    drop_table(&app, &table).await;

    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(
        body["schema"],
        json!([
            {"column_name": "id", "column_type": "integer"},
            {"column_name": "label", "column_type": "text"},
            {"column_name": "amount", "column_type": "numeric"}
        ])
    );
}

/// Values bind to whatever type the column has, including types only the
/// server knows how to parse
#[tokio::test]
async fn test_insert_then_select_typed_values() {
    let Some(app) = live(2) else { return };
    let table = unique("pgf_typed");

    fresh_table(
        &app,
        &table,
        json!([
            {"column_name": "id", "column_type": "SERIAL PRIMARY KEY"},
            {"column_name": "amt", "column_type": "NUMERIC(10,2)"},
            {"column_name": "ip", "column_type": "INET"},
            {"column_name": "span", "column_type": "INTERVAL"},
            {"column_name": "ts", "column_type": "TIMESTAMP"},
            {"column_name": "tz", "column_type": "TIMESTAMPTZ"}
        ]),
    )
    .await;

    insert(
        &app,
        &table,
        json!({
            "amt": 12.5,
            "ip": "10.0.0.1",
            "span": "1 day",
            "ts": "2024-01-01",
            "tz": "2024-01-01 10:00:00",
            "unknown_column": "ignored"
        }),
    )
    .await;
    insert(&app, &table, json!({"amt": "-0.05"})).await;

    let all = select(&app, json!({"table": table, "order_by": "id"})).await;
    let filtered = select(&app, json!({"table": table, "where": {"ip": "10.0.0.1"}})).await;
    drop_table(&app, &table).await;

    let rows = all["data"].as_array().unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["amt"], json!(12.5));
    assert_eq!(rows[0]["ip"], "10.0.0.1");
    assert_eq!(rows[0]["span"], "1 day");
    assert_eq!(rows[0]["ts"], "2024-01-01T00:00:00");
    assert!(rows[0]["tz"].is_string());
    assert_eq!(rows[1]["amt"], json!(-0.05));
    assert!(rows[1]["ip"].is_null());

    assert_eq!(filtered["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_select_limit_and_offset() {
    let Some(app) = live(2) else { return };
    let table = unique("pgf_paging");

    fresh_table(
        &app,
        &table,
        json!([
            {"column_name": "id", "column_type": "SERIAL PRIMARY KEY"},
            {"column_name": "n", "column_type": "INTEGER"}
        ]),
    )
    .await;
    for n in 1..=5 {
        insert(&app, &table, json!({"n": n})).await;
    }

    let page = select(
        &app,
        json!({"table": table, "columns": ["n"], "order_by": "n", "order": "asc", "limit": 2, "offset": 1}),
    )
    .await;
    drop_table(&app, &table).await;

    assert_eq!(page["data"], json!([{"n": 2}, {"n": 3}]));
    assert_eq!(
        page["query"],
        format!("SELECT n FROM {table} ORDER BY n ASC LIMIT 2 OFFSET 1")
    );
}

// =============================================================================
// Sequences
// =============================================================================

/// The current value is visible from a different pooled session than the
/// one that advanced the sequence
#[tokio::test]
async fn test_sequence_next_then_current() {
    let Some(app) = live(2) else { return };
    let seq = unique("pgf_seq");

    send(&app, "DELETE", &format!("/sequences/{seq}/drop"), None).await;
    let (status, body) = send(
        &app,
        "POST",
        "/sequences/create",
        Some(json!({"name": seq, "start": 5, "increment": 2})),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");

    let (_, first) = send(&app, "GET", &format!("/sequences/{seq}/next"), None).await;
    let (_, second) = send(&app, "GET", &format!("/sequences/{seq}/next"), None).await;
    let (status, current) = send(&app, "GET", &format!("/sequences/{seq}/current"), None).await;
    send(&app, "DELETE", &format!("/sequences/{seq}/drop"), None).await;

    assert_eq!(first, json!({"next_value": 5}));
    assert_eq!(second, json!({"next_value": 7}));
    assert_eq!(status, StatusCode::OK, "{current}");
    assert_eq!(current, json!({"current_value": 7}));
}

// =============================================================================
// Session Hygiene
// =============================================================================

/// Steps left uncommitted are rolled back when the request ends
#[tokio::test]
async fn test_uncommitted_sequence_is_rolled_back() {
    let Some(app) = live(2) else { return };
    let table = unique("pgf_rollback");

    fresh_table(
        &app,
        &table,
        json!([{"column_name": "n", "column_type": "INTEGER"}]),
    )
    .await;

    let (status, body) = send(
        &app,
        "POST",
        "/transactions/sequence",
        Some(json!({"steps": [
            {"op": "begin"},
            {"op": "statement", "sql": format!("INSERT INTO {table} (n) VALUES (1)")}
        ]})),
    )
    .await;
    let after = select(&app, json!({"table": table})).await;
    drop_table(&app, &table).await;

    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(after["data"], json!([]));
}

/// A session advisory lock does not outlive the request that took it
#[tokio::test]
async fn test_advisory_lock_released_on_recycle() {
    // One connection, so the next request reuses (and recycles) it
    let Some(app) = live(1) else { return };
    let key = 724_301;

    let (status, body) = send(
        &app,
        "POST",
        "/transactions/advisory_lock",
        Some(json!({"key": key})),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");

    let held = select(
        &app,
        json!({
            "table": "pg_locks",
            "columns": ["objid"],
            "where": {"locktype": "advisory", "objid": key}
        }),
    )
    .await;
    assert_eq!(held["data"], json!([]));
}
