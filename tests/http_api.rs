//! HTTP API Tests
//!
//! Drives the full router against a scripted database and checks both the
//! responses and the SQL that reached (or never reached) the database.

mod common;

use axum::http::StatusCode;
use common::*;
use pgfacade::db::ScriptedDatabase;
use serde_json::json;

// =============================================================================
// Root
// =============================================================================

#[tokio::test]
async fn test_welcome_message() {
    let db = ScriptedDatabase::new();
    let (status, body) = get(&db, "/").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"message": "Welcome to the Dynamic SQL API!"}));
}

#[tokio::test]
async fn test_health_reports_database_state() {
    let db = ScriptedDatabase::new();
    let (status, body) = get(&db, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["database"], "ok");

    db.fail_on("SELECT 1", "connection refused");
    let (status, body) = get(&db, "/health").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["status"], "degraded");
}

// =============================================================================
// Tables
// =============================================================================

#[tokio::test]
async fn test_list_tables() {
    let db = ScriptedDatabase::new();
    db.on_query(
        "information_schema.tables",
        json!([{"table_name": "orders"}, {"table_name": "people"}]),
    );

    let (status, body) = get(&db, "/table/tables").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"tables": ["orders", "people"]}));

    let (_, body) = get(&db, "/select/tablesview").await;
    assert_eq!(body, json!(["orders", "people"]));
}

#[tokio::test]
async fn test_create_table_default_layout() {
    let db = ScriptedDatabase::new();
    let (status, body) = post(&db, "/table/create_table", json!({"table_name": "people"})).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Table 'people' created successfully");
    assert_eq!(
        db.executed_sql(),
        vec!["CREATE TABLE people (id SERIAL PRIMARY KEY, name VARCHAR)"]
    );
}

#[tokio::test]
async fn test_schema_lists_columns_in_order() {
    let db = ScriptedDatabase::new();
    with_people_table(&db);

    let (status, body) = get(&db, "/table/get_table_schema?table_name=people").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({"schema": [
            {"column_name": "id", "column_type": "integer"},
            {"column_name": "name", "column_type": "character varying"}
        ]})
    );

    let statements = db.statements();
    assert_eq!(statements[0].params(), &[json!("people")]);
}

#[tokio::test]
async fn test_missing_table_is_404() {
    let db = ScriptedDatabase::new();

    let (status, body) = get(&db, "/table/get_table_data?table_name=ghost").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["detail"], "Table 'ghost' not found");
    assert_eq!(body["code"], 404);

    let (status, _) = delete(
        &db,
        "/table/delete_row",
        json!({"table_name": "ghost", "condition": {"id": 1}}),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(mutations(&db).is_empty());
}

#[tokio::test]
async fn test_modify_table_applies_in_order() {
    let db = ScriptedDatabase::new();
    let (status, _) = put(
        &db,
        "/table/modify_table",
        json!({
            "table_name": "people",
            "add_columns": [{"column_name": "email", "column_type": "TEXT"}],
            "drop_columns": ["nickname"],
            "modify_columns": [{"column_name": "id", "column_type": "BIGINT"}]
        }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        db.executed_sql(),
        vec![
            "ALTER TABLE people ADD COLUMN email TEXT",
            "ALTER TABLE people DROP COLUMN nickname",
            "ALTER TABLE people ALTER COLUMN id TYPE BIGINT USING id::BIGINT",
        ]
    );
}

#[tokio::test]
async fn test_modify_table_keeps_earlier_changes_on_failure() {
    let db = ScriptedDatabase::new();
    db.fail_on("DROP COLUMN", "column \"nickname\" of relation \"people\" does not exist");

    let (status, body) = put(
        &db,
        "/table/modify_table",
        json!({
            "table_name": "people",
            "add_columns": [{"column_name": "email", "column_type": "TEXT"}],
            "drop_columns": ["nickname"],
            "modify_columns": [{"column_name": "id", "column_type": "BIGINT"}]
        }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["detail"].as_str().unwrap().contains("does not exist"));
    assert_eq!(
        db.executed_sql(),
        vec![
            "ALTER TABLE people ADD COLUMN email TEXT",
            "ALTER TABLE people DROP COLUMN nickname",
        ]
    );
}

// =============================================================================
// Rows
// =============================================================================

#[tokio::test]
async fn test_insert_keeps_only_live_columns() {
    let db = ScriptedDatabase::new();
    with_people_table(&db);
    db.on_execute("INSERT INTO", 1);

    let (status, body) = post(
        &db,
        "/table/insert_row",
        json!({"table_name": "people", "row_data": {"name": "Ada", "nickname": "A"}}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["rows_affected"], 1);

    let insert = db.statements().pop().unwrap();
    assert_eq!(insert.sql(), "INSERT INTO people (name) VALUES ($1)");
    assert_eq!(insert.params(), &[json!("Ada")]);
}

#[tokio::test]
async fn test_insert_without_live_columns_is_rejected() {
    let db = ScriptedDatabase::new();
    with_people_table(&db);

    let (status, body) = post(
        &db,
        "/table/insert_row",
        json!({"table_name": "people", "row_data": {"nickname": "A"}}),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "No valid columns provided for insertion.");
    assert!(mutations(&db).is_empty());
}

#[tokio::test]
async fn test_update_matching_nothing_still_succeeds() {
    let db = ScriptedDatabase::new();
    with_people_table(&db);
    db.on_execute("UPDATE people", 0);

    let (status, body) = put(
        &db,
        "/table/update_row",
        json!({
            "table_name": "people",
            "condition": {"id": 999},
            "new_values": {"name": "Grace"}
        }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["rows_affected"], 0);
    assert_eq!(body["message"], "Row(s) in 'people' updated successfully");
    assert_eq!(
        mutations(&db),
        vec!["UPDATE people SET name = $1 WHERE id = $2"]
    );
}

#[tokio::test]
async fn test_update_requires_live_condition() {
    let db = ScriptedDatabase::new();
    with_people_table(&db);

    let (status, body) = put(
        &db,
        "/table/update_row",
        json!({
            "table_name": "people",
            "condition": {"ghost_column": 1},
            "new_values": {"name": "Grace"}
        }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "Condition must have at least one valid column.");
    assert!(mutations(&db).is_empty());
}

#[tokio::test]
async fn test_delete_row() {
    let db = ScriptedDatabase::new();
    with_people_table(&db);
    db.on_execute("DELETE FROM people", 2);

    let (status, body) = delete(
        &db,
        "/table/delete_row",
        json!({"table_name": "people", "condition": {"name": "Ada", "extra": true}}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["rows_affected"], 2);
    assert_eq!(mutations(&db), vec!["DELETE FROM people WHERE name = $1"]);
}

// =============================================================================
// Select
// =============================================================================

#[tokio::test]
async fn test_select_with_limit_and_offset() {
    let db = ScriptedDatabase::new();
    db.on_query(
        "FROM people",
        json!([{"id": 2, "name": "Grace"}, {"id": 3, "name": "Linus"}]),
    );

    let (status, body) = post(
        &db,
        "/select/select",
        json!({
            "table": "people",
            "where": {"id": [">", 1]},
            "order_by": "id",
            "order": "asc",
            "limit": 2,
            "offset": 1
        }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["query"],
        "SELECT * FROM people WHERE id > 1 ORDER BY id ASC LIMIT 2 OFFSET 1"
    );
    assert_eq!(body["data"].as_array().unwrap().len(), 2);
    assert_eq!(body["data"][0], json!({"id": 2, "name": "Grace"}));

    let stmt = db.statements().pop().unwrap();
    assert_eq!(
        stmt.sql(),
        "SELECT * FROM people WHERE id > $1 ORDER BY id ASC LIMIT $2 OFFSET $3"
    );
}

#[tokio::test]
async fn test_select_surfaces_database_error() {
    let db = ScriptedDatabase::new();
    db.fail_on("FROM nope", "relation \"nope\" does not exist");

    let (status, body) = post(&db, "/select/select", json!({"table": "nope"})).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "relation \"nope\" does not exist");
}

// =============================================================================
// Indexes and Views
// =============================================================================

#[tokio::test]
async fn test_invalid_index_method_sends_no_sql() {
    let db = ScriptedDatabase::new();
    let (status, body) = post(
        &db,
        "/indexview/index/create",
        json!({
            "index_name": "idx",
            "table_name": "people",
            "column_name": "name",
            "index_type": "FOOBAR"
        }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "Invalid index type specified.");
    assert!(db.executed_sql().is_empty());
}

#[tokio::test]
async fn test_create_and_drop_index() {
    let db = ScriptedDatabase::new();
    let (status, body) = post(
        &db,
        "/indexview/index/create",
        json!({
            "index_name": "idx_people_name",
            "table_name": "people",
            "column_name": "name",
            "index_type": "hash"
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Index 'idx_people_name' created successfully.");

    post(&db, "/indexview/index/drop", json!({"index_name": "idx_people_name"})).await;

    assert_eq!(
        db.executed_sql(),
        vec![
            "CREATE INDEX idx_people_name ON people USING HASH (name)",
            "DROP INDEX IF EXISTS idx_people_name",
        ]
    );
}

#[tokio::test]
async fn test_invalid_view_type_sends_no_sql() {
    let db = ScriptedDatabase::new();
    let (status, _) = post(
        &db,
        "/indexview/view/create",
        json!({
            "view_type": "temporary",
            "view_name": "v",
            "definition": "SELECT 1"
        }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(db.executed_sql().is_empty());
}

#[tokio::test]
async fn test_updatable_view_lifecycle() {
    let db = ScriptedDatabase::new();

    let (status, body) = post(
        &db,
        "/indexview/view/create",
        json!({
            "view_type": "updatable",
            "view_name": "adults",
            "definition": "SELECT * FROM people WHERE age >= 18",
            "with_check_option": true
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Updatable view 'adults' created successfully.");

    post(&db, "/indexview/views/adults/insert", json!({"values": [1, "Ada", 36]})).await;
    put(
        &db,
        "/indexview/views/adults/update",
        json!({"set_clause": "age = age + 1", "condition": "id = 1"}),
    )
    .await;
    delete(&db, "/indexview/views/adults/delete", json!({"condition": "id = 1"})).await;
    put(
        &db,
        "/indexview/views/rename",
        json!({"old_name": "adults", "new_name": "grownups"}),
    )
    .await;

    assert_eq!(
        db.executed_sql(),
        vec![
            "CREATE VIEW adults AS SELECT * FROM people WHERE age >= 18 WITH CHECK OPTION",
            "INSERT INTO adults VALUES ($1, $2, $3)",
            "UPDATE adults SET age = age + 1 WHERE id = 1",
            "DELETE FROM adults WHERE id = 1",
            "ALTER VIEW adults RENAME TO grownups",
        ]
    );
}

#[tokio::test]
async fn test_view_reads() {
    let db = ScriptedDatabase::new();
    db.on_query("FROM adults", json!([{"id": 1}]));

    let (status, body) = get(&db, "/indexview/views/adults/filter?condition=id%20%3D%201").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([{"id": 1}]));

    get(
        &db,
        "/indexview/views/adults/join?table_name=orders&condition=adults.id%3Dorders.person_id",
    )
    .await;

    assert_eq!(
        db.executed_sql(),
        vec![
            "SELECT * FROM adults WHERE id = 1",
            "SELECT * FROM adults JOIN orders ON adults.id=orders.person_id",
        ]
    );
}

// =============================================================================
// Sequences
// =============================================================================

#[tokio::test]
async fn test_sequence_next_values_follow_increment() {
    let db = ScriptedDatabase::new();
    db.on_query("nextval", json!([{"nextval": 5}]))
        .on_query("nextval", json!([{"nextval": 7}]));

    let (status, body) = post(
        &db,
        "/sequences/create",
        json!({"name": "s1", "start": 5, "increment": 2}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({
            "sequence": "s1",
            "query_executed": "CREATE SEQUENCE s1 START WITH 5 INCREMENT BY 2"
        })
    );

    let (_, first) = get(&db, "/sequences/s1/next").await;
    let (_, second) = get(&db, "/sequences/s1/next").await;
    assert_eq!(first, json!({"next_value": 5}));
    assert_eq!(second, json!({"next_value": 7}));
}

#[tokio::test]
async fn test_current_value_comes_from_the_catalog() {
    let db = ScriptedDatabase::new();
    db.on_query("pg_sequences", json!([{"last_value": 7}]));

    let (status, body) = get(&db, "/sequences/s1/current").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"current_value": 7}));

    let stmt = db.statements().pop().unwrap();
    assert!(stmt.sql().contains("FROM pg_sequences"));
    assert_eq!(stmt.params(), &[json!("s1")]);
}

#[tokio::test]
async fn test_current_value_of_missing_sequence() {
    let db = ScriptedDatabase::new();
    let (status, body) = get(&db, "/sequences/ghost/current").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "Sequence 'ghost' does not exist");
}

#[tokio::test]
async fn test_sequence_maintenance() {
    let db = ScriptedDatabase::new();
    db.on_query("setval($1::text::regclass", json!([{"setval": 100}]));
    db.on_query("pg_get_serial_sequence", json!([{"new_val": 42}]));
    db.on_query("pg_class", json!([{"relname": "people_id_seq"}, {"relname": "s1"}]));

    let (_, set) = put(&db, "/sequences/s1/set", json!({"value": 100})).await;
    assert_eq!(set, json!({"new_value": 100}));

    let (_, reset) = post(
        &db,
        "/sequences/reset_table",
        json!({"table": "people", "column": "id"}),
    )
    .await;
    assert_eq!(reset, json!({"new_sequence_value": 42}));

    let (_, list) = get(&db, "/sequences/list").await;
    assert_eq!(list, json!({"sequences": ["people_id_seq", "s1"]}));

    let (_, owned) = post(
        &db,
        "/sequences/s1/associate",
        json!({"table": "people", "column": "id"}),
    )
    .await;
    assert_eq!(owned["message"], "Sequence s1 is now owned by people.id");

    put(&db, "/sequences/s1/restart", json!({"start_with": 10})).await;
    delete(&db, "/sequences/s1/drop", json!({})).await;

    let sql = db.executed_sql();
    assert!(sql.contains(&"ALTER SEQUENCE s1 OWNED BY people.id".to_string()));
    assert!(sql.contains(&"ALTER SEQUENCE s1 RESTART WITH 10".to_string()));
    assert_eq!(sql.last().map(String::as_str), Some("DROP SEQUENCE s1"));
}
