//! # Table Operations
//!
//! Catalog reads, DDL and single-table row mutations. Row mutations only
//! keep the keys that name live columns of the target table.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{Message, OperationError, OperationResult};
use crate::db::{Row, Session, SqlFragment, Statement};

// ==================
// Request/Response Types
// ==================

/// Column name and SQL type, both trusted as-is
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDef {
    pub column_name: SqlFragment,
    pub column_type: SqlFragment,
}

impl ColumnDef {
    pub fn new(name: &str, ty: &str) -> Self {
        Self {
            column_name: SqlFragment::new(name),
            column_type: SqlFragment::new(ty),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TableRequest {
    pub table_name: SqlFragment,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateTableRequest {
    pub table_name: SqlFragment,
    #[serde(default)]
    pub columns: Vec<ColumnDef>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModifyTableRequest {
    pub table_name: SqlFragment,
    #[serde(default)]
    pub add_columns: Vec<ColumnDef>,
    #[serde(default)]
    pub drop_columns: Vec<SqlFragment>,
    #[serde(default)]
    pub modify_columns: Vec<ColumnDef>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InsertRowRequest {
    pub table_name: SqlFragment,
    pub row_data: Row,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateRowRequest {
    pub table_name: SqlFragment,
    pub condition: Row,
    pub new_values: Row,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeleteRowRequest {
    pub table_name: SqlFragment,
    pub condition: Row,
}

/// A mutation status plus how many rows it touched
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowsAffected {
    pub message: String,
    pub rows_affected: u64,
}

// ==================
// Catalog
// ==================

const LIST_TABLES: &str = "SELECT table_name FROM information_schema.tables \
     WHERE table_schema = current_schema() AND table_type = 'BASE TABLE' \
     ORDER BY table_name";

/// Base tables in the current schema, sorted
pub async fn list_tables(session: &mut dyn Session) -> OperationResult<Vec<String>> {
    let rows = session.query(&Statement::raw(LIST_TABLES)).await?;
    Ok(string_column(rows, "table_name"))
}

fn table_exists_statement(table: &SqlFragment) -> Statement {
    let mut stmt = Statement::raw(
        "SELECT 1 AS present FROM information_schema.tables \
         WHERE table_schema = current_schema() AND table_name = ",
    );
    stmt.push_param(Value::String(table.as_str().to_string()));
    stmt.push_str("::text");
    stmt
}

fn column_schema_statement(table: &SqlFragment) -> Statement {
    let mut stmt = Statement::raw(
        "SELECT column_name, data_type AS column_type FROM information_schema.columns \
         WHERE table_schema = current_schema() AND table_name = ",
    );
    stmt.push_param(Value::String(table.as_str().to_string()));
    stmt.push_str("::text ORDER BY ordinal_position");
    stmt
}

async fn require_table(session: &mut dyn Session, table: &SqlFragment) -> OperationResult<()> {
    let rows = session.query(&table_exists_statement(table)).await?;
    if rows.is_empty() {
        return Err(OperationError::TableNotFound(table.to_string()));
    }
    Ok(())
}

/// Columns of `table` in ordinal order
pub async fn table_schema(
    session: &mut dyn Session,
    table: &SqlFragment,
) -> OperationResult<Vec<ColumnDef>> {
    require_table(session, table).await?;

    let rows = session.query(&column_schema_statement(table)).await?;
    Ok(rows
        .into_iter()
        .map(|row| ColumnDef {
            column_name: SqlFragment::new(text_field(&row, "column_name")),
            column_type: SqlFragment::new(text_field(&row, "column_type")),
        })
        .collect())
}

/// Every row of `table`
pub async fn table_data(session: &mut dyn Session, table: &SqlFragment) -> OperationResult<Vec<Row>> {
    require_table(session, table).await?;

    let mut stmt = Statement::raw("SELECT * FROM ");
    stmt.push_fragment(table);
    Ok(session.query(&stmt).await?)
}

async fn live_columns(
    session: &mut dyn Session,
    table: &SqlFragment,
) -> OperationResult<HashSet<String>> {
    Ok(table_schema(session, table)
        .await?
        .into_iter()
        .map(|c| c.column_name.as_str().to_string())
        .collect())
}

// ==================
// DDL
// ==================

pub fn create_table_statement(request: &CreateTableRequest) -> Statement {
    let mut stmt = Statement::raw("CREATE TABLE ");
    stmt.push_fragment(&request.table_name);
    stmt.push_str(" (");
    if request.columns.is_empty() {
        stmt.push_str("id SERIAL PRIMARY KEY, name VARCHAR");
    } else {
        stmt.push_iter(&request.columns, ", ", |s, col| {
            s.push_fragment(&col.column_name);
            s.push_str(" ");
            s.push_fragment(&col.column_type);
        });
    }
    stmt.push_str(")");
    stmt
}

pub async fn create_table(
    session: &mut dyn Session,
    request: &CreateTableRequest,
) -> OperationResult<Message> {
    session.execute(&create_table_statement(request)).await?;
    Ok(Message::new(format!(
        "Table '{}' created successfully",
        request.table_name
    )))
}

pub async fn delete_table(session: &mut dyn Session, table: &SqlFragment) -> OperationResult<Message> {
    require_table(session, table).await?;

    let mut stmt = Statement::raw("DROP TABLE ");
    stmt.push_fragment(table);
    session.execute(&stmt).await?;
    Ok(Message::new(format!("Table '{table}' deleted successfully")))
}

/// One `ALTER TABLE` per change: adds, then drops, then type changes
pub fn modify_table_statements(request: &ModifyTableRequest) -> Vec<Statement> {
    let alter = || {
        let mut stmt = Statement::raw("ALTER TABLE ");
        stmt.push_fragment(&request.table_name);
        stmt
    };

    let mut statements = Vec::new();
    for col in &request.add_columns {
        let mut stmt = alter();
        stmt.push_str(" ADD COLUMN ");
        stmt.push_fragment(&col.column_name);
        stmt.push_str(" ");
        stmt.push_fragment(&col.column_type);
        statements.push(stmt);
    }
    for name in &request.drop_columns {
        let mut stmt = alter();
        stmt.push_str(" DROP COLUMN ");
        stmt.push_fragment(name);
        statements.push(stmt);
    }
    for col in &request.modify_columns {
        let mut stmt = alter();
        stmt.push_str(" ALTER COLUMN ");
        stmt.push_fragment(&col.column_name);
        stmt.push_str(" TYPE ");
        stmt.push_fragment(&col.column_type);
        stmt.push_str(" USING ");
        stmt.push_fragment(&col.column_name);
        stmt.push_str("::");
        stmt.push_fragment(&col.column_type);
        statements.push(stmt);
    }
    statements
}

/// Changes already applied stay applied if a later one fails.
pub async fn modify_table(
    session: &mut dyn Session,
    request: &ModifyTableRequest,
) -> OperationResult<Message> {
    for stmt in modify_table_statements(request) {
        session.execute(&stmt).await?;
    }
    Ok(Message::new(format!(
        "Table '{}' modified successfully",
        request.table_name
    )))
}

// ==================
// Row Mutations
// ==================

/// Keep only the entries whose key is a live column, in input order
fn retain_live(values: &Row, columns: &HashSet<String>) -> Vec<(String, Value)> {
    values
        .iter()
        .filter(|(k, _)| columns.contains(k.as_str()))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

fn push_conditions(stmt: &mut Statement, condition: Vec<(String, Value)>) {
    stmt.push_str(" WHERE ");
    stmt.push_iter(condition, " AND ", |s, (col, value)| {
        s.push_str(&col);
        s.push_str(" = ");
        s.push_param(value);
    });
}

pub fn insert_statement(table: &SqlFragment, data: Vec<(String, Value)>) -> Statement {
    let (names, values): (Vec<_>, Vec<_>) = data.into_iter().unzip();

    let mut stmt = Statement::raw("INSERT INTO ");
    stmt.push_fragment(table);
    stmt.push_str(" (");
    stmt.push_str(names.join(", "));
    stmt.push_str(") VALUES (");
    stmt.push_iter(values, ", ", Statement::push_param);
    stmt.push_str(")");
    stmt
}

pub fn update_statement(
    table: &SqlFragment,
    new_values: Vec<(String, Value)>,
    condition: Vec<(String, Value)>,
) -> Statement {
    let mut stmt = Statement::raw("UPDATE ");
    stmt.push_fragment(table);
    stmt.push_str(" SET ");
    stmt.push_iter(new_values, ", ", |s, (col, value)| {
        s.push_str(&col);
        s.push_str(" = ");
        s.push_param(value);
    });
    push_conditions(&mut stmt, condition);
    stmt
}

pub fn delete_statement(table: &SqlFragment, condition: Vec<(String, Value)>) -> Statement {
    let mut stmt = Statement::raw("DELETE FROM ");
    stmt.push_fragment(table);
    push_conditions(&mut stmt, condition);
    stmt
}

pub async fn insert_row(
    session: &mut dyn Session,
    request: &InsertRowRequest,
) -> OperationResult<RowsAffected> {
    let columns = live_columns(session, &request.table_name).await?;

    let data = retain_live(&request.row_data, &columns);
    if data.is_empty() {
        return Err(OperationError::validation(
            "No valid columns provided for insertion.",
        ));
    }

    let rows_affected = session
        .execute(&insert_statement(&request.table_name, data))
        .await?;
    Ok(RowsAffected {
        message: format!(
            "Row inserted into table '{}' successfully",
            request.table_name
        ),
        rows_affected,
    })
}

pub async fn update_row(
    session: &mut dyn Session,
    request: &UpdateRowRequest,
) -> OperationResult<RowsAffected> {
    let columns = live_columns(session, &request.table_name).await?;

    let new_values = retain_live(&request.new_values, &columns);
    let condition = retain_live(&request.condition, &columns);
    if new_values.is_empty() {
        return Err(OperationError::validation(
            "No valid columns provided for update.",
        ));
    }
    if condition.is_empty() {
        return Err(OperationError::validation(
            "Condition must have at least one valid column.",
        ));
    }

    let rows_affected = session
        .execute(&update_statement(&request.table_name, new_values, condition))
        .await?;
    Ok(RowsAffected {
        message: format!("Row(s) in '{}' updated successfully", request.table_name),
        rows_affected,
    })
}

pub async fn delete_row(
    session: &mut dyn Session,
    request: &DeleteRowRequest,
) -> OperationResult<RowsAffected> {
    let columns = live_columns(session, &request.table_name).await?;

    let condition = retain_live(&request.condition, &columns);
    if condition.is_empty() {
        return Err(OperationError::validation(
            "Condition must have at least one valid column.",
        ));
    }

    let rows_affected = session
        .execute(&delete_statement(&request.table_name, condition))
        .await?;
    Ok(RowsAffected {
        message: format!("Row(s) in '{}' deleted successfully", request.table_name),
        rows_affected,
    })
}

// ==================
// Helpers
// ==================

fn text_field(row: &Row, key: &str) -> String {
    match row.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

/// Pull one text column out of every row
pub(crate) fn string_column(rows: Vec<Row>, key: &str) -> Vec<String> {
    rows.iter().map(|row| text_field(row, key)).collect()
}
