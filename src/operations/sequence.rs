//! # Sequence Operations

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::table::string_column;
use super::{Message, OperationError, OperationResult};
use crate::db::{Row, Session, SqlFragment, Statement};

#[derive(Debug, Clone, Deserialize)]
pub struct CreateSequenceRequest {
    pub name: SqlFragment,
    #[serde(default = "default_one")]
    pub start: Option<i64>,
    #[serde(default = "default_one")]
    pub increment: Option<i64>,
    #[serde(default)]
    pub min_value: Option<i64>,
    #[serde(default)]
    pub max_value: Option<i64>,
    #[serde(default)]
    pub cache: Option<i64>,
    #[serde(default)]
    pub cycle: bool,
}

fn default_one() -> Option<i64> {
    Some(1)
}

#[derive(Debug, Clone, Deserialize)]
pub struct SetValueRequest {
    pub value: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RestartRequest {
    pub start_with: i64,
}

/// Table column a sequence belongs to
#[derive(Debug, Clone, Deserialize)]
pub struct ColumnRef {
    pub table: SqlFragment,
    pub column: SqlFragment,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreatedSequence {
    pub sequence: String,
    pub query_executed: String,
}

pub fn create_sequence_statement(request: &CreateSequenceRequest) -> Statement {
    let mut stmt = Statement::raw("CREATE SEQUENCE ");
    stmt.push_fragment(&request.name);

    let options = [
        request.start.map(|v| format!("START WITH {v}")),
        request.increment.map(|v| format!("INCREMENT BY {v}")),
        request.min_value.map(|v| format!("MINVALUE {v}")),
        request.max_value.map(|v| format!("MAXVALUE {v}")),
        request.cache.map(|v| format!("CACHE {v}")),
        request.cycle.then(|| "CYCLE".to_string()),
    ];
    for option in options.into_iter().flatten() {
        stmt.push_str(" ");
        stmt.push_str(option);
    }
    stmt
}

pub async fn create_sequence(
    session: &mut dyn Session,
    request: &CreateSequenceRequest,
) -> OperationResult<CreatedSequence> {
    let stmt = create_sequence_statement(request);
    session.execute(&stmt).await?;
    Ok(CreatedSequence {
        sequence: request.name.to_string(),
        query_executed: stmt.render(),
    })
}

/// `SELECT <func>($1::text::regclass, ...) AS <alias>`
fn sequence_call(func: &str, name: &SqlFragment, extra: Option<i64>) -> Statement {
    let mut stmt = Statement::raw(format!("SELECT {func}("));
    stmt.push_param(Value::String(name.as_str().to_string()));
    stmt.push_str("::text::regclass");
    if let Some(value) = extra {
        stmt.push_str(", ");
        stmt.push_param(Value::from(value));
        stmt.push_str("::bigint");
    }
    stmt.push_str(format!(") AS {func}"));
    stmt
}

async fn scalar(session: &mut dyn Session, stmt: &Statement, column: &str) -> OperationResult<Value> {
    let rows = session.query(stmt).await?;
    Ok(rows
        .into_iter()
        .next()
        .and_then(|mut row| row.remove(column))
        .unwrap_or(Value::Null))
}

pub async fn next_value(session: &mut dyn Session, name: &SqlFragment) -> OperationResult<Value> {
    scalar(session, &sequence_call("nextval", name, None), "nextval").await
}

pub fn current_value_statement(name: &SqlFragment) -> Statement {
    let mut stmt = Statement::raw(
        "SELECT last_value FROM pg_sequences \
         WHERE schemaname = current_schema() AND sequencename = ",
    );
    stmt.push_param(Value::String(name.as_str().to_string()));
    stmt.push_str("::text");
    stmt
}

/// Last value handed out by any session, or null before the first
/// `nextval`. Read from the catalog since `currval` only sees the calling
/// session's own history.
pub async fn current_value(session: &mut dyn Session, name: &SqlFragment) -> OperationResult<Value> {
    let rows = session.query(&current_value_statement(name)).await?;
    match rows.into_iter().next() {
        Some(mut row) => Ok(row.remove("last_value").unwrap_or(Value::Null)),
        None => Err(OperationError::validation(format!(
            "Sequence '{name}' does not exist"
        ))),
    }
}

pub async fn set_value(
    session: &mut dyn Session,
    name: &SqlFragment,
    value: i64,
) -> OperationResult<Value> {
    scalar(session, &sequence_call("setval", name, Some(value)), "setval").await
}

pub async fn restart_sequence(
    session: &mut dyn Session,
    name: &SqlFragment,
    start_with: i64,
) -> OperationResult<Message> {
    let mut stmt = Statement::raw("ALTER SEQUENCE ");
    stmt.push_fragment(name);
    stmt.push_str(format!(" RESTART WITH {start_with}"));
    session.execute(&stmt).await?;
    Ok(Message::new(format!(
        "Sequence {name} restarted with {start_with}"
    )))
}

pub async fn drop_sequence(session: &mut dyn Session, name: &SqlFragment) -> OperationResult<Message> {
    let mut stmt = Statement::raw("DROP SEQUENCE ");
    stmt.push_fragment(name);
    session.execute(&stmt).await?;
    Ok(Message::new(format!("Sequence {name} dropped")))
}

pub async fn list_sequences(session: &mut dyn Session) -> OperationResult<Vec<String>> {
    let rows = session
        .query(&Statement::raw(
            "SELECT relname FROM pg_class WHERE relkind = 'S' ORDER BY relname",
        ))
        .await?;
    Ok(string_column(rows, "relname"))
}

/// The sequence relation's own row (`last_value`, `log_cnt`, `is_called`)
pub async fn sequence_details(session: &mut dyn Session, name: &SqlFragment) -> OperationResult<Row> {
    let mut stmt = Statement::raw("SELECT * FROM ");
    stmt.push_fragment(name);
    let rows = session.query(&stmt).await?;
    Ok(rows.into_iter().next().unwrap_or_default())
}

pub async fn associate_sequence(
    session: &mut dyn Session,
    name: &SqlFragment,
    owner: &ColumnRef,
) -> OperationResult<Message> {
    let mut stmt = Statement::raw("ALTER SEQUENCE ");
    stmt.push_fragment(name);
    stmt.push_str(" OWNED BY ");
    stmt.push_fragment(&owner.table);
    stmt.push_str(".");
    stmt.push_fragment(&owner.column);
    session.execute(&stmt).await?;
    Ok(Message::new(format!(
        "Sequence {name} is now owned by {}.{}",
        owner.table, owner.column
    )))
}

pub fn reset_for_table_statement(owner: &ColumnRef) -> Statement {
    let mut stmt = Statement::raw("SELECT setval(pg_get_serial_sequence(");
    stmt.push_param(Value::String(owner.table.as_str().to_string()));
    stmt.push_str("::text, ");
    stmt.push_param(Value::String(owner.column.as_str().to_string()));
    stmt.push_str("::text), COALESCE(MAX(");
    stmt.push_fragment(&owner.column);
    stmt.push_str("), 1), false) AS new_val FROM ");
    stmt.push_fragment(&owner.table);
    stmt
}

/// Point the column's serial sequence at its current maximum with
/// `is_called = false`, so the next value handed out is `MAX` itself (or 1
/// on an empty table).
pub async fn reset_for_table(session: &mut dyn Session, owner: &ColumnRef) -> OperationResult<Value> {
    scalar(session, &reset_for_table_statement(owner), "new_val").await
}
