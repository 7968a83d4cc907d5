//! # View Operations
//!
//! Creation and removal across the four view kinds, reads over a view's
//! contents, and mutations of updatable views through caller-supplied
//! `SET`/`WHERE` text.

use std::str::FromStr;

use serde::Deserialize;
use serde_json::Value;

use super::{Message, OperationError, OperationResult};
use crate::db::{Row, Session, SqlFragment, Statement};

/// Kind of view to create or drop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewKind {
    Simple,
    Materialized,
    Updatable,
    /// Recursion lives in the definition (`WITH RECURSIVE ...`)
    Recursive,
}

impl ViewKind {
    /// Capitalised name used in status messages
    pub fn label(&self) -> &'static str {
        match self {
            ViewKind::Simple => "Simple",
            ViewKind::Materialized => "Materialized",
            ViewKind::Updatable => "Updatable",
            ViewKind::Recursive => "Recursive",
        }
    }
}

impl FromStr for ViewKind {
    type Err = OperationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "simple" => Ok(ViewKind::Simple),
            "materialized" => Ok(ViewKind::Materialized),
            "updatable" => Ok(ViewKind::Updatable),
            "recursive" => Ok(ViewKind::Recursive),
            _ => Err(OperationError::validation(
                "Invalid view type. Choose from 'simple', 'materialized', 'updatable', 'recursive'.",
            )),
        }
    }
}

// ==================
// Request Types
// ==================

#[derive(Debug, Clone, Deserialize)]
pub struct CreateViewRequest {
    pub view_type: String,
    pub view_name: SqlFragment,
    /// The defining `SELECT`
    pub definition: SqlFragment,
    /// Only honoured for updatable views
    #[serde(default)]
    pub with_check_option: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DropViewRequest {
    pub view_type: String,
    pub view_name: SqlFragment,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RefreshViewRequest {
    pub view_name: SqlFragment,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RenameViewRequest {
    pub old_name: SqlFragment,
    pub new_name: SqlFragment,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModifyViewRequest {
    pub view_name: SqlFragment,
    pub select_query: SqlFragment,
}

/// Values in the view's column order
#[derive(Debug, Clone, Deserialize)]
pub struct InsertViewRequest {
    pub values: Vec<Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateViewRequest {
    pub set_clause: SqlFragment,
    pub condition: SqlFragment,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeleteViewRequest {
    pub condition: SqlFragment,
}

// ==================
// Statements
// ==================

pub fn create_view_statement(request: &CreateViewRequest) -> OperationResult<(ViewKind, Statement)> {
    let kind: ViewKind = request.view_type.parse()?;

    let mut stmt = match kind {
        ViewKind::Materialized => Statement::raw("CREATE MATERIALIZED VIEW "),
        _ => Statement::raw("CREATE VIEW "),
    };
    stmt.push_fragment(&request.view_name);
    stmt.push_str(" AS ");
    stmt.push_fragment(&request.definition);
    if kind == ViewKind::Updatable && request.with_check_option {
        stmt.push_str(" WITH CHECK OPTION");
    }
    Ok((kind, stmt))
}

pub fn drop_view_statement(request: &DropViewRequest) -> OperationResult<(ViewKind, Statement)> {
    let kind: ViewKind = request.view_type.parse()?;

    let mut stmt = match kind {
        ViewKind::Materialized => Statement::raw("DROP MATERIALIZED VIEW IF EXISTS "),
        _ => Statement::raw("DROP VIEW IF EXISTS "),
    };
    stmt.push_fragment(&request.view_name);
    stmt.push_str(" CASCADE");
    Ok((kind, stmt))
}

fn prefixed(prefix: &str, name: &SqlFragment) -> Statement {
    let mut stmt = Statement::raw(prefix);
    stmt.push_fragment(name);
    stmt
}

// ==================
// Definition
// ==================

pub async fn create_view(
    session: &mut dyn Session,
    request: &CreateViewRequest,
) -> OperationResult<Message> {
    let (kind, stmt) = create_view_statement(request)?;
    session.execute(&stmt).await?;
    Ok(Message::new(format!(
        "{} view '{}' created successfully.",
        kind.label(),
        request.view_name
    )))
}

pub async fn drop_view(session: &mut dyn Session, request: &DropViewRequest) -> OperationResult<Message> {
    let (kind, stmt) = drop_view_statement(request)?;
    session.execute(&stmt).await?;
    Ok(Message::new(format!(
        "{} view '{}' dropped successfully.",
        kind.label(),
        request.view_name
    )))
}

pub async fn refresh_view(session: &mut dyn Session, name: &SqlFragment) -> OperationResult<Message> {
    session
        .execute(&prefixed("REFRESH MATERIALIZED VIEW ", name))
        .await?;
    Ok(Message::new(format!(
        "Materialized view '{name}' refreshed successfully."
    )))
}

pub async fn rename_view(
    session: &mut dyn Session,
    request: &RenameViewRequest,
) -> OperationResult<Message> {
    let mut stmt = prefixed("ALTER VIEW ", &request.old_name);
    stmt.push_str(" RENAME TO ");
    stmt.push_fragment(&request.new_name);
    session.execute(&stmt).await?;
    Ok(Message::new(format!(
        "View '{}' renamed to '{}' successfully.",
        request.old_name, request.new_name
    )))
}

pub async fn modify_view(
    session: &mut dyn Session,
    request: &ModifyViewRequest,
) -> OperationResult<Message> {
    let mut stmt = prefixed("CREATE OR REPLACE VIEW ", &request.view_name);
    stmt.push_str(" AS ");
    stmt.push_fragment(&request.select_query);
    session.execute(&stmt).await?;
    Ok(Message::new(format!(
        "View '{}' modified successfully.",
        request.view_name
    )))
}

// ==================
// Contents
// ==================

const LIST_VIEWS: &str = "SELECT schemaname, viewname, definition FROM pg_views \
     WHERE schemaname NOT IN ('pg_catalog', 'information_schema')";

pub async fn list_views(session: &mut dyn Session) -> OperationResult<Vec<Row>> {
    Ok(session.query(&Statement::raw(LIST_VIEWS)).await?)
}

pub async fn view_data(session: &mut dyn Session, name: &SqlFragment) -> OperationResult<Vec<Row>> {
    Ok(session.query(&prefixed("SELECT * FROM ", name)).await?)
}

pub async fn filter_view(
    session: &mut dyn Session,
    name: &SqlFragment,
    condition: &SqlFragment,
) -> OperationResult<Vec<Row>> {
    let mut stmt = prefixed("SELECT * FROM ", name);
    stmt.push_str(" WHERE ");
    stmt.push_fragment(condition);
    Ok(session.query(&stmt).await?)
}

pub async fn join_view(
    session: &mut dyn Session,
    name: &SqlFragment,
    table: &SqlFragment,
    condition: &SqlFragment,
) -> OperationResult<Vec<Row>> {
    let mut stmt = prefixed("SELECT * FROM ", name);
    stmt.push_str(" JOIN ");
    stmt.push_fragment(table);
    stmt.push_str(" ON ");
    stmt.push_fragment(condition);
    Ok(session.query(&stmt).await?)
}

pub fn insert_view_statement(name: &SqlFragment, values: &[Value]) -> Statement {
    let mut stmt = prefixed("INSERT INTO ", name);
    stmt.push_str(" VALUES (");
    stmt.push_iter(values, ", ", |s, v| s.push_param(v.clone()));
    stmt.push_str(")");
    stmt
}

pub async fn insert_into_view(
    session: &mut dyn Session,
    name: &SqlFragment,
    request: &InsertViewRequest,
) -> OperationResult<Message> {
    if request.values.is_empty() {
        return Err(OperationError::validation("No values provided for insertion."));
    }
    session
        .execute(&insert_view_statement(name, &request.values))
        .await?;
    Ok(Message::new(format!(
        "Inserted into view '{name}' successfully."
    )))
}

pub async fn update_view(
    session: &mut dyn Session,
    name: &SqlFragment,
    request: &UpdateViewRequest,
) -> OperationResult<Message> {
    let mut stmt = prefixed("UPDATE ", name);
    stmt.push_str(" SET ");
    stmt.push_fragment(&request.set_clause);
    stmt.push_str(" WHERE ");
    stmt.push_fragment(&request.condition);
    session.execute(&stmt).await?;
    Ok(Message::new(format!("Updated view '{name}' successfully.")))
}

pub async fn delete_from_view(
    session: &mut dyn Session,
    name: &SqlFragment,
    request: &DeleteViewRequest,
) -> OperationResult<Message> {
    let mut stmt = prefixed("DELETE FROM ", name);
    stmt.push_str(" WHERE ");
    stmt.push_fragment(&request.condition);
    session.execute(&stmt).await?;
    Ok(Message::new(format!(
        "Deleted from view '{name}' successfully."
    )))
}
