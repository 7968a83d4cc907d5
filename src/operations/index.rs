//! # Index Operations

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

use super::{Message, OperationError, OperationResult};
use crate::db::{Row, Session, SqlFragment, Statement};

/// Index access methods that may be requested
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexMethod {
    BTree,
    Hash,
    Gin,
    Gist,
    SpGist,
    Brin,
}

impl IndexMethod {
    pub fn as_sql(&self) -> &'static str {
        match self {
            IndexMethod::BTree => "BTREE",
            IndexMethod::Hash => "HASH",
            IndexMethod::Gin => "GIN",
            IndexMethod::Gist => "GIST",
            IndexMethod::SpGist => "SPGIST",
            IndexMethod::Brin => "BRIN",
        }
    }
}

impl FromStr for IndexMethod {
    type Err = OperationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "BTREE" => Ok(IndexMethod::BTree),
            "HASH" => Ok(IndexMethod::Hash),
            "GIN" => Ok(IndexMethod::Gin),
            "GIST" => Ok(IndexMethod::Gist),
            "SPGIST" => Ok(IndexMethod::SpGist),
            "BRIN" => Ok(IndexMethod::Brin),
            _ => Err(OperationError::validation("Invalid index type specified.")),
        }
    }
}

impl fmt::Display for IndexMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateIndexRequest {
    pub index_name: SqlFragment,
    pub table_name: SqlFragment,
    pub column_name: SqlFragment,
    pub index_type: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DropIndexRequest {
    pub index_name: SqlFragment,
}

const LIST_INDEXES: &str = "SELECT indexname, tablename, indexdef FROM pg_indexes \
     WHERE schemaname NOT IN ('pg_catalog', 'information_schema')";

pub fn create_index_statement(request: &CreateIndexRequest) -> OperationResult<Statement> {
    let method: IndexMethod = request.index_type.parse()?;

    let mut stmt = Statement::raw("CREATE INDEX ");
    stmt.push_fragment(&request.index_name);
    stmt.push_str(" ON ");
    stmt.push_fragment(&request.table_name);
    stmt.push_str(format!(" USING {method} ("));
    stmt.push_fragment(&request.column_name);
    stmt.push_str(")");
    Ok(stmt)
}

pub async fn create_index(
    session: &mut dyn Session,
    request: &CreateIndexRequest,
) -> OperationResult<Message> {
    let stmt = create_index_statement(request)?;
    session.execute(&stmt).await?;
    Ok(Message::new(format!(
        "Index '{}' created successfully.",
        request.index_name
    )))
}

pub async fn drop_index(session: &mut dyn Session, name: &SqlFragment) -> OperationResult<Message> {
    let mut stmt = Statement::raw("DROP INDEX IF EXISTS ");
    stmt.push_fragment(name);
    session.execute(&stmt).await?;
    Ok(Message::new(format!("Index '{name}' dropped successfully.")))
}

/// `{indexname, tablename, indexdef}` for every user index
pub async fn list_indexes(session: &mut dyn Session) -> OperationResult<Vec<Row>> {
    Ok(session.query(&Statement::raw(LIST_INDEXES)).await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(method: &str) -> CreateIndexRequest {
        CreateIndexRequest {
            index_name: "idx_users_email".into(),
            table_name: "users".into(),
            column_name: "email".into(),
            index_type: method.to_string(),
        }
    }

    #[test]
    fn test_method_parsing_is_case_insensitive() {
        assert_eq!("btree".parse::<IndexMethod>().unwrap(), IndexMethod::BTree);
        assert_eq!("SpGist".parse::<IndexMethod>().unwrap(), IndexMethod::SpGist);
        assert!("FOOBAR".parse::<IndexMethod>().is_err());
    }

    #[test]
    fn test_create_index_statement() {
        let stmt = create_index_statement(&request("gin")).unwrap();
        assert_eq!(
            stmt.sql(),
            "CREATE INDEX idx_users_email ON users USING GIN (email)"
        );
    }

    #[test]
    fn test_invalid_method_builds_nothing() {
        let err = create_index_statement(&request("FOOBAR")).unwrap_err();
        assert!(matches!(err, OperationError::Validation(_)));
        assert_eq!(err.to_string(), "Invalid index type specified.");
    }
}
