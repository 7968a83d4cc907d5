//! # SELECT Builder
//!
//! Builds a `SELECT` from a structured query descriptor. Filter values are
//! bound as parameters; table, column, operator and clause text are trusted
//! fragments and are spliced in verbatim.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::OperationResult;
use crate::db::{Row, Session, SqlFragment, Statement};

/// Query descriptor accepted by `POST /select/select`
#[derive(Debug, Clone, Deserialize)]
pub struct SelectQuery {
    pub table: SqlFragment,
    #[serde(default)]
    pub columns: Option<Vec<SqlFragment>>,
    /// Column → filter, applied in the given order and joined with `AND`
    #[serde(default, rename = "where")]
    pub filters: Option<IndexMap<String, FilterValue>>,
    #[serde(default)]
    pub order_by: Option<SqlFragment>,
    /// `ASC` or `DESC`, any case; anything else is ignored
    #[serde(default)]
    pub order: Option<String>,
    #[serde(default)]
    pub limit: Option<i64>,
    #[serde(default)]
    pub offset: Option<i64>,
    #[serde(default)]
    pub group_by: Option<SqlFragment>,
    #[serde(default)]
    pub having: Option<SqlFragment>,
    #[serde(default)]
    pub distinct: bool,
    #[serde(default)]
    pub join: Option<Vec<JoinClause>>,
    /// Column → aggregate function. Replaces the column list when present.
    #[serde(default)]
    pub aggregate: Option<IndexMap<String, SqlFragment>>,
}

/// One filter entry: a bare value means equality, a two-element
/// `[operator, value]` array picks the operator.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "Value")]
pub enum FilterValue {
    Equals(Value),
    Operator(SqlFragment, Value),
}

impl From<Value> for FilterValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Array(mut pair) if pair.len() == 2 && pair[0].is_string() => {
                let operand = pair.pop().unwrap_or(Value::Null);
                match pair.pop() {
                    Some(Value::String(op)) => FilterValue::Operator(SqlFragment::new(op), operand),
                    _ => FilterValue::Equals(operand),
                }
            }
            other => FilterValue::Equals(other),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct JoinClause {
    #[serde(default = "default_join_type")]
    pub join_type: SqlFragment,
    pub join_table: SqlFragment,
    #[serde(default)]
    pub condition: Option<SqlFragment>,
}

fn default_join_type() -> SqlFragment {
    SqlFragment::new("INNER JOIN")
}

/// Rows plus the statement with its literals filled in
#[derive(Debug, Clone, Serialize)]
pub struct SelectOutput {
    pub data: Vec<Row>,
    pub query: String,
}

pub fn build_select(query: &SelectQuery) -> Statement {
    let mut stmt = Statement::raw("SELECT ");

    if query.distinct {
        stmt.push_str("DISTINCT ");
    }

    match (&query.aggregate, &query.columns) {
        (Some(aggregate), _) if !aggregate.is_empty() => {
            stmt.push_iter(aggregate, ", ", |s, (col, func)| {
                s.push_str(format!("{func}({col}) AS \"{col}_{func}\""));
            });
        }
        (_, Some(columns)) if !columns.is_empty() => {
            stmt.push_iter(columns, ", ", |s, col| s.push_fragment(col));
        }
        _ => stmt.push_str("*"),
    }

    stmt.push_str(" FROM ");
    stmt.push_fragment(&query.table);

    for join in query.join.iter().flatten() {
        stmt.push_str(" ");
        stmt.push_fragment(&join.join_type);
        stmt.push_str(" ");
        stmt.push_fragment(&join.join_table);

        let is_cross = join.join_type.as_str().trim().eq_ignore_ascii_case("CROSS JOIN");
        if !is_cross {
            stmt.push_str(" ON ");
            if let Some(condition) = &join.condition {
                stmt.push_fragment(condition);
            }
        }
    }

    if let Some(filters) = query.filters.as_ref().filter(|f| !f.is_empty()) {
        stmt.push_str(" WHERE ");
        stmt.push_iter(filters, " AND ", |s, (col, filter)| {
            s.push_str(col);
            match filter {
                FilterValue::Equals(value) => {
                    s.push_str(" = ");
                    s.push_param(value.clone());
                }
                FilterValue::Operator(op, value) => {
                    s.push_str(" ");
                    s.push_fragment(op);
                    s.push_str(" ");
                    s.push_param(value.clone());
                }
            }
        });
    }

    if let Some(group_by) = non_empty(&query.group_by) {
        stmt.push_str(" GROUP BY ");
        stmt.push_fragment(group_by);
    }

    if let Some(having) = non_empty(&query.having) {
        stmt.push_str(" HAVING ");
        stmt.push_fragment(having);
    }

    if let Some(order_by) = non_empty(&query.order_by) {
        stmt.push_str(" ORDER BY ");
        stmt.push_fragment(order_by);

        let direction = query.order.as_deref().map(str::to_ascii_uppercase);
        if let Some(dir @ ("ASC" | "DESC")) = direction.as_deref() {
            stmt.push_str(" ");
            stmt.push_str(dir);
        }
    }

    if let Some(limit) = query.limit {
        stmt.push_str(" LIMIT ");
        stmt.push_param(Value::from(limit));
    }
    if let Some(offset) = query.offset {
        stmt.push_str(" OFFSET ");
        stmt.push_param(Value::from(offset));
    }

    stmt
}

fn non_empty(fragment: &Option<SqlFragment>) -> Option<&SqlFragment> {
    fragment.as_ref().filter(|f| !f.is_empty())
}

pub async fn select(session: &mut dyn Session, query: &SelectQuery) -> OperationResult<SelectOutput> {
    let stmt = build_select(query);
    let data = session.query(&stmt).await?;
    Ok(SelectOutput {
        data,
        query: stmt.render(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(value: Value) -> SelectQuery {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_bare_table() {
        let stmt = build_select(&parse(json!({"table": "users"})));
        assert_eq!(stmt.sql(), "SELECT * FROM users");
        assert!(stmt.params().is_empty());
    }

    #[test]
    fn test_columns_and_distinct() {
        let stmt = build_select(&parse(json!({
            "table": "users",
            "columns": ["id", "lower(name)"],
            "distinct": true
        })));
        assert_eq!(stmt.sql(), "SELECT DISTINCT id, lower(name) FROM users");
    }

    #[test]
    fn test_aggregate_overrides_columns() {
        let stmt = build_select(&parse(json!({
            "table": "orders",
            "columns": ["id"],
            "aggregate": {"amount": "SUM", "id": "COUNT"},
            "group_by": "customer_id"
        })));
        assert_eq!(
            stmt.sql(),
            "SELECT SUM(amount) AS \"amount_SUM\", COUNT(id) AS \"id_COUNT\" \
             FROM orders GROUP BY customer_id"
        );
    }

    #[test]
    fn test_filters_bind_values() {
        let stmt = build_select(&parse(json!({
            "table": "users",
            "where": {"age": [">", 30], "name": "Ada", "tags": ["x", "y", "z"]}
        })));
        assert_eq!(
            stmt.sql(),
            "SELECT * FROM users WHERE age > $1 AND name = $2 AND tags = $3"
        );
        assert_eq!(stmt.params(), &[json!(30), json!("Ada"), json!(["x", "y", "z"])]);
    }

    #[test]
    fn test_filter_value_parsing() {
        assert_eq!(
            FilterValue::from(json!(["LIKE", "A%"])),
            FilterValue::Operator("LIKE".into(), json!("A%"))
        );
        assert_eq!(FilterValue::from(json!([1, 2])), FilterValue::Equals(json!([1, 2])));
        assert_eq!(FilterValue::from(json!(5)), FilterValue::Equals(json!(5)));
    }

    #[test]
    fn test_joins() {
        let stmt = build_select(&parse(json!({
            "table": "a",
            "join": [
                {"join_table": "b", "condition": "a.id = b.a_id"},
                {"join_type": "LEFT JOIN", "join_table": "c", "condition": "c.id = a.c_id"},
                {"join_type": "cross join", "join_table": "d"}
            ]
        })));
        assert_eq!(
            stmt.sql(),
            "SELECT * FROM a INNER JOIN b ON a.id = b.a_id \
             LEFT JOIN c ON c.id = a.c_id cross join d"
        );
    }

    #[test]
    fn test_order_direction_only_when_valid() {
        let desc = build_select(&parse(json!({"table": "t", "order_by": "id", "order": "desc"})));
        assert_eq!(desc.sql(), "SELECT * FROM t ORDER BY id DESC");

        let bogus = build_select(&parse(json!({"table": "t", "order_by": "id", "order": "sideways"})));
        assert_eq!(bogus.sql(), "SELECT * FROM t ORDER BY id");

        let no_order_by = build_select(&parse(json!({"table": "t", "order": "ASC"})));
        assert_eq!(no_order_by.sql(), "SELECT * FROM t");
    }

    #[test]
    fn test_having_limit_offset_rendered() {
        let stmt = build_select(&parse(json!({
            "table": "orders",
            "aggregate": {"amount": "SUM"},
            "where": {"status": "paid"},
            "group_by": "customer_id",
            "having": "SUM(amount) > 100",
            "limit": 10,
            "offset": 20
        })));
        assert_eq!(
            stmt.sql(),
            "SELECT SUM(amount) AS \"amount_SUM\" FROM orders WHERE status = $1 \
             GROUP BY customer_id HAVING SUM(amount) > 100 LIMIT $2 OFFSET $3"
        );
        assert_eq!(
            stmt.render(),
            "SELECT SUM(amount) AS \"amount_SUM\" FROM orders WHERE status = 'paid' \
             GROUP BY customer_id HAVING SUM(amount) > 100 LIMIT 10 OFFSET 20"
        );
    }
}
