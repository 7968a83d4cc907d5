//! # Statement Builder
//!
//! A SQL string with `$n` placeholders plus the JSON values bound to them.

use serde_json::Value;

use super::fragment::{quote_literal, SqlFragment};

/// A SQL statement ready to be sent to the server
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Statement {
    /// SQL text with `$1`, `$2`, ... placeholders
    sql: String,
    /// Bound values, in placeholder order
    params: Vec<Value>,
    /// Byte range of each emitted placeholder within `sql`
    placeholders: Vec<(usize, usize)>,
}

impl Statement {
    pub fn new() -> Self {
        Self::default()
    }

    /// A statement with no parameters
    pub fn raw(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            ..Self::default()
        }
    }

    /// Append plain SQL text
    pub fn push_str(&mut self, s: impl AsRef<str>) {
        self.sql.push_str(s.as_ref());
    }

    /// Append a trusted caller fragment
    pub fn push_fragment(&mut self, fragment: &SqlFragment) {
        self.sql.push_str(fragment.as_str());
    }

    /// Bind a value and append its placeholder
    pub fn push_param(&mut self, value: Value) {
        self.params.push(value);
        let start = self.sql.len();
        self.sql.push('$');
        self.sql.push_str(&self.params.len().to_string());
        self.placeholders.push((start, self.sql.len()));
    }

    /// Append the elements of an iterator separated by `sep`, letting
    /// `push_elem` decide how each one is written.
    pub fn push_iter<T>(
        &mut self,
        iter: impl IntoIterator<Item = T>,
        sep: &str,
        mut push_elem: impl FnMut(&mut Self, T),
    ) {
        for (i, item) in iter.into_iter().enumerate() {
            if i > 0 {
                self.sql.push_str(sep);
            }
            push_elem(self, item);
        }
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn params(&self) -> &[Value] {
        &self.params
    }

    /// Render the statement with every bound placeholder replaced by the
    /// literal form of its value. `$` text that arrived through raw SQL or a
    /// fragment is left alone. For display only; never sent to the server.
    pub fn render(&self) -> String {
        let mut rendered = String::with_capacity(self.sql.len());
        let mut copied = 0;

        for (&(start, end), value) in self.placeholders.iter().zip(&self.params) {
            rendered.push_str(&self.sql[copied..start]);
            rendered.push_str(&render_literal(value));
            copied = end;
        }
        rendered.push_str(&self.sql[copied..]);

        rendered
    }
}

/// Literal form of a bound value
pub fn render_literal(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => quote_literal(s),
        Value::Array(_) | Value::Object(_) => quote_literal(&value.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_push_param_numbers_placeholders() {
        let mut stmt = Statement::raw("SELECT * FROM t WHERE a = ");
        stmt.push_param(json!(1));
        stmt.push_str(" AND b = ");
        stmt.push_param(json!("x"));

        assert_eq!(stmt.sql(), "SELECT * FROM t WHERE a = $1 AND b = $2");
        assert_eq!(stmt.params(), &[json!(1), json!("x")]);
    }

    #[test]
    fn test_render_substitutes_literals() {
        let mut stmt = Statement::raw("SELECT * FROM t WHERE name = ");
        stmt.push_param(json!("O'Brien"));
        stmt.push_str(" AND flag = ");
        stmt.push_param(json!(true));
        stmt.push_str(" AND gone = ");
        stmt.push_param(Value::Null);

        assert_eq!(
            stmt.render(),
            "SELECT * FROM t WHERE name = 'O''Brien' AND flag = true AND gone = NULL"
        );
    }

    #[test]
    fn test_render_handles_two_digit_placeholders() {
        let mut stmt = Statement::new();
        stmt.push_iter(1..=11, ", ", |s, n| s.push_param(json!(n)));

        assert!(stmt.sql().ends_with("$10, $11"));
        assert_eq!(stmt.render(), "1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11");
    }

    #[test]
    fn test_render_leaves_fragment_dollars_alone() {
        let mut stmt = Statement::raw("ALTER TABLE t ALTER COLUMN c SET DEFAULT ");
        stmt.push_fragment(&SqlFragment::new("$1 costs $$5$$"));
        stmt.push_str(" WHERE x = ");
        stmt.push_param(json!(9));

        assert_eq!(
            stmt.sql(),
            "ALTER TABLE t ALTER COLUMN c SET DEFAULT $1 costs $$5$$ WHERE x = $1"
        );
        assert_eq!(
            stmt.render(),
            "ALTER TABLE t ALTER COLUMN c SET DEFAULT $1 costs $$5$$ WHERE x = 9"
        );
    }

    #[test]
    fn test_render_keeps_unbound_dollars() {
        let stmt = Statement::raw("SELECT $$text$$, $3");
        assert_eq!(stmt.render(), "SELECT $$text$$, $3");
    }
}
