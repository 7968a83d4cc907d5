//! # Trusted SQL Fragments
//!
//! Caller-supplied SQL text that is spliced into statements as-is.
//!
//! Identifiers, operators, column types and clause bodies (join conditions,
//! `WHERE`/`HAVING`/`ORDER BY`/`SET` text) arrive from the caller and are
//! interpolated verbatim. They are never quoted or escaped: callers rely on
//! being able to pass expressions such as `lower(name)` or `a.id = b.a_id`.
//! Values go through bound parameters instead (see [`super::Statement`]).

use std::fmt;

use serde::{Deserialize, Serialize};

/// Raw SQL text supplied by the caller and trusted as-is
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SqlFragment(String);

impl SqlFragment {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for SqlFragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SqlFragment {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

impl From<String> for SqlFragment {
    fn from(text: String) -> Self {
        Self(text)
    }
}

/// Quote a value as a SQL string literal (`'it''s'`).
///
/// Used for the few utility statements that take a string literal and
/// cannot take a bound parameter (`NOTIFY`, `PREPARE TRANSACTION`, ...).
pub fn quote_literal(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('\'');
    for c in value.chars() {
        if c == '\'' {
            quoted.push('\'');
        }
        quoted.push(c);
    }
    quoted.push('\'');
    quoted
}
