//! # Scripted Database
//!
//! In-process `Database` that records every statement it receives and
//! answers from a script of canned responses. Used by the test suites and
//! by anything that needs to exercise the HTTP surface without a server.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use serde_json::Value;

use super::errors::{DbError, DbResult};
use super::statement::Statement;
use super::{Database, Row, Session};

#[derive(Debug, Clone)]
enum Response {
    Rows(Vec<Row>),
    Affected(u64),
    Fail(String),
}

#[derive(Debug)]
struct Rule {
    needle: String,
    responses: VecDeque<Response>,
}

impl Rule {
    /// The last queued response repeats forever.
    fn next(&mut self) -> Response {
        if self.responses.len() > 1 {
            if let Some(response) = self.responses.pop_front() {
                return response;
            }
        }
        self.responses
            .front()
            .cloned()
            .unwrap_or(Response::Affected(0))
    }
}

#[derive(Debug, Default)]
struct Script {
    rules: Vec<Rule>,
    statements: Vec<Statement>,
    sessions: usize,
}

impl Script {
    fn respond(&mut self, sql: &str) -> Option<Response> {
        self.rules
            .iter_mut()
            .rev()
            .find(|rule| sql.contains(&rule.needle))
            .map(Rule::next)
    }

    fn push(&mut self, needle: &str, response: Response) {
        match self.rules.iter_mut().find(|rule| rule.needle == needle) {
            Some(rule) => rule.responses.push_back(response),
            None => self.rules.push(Rule {
                needle: needle.to_string(),
                responses: VecDeque::from([response]),
            }),
        }
    }
}

/// Fake database driven by SQL substring matches
#[derive(Debug, Clone, Default)]
pub struct ScriptedDatabase {
    script: Arc<Mutex<Script>>,
}

impl ScriptedDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer queries containing `needle` with `rows`, which must be a json
    /// array of objects. Calling this again for the same needle queues a
    /// further response.
    pub fn on_query(&self, needle: &str, rows: Value) -> &Self {
        let rows = match rows {
            Value::Array(items) => items
                .into_iter()
                .filter_map(|item| match item {
                    Value::Object(map) => Some(map),
                    _ => None,
                })
                .collect(),
            _ => Vec::new(),
        };
        self.lock().push(needle, Response::Rows(rows));
        self
    }

    /// Answer commands containing `needle` with an affected-row count
    pub fn on_execute(&self, needle: &str, affected: u64) -> &Self {
        self.lock().push(needle, Response::Affected(affected));
        self
    }

    /// Fail any statement containing `needle`
    pub fn fail_on(&self, needle: &str, message: &str) -> &Self {
        self.lock()
            .push(needle, Response::Fail(message.to_string()));
        self
    }

    /// Every statement received, in order
    pub fn statements(&self) -> Vec<Statement> {
        self.lock().statements.clone()
    }

    /// SQL text of every statement received, in order
    pub fn executed_sql(&self) -> Vec<String> {
        self.lock()
            .statements
            .iter()
            .map(|s| s.sql().to_string())
            .collect()
    }

    pub fn sessions_opened(&self) -> usize {
        self.lock().sessions
    }

    fn lock(&self) -> MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl Database for ScriptedDatabase {
    async fn session(&self) -> DbResult<Box<dyn Session>> {
        self.lock().sessions += 1;
        Ok(Box::new(ScriptedSession {
            script: Arc::clone(&self.script),
        }))
    }
}

struct ScriptedSession {
    script: Arc<Mutex<Script>>,
}

impl ScriptedSession {
    fn record(&self, statement: &Statement) -> Option<Response> {
        let mut script = self.script.lock().unwrap_or_else(|e| e.into_inner());
        script.statements.push(statement.clone());
        script.respond(statement.sql())
    }
}

#[async_trait]
impl Session for ScriptedSession {
    async fn query(&mut self, statement: &Statement) -> DbResult<Vec<Row>> {
        match self.record(statement) {
            Some(Response::Rows(rows)) => Ok(rows),
            Some(Response::Fail(message)) => Err(DbError::Execution(message)),
            Some(Response::Affected(_)) | None => Ok(Vec::new()),
        }
    }

    async fn execute(&mut self, statement: &Statement) -> DbResult<u64> {
        match self.record(statement) {
            Some(Response::Affected(n)) => Ok(n),
            Some(Response::Rows(rows)) => Ok(rows.len() as u64),
            Some(Response::Fail(message)) => Err(DbError::Execution(message)),
            None => Ok(0),
        }
    }
}
