//! Shared handler state

use std::sync::Arc;

use crate::db::{Database, Session};

use super::errors::ApiResult;

/// Database handle shared by every router
#[derive(Clone)]
pub struct DatabaseState {
    pub db: Arc<dyn Database>,
}

impl DatabaseState {
    pub fn new(db: Arc<dyn Database>) -> Self {
        Self { db }
    }

    /// Check out a session for one request
    pub async fn session(&self) -> ApiResult<Box<dyn Session>> {
        Ok(self.db.session().await?)
    }
}
