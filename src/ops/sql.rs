use async_trait::async_trait;
use log::debug;
use std::sync::Arc;

use crate::backend::SqlBackend;
use crate::engine::RunContext;
use crate::error::TaskError;
use crate::task::Task;

/// Runs one fixed SQL statement, e.g. a CREATE TABLE.
pub struct SqlTask {
    backend: Arc<dyn SqlBackend>,
    statement: String,
}

impl SqlTask {
    pub fn new(backend: Arc<dyn SqlBackend>, statement: impl Into<String>) -> Self {
        Self {
            backend,
            statement: statement.into(),
        }
    }
}

#[async_trait]
impl Task for SqlTask {
    async fn execute(&self, _ctx: &RunContext, _attempt: u32) -> Result<(), TaskError> {
        debug!("Running SQL statement");
        self.backend.execute(&self.statement).await?;
        Ok(())
    }
}
