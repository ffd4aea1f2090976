use async_trait::async_trait;
use log::info;
use std::sync::Arc;

use crate::backend::SqlBackend;
use crate::engine::RunContext;
use crate::error::TaskError;
use crate::task::Task;

/// Appends rows to a fact table from a SELECT over the staging tables.
///
/// Fact tables only ever grow; there is no replace mode here.
pub struct LoadFactTask {
    backend: Arc<dyn SqlBackend>,
    table: String,
    columns: String,
    select_sql: String,
}

impl LoadFactTask {
    pub fn new(
        backend: Arc<dyn SqlBackend>,
        table: impl Into<String>,
        columns: impl Into<String>,
        select_sql: impl Into<String>,
    ) -> Self {
        Self {
            backend,
            table: table.into(),
            columns: columns.into(),
            select_sql: select_sql.into(),
        }
    }
}

#[async_trait]
impl Task for LoadFactTask {
    async fn execute(&self, _ctx: &RunContext, _attempt: u32) -> Result<(), TaskError> {
        info!("Loading fact table '{}'", self.table);

        let statement = format!(
            "INSERT INTO {} ({}) {}",
            self.table, self.columns, self.select_sql
        );
        let inserted = self
            .backend
            .execute(&statement)
            .await
            .map_err(|e| TaskError::Load(format!("loading fact '{}': {}", self.table, e)))?;

        info!(
            "Loaded fact table '{}' ({} rows affected)",
            self.table, inserted
        );
        Ok(())
    }
}
