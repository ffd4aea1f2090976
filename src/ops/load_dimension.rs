use async_trait::async_trait;
use log::info;
use std::sync::Arc;

use crate::backend::SqlBackend;
use crate::engine::RunContext;
use crate::error::TaskError;
use crate::task::Task;

/// What to do with rows already in the dimension table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadMode {
    /// Keep existing rows and insert on top of them.
    Append,
    /// Truncate the table, then insert.
    Replace,
}

/// Populates a dimension table from a SELECT over the staging tables.
pub struct LoadDimensionTask {
    backend: Arc<dyn SqlBackend>,
    table: String,
    select_sql: String,
    mode: LoadMode,
}

impl LoadDimensionTask {
    pub fn new(
        backend: Arc<dyn SqlBackend>,
        table: impl Into<String>,
        select_sql: impl Into<String>,
        mode: LoadMode,
    ) -> Self {
        Self {
            backend,
            table: table.into(),
            select_sql: select_sql.into(),
            mode,
        }
    }
}

#[async_trait]
impl Task for LoadDimensionTask {
    async fn execute(&self, _ctx: &RunContext, _attempt: u32) -> Result<(), TaskError> {
        if self.mode == LoadMode::Replace {
            info!("Truncating dimension table '{}' before loading", self.table);
            self.backend
                .execute(&format!("TRUNCATE TABLE {}", self.table))
                .await
                .map_err(|e| {
                    TaskError::Load(format!("truncating dimension '{}': {}", self.table, e))
                })?;
        } else {
            info!("Appending to dimension table '{}'", self.table);
        }

        let inserted = self
            .backend
            .execute(&format!("INSERT INTO {} {}", self.table, self.select_sql))
            .await
            .map_err(|e| TaskError::Load(format!("loading dimension '{}': {}", self.table, e)))?;

        info!(
            "Loaded dimension table '{}' ({} rows affected)",
            self.table, inserted
        );
        Ok(())
    }
}
