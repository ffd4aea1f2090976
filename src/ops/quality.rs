use async_trait::async_trait;
use log::info;
use std::sync::Arc;

use crate::backend::SqlBackend;
use crate::engine::RunContext;
use crate::error::TaskError;
use crate::task::Task;

/// Runs a scalar check query and compares the result to an expected value.
///
/// A transport problem surfaces as [`TaskError::Backend`]; a query that runs
/// but yields no rows or the wrong value is a [`TaskError::DataQuality`]
/// verdict.
pub struct QualityCheckTask {
    backend: Arc<dyn SqlBackend>,
    check_sql: String,
    expected_value: String,
    description: String,
}

impl QualityCheckTask {
    pub fn new(
        backend: Arc<dyn SqlBackend>,
        check_sql: impl Into<String>,
        expected_value: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            backend,
            check_sql: check_sql.into(),
            expected_value: expected_value.into(),
            description: description.into(),
        }
    }
}

#[async_trait]
impl Task for QualityCheckTask {
    async fn execute(&self, _ctx: &RunContext, _attempt: u32) -> Result<(), TaskError> {
        info!(
            "Running data quality check '{}' (expecting {})",
            self.description, self.expected_value
        );

        let actual = self.backend.fetch_scalar(&self.check_sql).await?;

        let actual = actual.ok_or_else(|| {
            TaskError::DataQuality(format!(
                "check '{}' returned no rows",
                self.description
            ))
        })?;

        let expected: i64 = self.expected_value.parse().map_err(|_| {
            TaskError::DataQuality(format!(
                "check '{}' has a non-numeric expected value '{}'",
                self.description, self.expected_value
            ))
        })?;

        if actual != expected {
            return Err(TaskError::DataQuality(format!(
                "check '{}' expected {}, got {}",
                self.description, expected, actual
            )));
        }

        info!(
            "Data quality check '{}' passed (value {})",
            self.description, actual
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;
    use chrono::Utc;

    const CHECK: &str = "SELECT COUNT(*) FROM songplays";

    fn context() -> RunContext {
        RunContext::new("run_quality", Utc::now())
    }

    #[tokio::test]
    async fn test_passes_on_expected_value() {
        let backend = Arc::new(MemoryBackend::new());
        backend.set_scalar(CHECK, 320);

        let task = QualityCheckTask::new(backend, CHECK, "320", "songplays row count");

        assert!(task.execute(&context(), 1).await.is_ok());
    }

    #[tokio::test]
    async fn test_mismatch_is_a_data_quality_error() {
        let backend = Arc::new(MemoryBackend::new());
        backend.set_scalar(CHECK, 319);

        let task = QualityCheckTask::new(backend, CHECK, "320", "songplays row count");

        let result = task.execute(&context(), 1).await;
        assert!(matches!(
            result,
            Err(TaskError::DataQuality(msg)) if msg.contains("expected 320, got 319")
        ));
    }

    #[tokio::test]
    async fn test_no_rows_is_a_data_quality_error() {
        let backend = Arc::new(MemoryBackend::new());

        let task = QualityCheckTask::new(backend, CHECK, "320", "songplays row count");

        let result = task.execute(&context(), 1).await;
        assert!(matches!(
            result,
            Err(TaskError::DataQuality(msg)) if msg.contains("returned no rows")
        ));
    }

    #[tokio::test]
    async fn test_transport_failure_is_a_backend_error() {
        let backend = Arc::new(MemoryBackend::new());
        backend.fail_always("COUNT(*)");

        let task = QualityCheckTask::new(backend, CHECK, "320", "songplays row count");

        let result = task.execute(&context(), 1).await;
        assert!(matches!(result, Err(TaskError::Backend(_))));
    }
}
