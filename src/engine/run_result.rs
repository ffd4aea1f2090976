use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

use super::task_status::TaskStatus;
use crate::error::TaskError;

/// Overall outcome of a pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    /// Every task succeeded.
    Success,
    /// At least one task failed; its downstream tasks were skipped.
    Failed,
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunStatus::Success => write!(f, "success"),
            RunStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Final record for one task within a run.
#[derive(Debug, Clone, Serialize)]
pub struct TaskReport {
    pub status: TaskStatus,
    /// Number of times the task action was invoked. Zero for skipped tasks.
    pub attempts: u32,
    /// The error that exhausted the retry budget, for failed tasks.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<TaskError>,
}

impl TaskReport {
    pub(crate) fn pending() -> Self {
        Self {
            status: TaskStatus::Pending,
            attempts: 0,
            error: None,
        }
    }
}

/// Aggregated outcome of one run of a finalized pipeline.
///
/// Task ids map to their reports in lexicographic order, so serialized
/// output is stable across runs.
#[derive(Debug, Clone, Serialize)]
pub struct RunResult {
    pub pipeline_id: String,
    pub run_id: String,
    pub status: RunStatus,
    pub tasks: BTreeMap<String, TaskReport>,
}

impl RunResult {
    pub fn is_success(&self) -> bool {
        self.status == RunStatus::Success
    }

    pub fn status_of(&self, task_id: &str) -> Option<TaskStatus> {
        self.tasks.get(task_id).map(|report| report.status)
    }

    pub fn report_of(&self, task_id: &str) -> Option<&TaskReport> {
        self.tasks.get(task_id)
    }
}
