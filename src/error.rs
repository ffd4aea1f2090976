use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

/// Errors raised while assembling or finalizing a pipeline graph.
///
/// Construction errors leave the graph unchanged, so a caller can correct
/// the definition and keep going.
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("task id '{0}' is already registered")]
    DuplicateTask(String),

    #[error("edge references unknown task '{0}'")]
    UnknownTask(String),

    /// The offending tasks, lexicographically ordered. A self-edge reports
    /// the single task involved.
    #[error("dependency cycle involving tasks [{}]", .0.join(", "))]
    Cycle(Vec<String>),

    #[error("graph is finalized and can no longer be modified")]
    Frozen,

    #[error("graph must be finalized before it can run")]
    NotFinalized,
}

/// Errors raised by a task action during a run.
///
/// Cloneable so the originating failure can be kept in the run report after
/// the retry loop gives up on it.
#[derive(Debug, Clone, Error, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskError {
    /// The warehouse rejected a statement or the connection dropped.
    #[error("backend failure: {0}")]
    Backend(String),

    /// No usable credentials for the object store.
    #[error("credential failure: {0}")]
    Credential(String),

    /// A staging or load step failed, path templating included.
    #[error("load failure: {0}")]
    Load(String),

    /// A quality check ran but its verdict was not the expected one.
    #[error("data quality failure: {0}")]
    DataQuality(String),

    /// A single attempt exceeded its deadline.
    #[error("attempt exceeded deadline of {0:?}")]
    Timeout(Duration),
}

impl TaskError {
    /// Stable lowercase tag for log lines and assertions.
    pub fn kind(&self) -> &'static str {
        match self {
            TaskError::Backend(_) => "backend",
            TaskError::Credential(_) => "credential",
            TaskError::Load(_) => "load",
            TaskError::DataQuality(_) => "data_quality",
            TaskError::Timeout(_) => "timeout",
        }
    }
}

/// Failures from the SQL backend collaborator.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("query failed: {0}")]
    Query(#[from] sqlx::Error),

    #[error("backend unavailable: {0}")]
    Unavailable(String),
}

impl From<BackendError> for TaskError {
    fn from(err: BackendError) -> Self {
        TaskError::Backend(err.to_string())
    }
}

/// Failures from the credential provider collaborator.
#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("no credentials registered under id '{0}'")]
    Unknown(String),

    #[error("environment variable '{0}' is not set")]
    MissingVar(String),
}

impl From<CredentialError> for TaskError {
    fn from(err: CredentialError) -> Self {
        TaskError::Credential(err.to_string())
    }
}
