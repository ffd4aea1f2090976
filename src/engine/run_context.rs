use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// Per-run metadata shared read-only with every task invocation.
///
/// The logical date identifies the data interval the run covers, which is
/// not necessarily the wall-clock time the run started. Parameters are free
/// string pairs that tasks may substitute into templates.
#[derive(Debug, Clone)]
pub struct RunContext {
    run_id: String,
    logical_date: DateTime<Utc>,
    parameters: HashMap<String, String>,
}

impl RunContext {
    pub fn new(run_id: impl Into<String>, logical_date: DateTime<Utc>) -> Self {
        Self {
            run_id: run_id.into(),
            logical_date,
            parameters: HashMap::new(),
        }
    }

    /// Attach a parameter before the run starts.
    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn logical_date(&self) -> DateTime<Utc> {
        self.logical_date
    }

    pub fn parameter(&self, key: &str) -> Option<&str> {
        self.parameters.get(key).map(String::as_str)
    }

    pub fn parameters(&self) -> &HashMap<String, String> {
        &self.parameters
    }
}
