use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::backend::SqlBackend;
use crate::error::BackendError;

struct ScriptedFailure {
    fragment: String,
    /// `None` fails every matching statement; `Some(n)` fails the next n.
    remaining: Option<usize>,
}

/// In-memory implementation of SqlBackend for testing.
///
/// Records every submitted statement in order, and can be scripted to
/// return scalar values or fail statements matching a substring.
#[derive(Clone, Default)]
pub struct MemoryBackend {
    executed: Arc<Mutex<Vec<String>>>,
    scalars: Arc<Mutex<HashMap<String, i64>>>,
    failures: Arc<Mutex<Vec<ScriptedFailure>>>,
}

impl MemoryBackend {
    /// Create a new empty memory backend
    pub fn new() -> Self {
        Self::default()
    }

    /// Every statement submitted so far, in submission order
    pub fn statements(&self) -> Vec<String> {
        self.executed.lock().unwrap().clone()
    }

    /// Submitted statements containing the given fragment
    pub fn statements_matching(&self, fragment: &str) -> Vec<String> {
        self.executed
            .lock()
            .unwrap()
            .iter()
            .filter(|statement| statement.contains(fragment))
            .cloned()
            .collect()
    }

    /// Position of the first submitted statement containing the fragment
    pub fn position_of(&self, fragment: &str) -> Option<usize> {
        self.executed
            .lock()
            .unwrap()
            .iter()
            .position(|statement| statement.contains(fragment))
    }

    /// Script the scalar returned for an exact statement
    pub fn set_scalar(&self, statement: impl Into<String>, value: i64) {
        self.scalars.lock().unwrap().insert(statement.into(), value);
    }

    /// Fail the next `times` statements containing the fragment
    pub fn fail_times(&self, fragment: impl Into<String>, times: usize) {
        self.failures.lock().unwrap().push(ScriptedFailure {
            fragment: fragment.into(),
            remaining: Some(times),
        });
    }

    /// Fail every statement containing the fragment
    pub fn fail_always(&self, fragment: impl Into<String>) {
        self.failures.lock().unwrap().push(ScriptedFailure {
            fragment: fragment.into(),
            remaining: None,
        });
    }

    fn record(&self, statement: &str) {
        self.executed.lock().unwrap().push(statement.to_string());
    }

    fn check_failure(&self, statement: &str) -> Result<(), BackendError> {
        let mut failures = self.failures.lock().unwrap();
        for failure in failures.iter_mut() {
            if !statement.contains(&failure.fragment) {
                continue;
            }
            match failure.remaining {
                Some(0) => continue,
                Some(ref mut left) => {
                    *left -= 1;
                    return Err(BackendError::Unavailable(format!(
                        "scripted failure for '{}'",
                        failure.fragment
                    )));
                }
                None => {
                    return Err(BackendError::Unavailable(format!(
                        "scripted failure for '{}'",
                        failure.fragment
                    )));
                }
            }
        }
        Ok(())
    }
}

#[async_trait]
impl SqlBackend for MemoryBackend {
    async fn execute(&self, statement: &str) -> Result<u64, BackendError> {
        // Failed submissions are recorded too, so tests can count attempts
        self.record(statement);
        self.check_failure(statement)?;
        Ok(0)
    }

    async fn fetch_scalar(&self, statement: &str) -> Result<Option<i64>, BackendError> {
        self.record(statement);
        self.check_failure(statement)?;
        Ok(self.scalars.lock().unwrap().get(statement).copied())
    }
}
