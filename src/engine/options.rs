use crate::task::RetryPolicy;

/// Knobs for running a pipeline.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Maximum number of concurrently executing task attempts. `None` runs
    /// every ready task at once.
    pub max_concurrency: Option<usize>,
}

impl RunOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_concurrency(mut self, value: usize) -> Self {
        self.max_concurrency = Some(value);
        self
    }
}

/// Defaults applied to every task registered without an explicit policy.
#[derive(Debug, Clone, Default)]
pub struct PipelineDefaults {
    pub retry_policy: RetryPolicy,
}

impl PipelineDefaults {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_retry_policy(mut self, value: RetryPolicy) -> Self {
        self.retry_policy = value;
        self
    }
}
