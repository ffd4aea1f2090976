use std::sync::Arc;

use crate::task::{RetryPolicy, Task};

/// A registered task together with its per-task execution policy.
///
/// Edges live in the graph topology, not here, so a slot stays valid no
/// matter how the surrounding graph is wired.
#[derive(Clone)]
pub(crate) struct TaskSlot {
    /// The actual task implementation
    pub task: Arc<dyn Task>,
    /// Policy for retrying the task on failure
    pub retry_policy: RetryPolicy,
}
