use log::{error, info, warn};
use tokio::time::{sleep, timeout};

use super::execution::RunSharedState;
use super::task_slot::TaskSlot;
use crate::error::TaskError;

pub(crate) struct TaskExecutor {
    shared_state: RunSharedState,
}

impl TaskExecutor {
    pub fn new(shared_state: RunSharedState) -> Self {
        Self { shared_state }
    }

    /// Dispatch a ready task onto the runtime.
    pub fn spawn_task(&self, task_id: String) {
        let shared_state = self.shared_state.clone();

        tokio::spawn(async move {
            // Get task details
            let slot = match shared_state.tasks.get(&task_id) {
                Some(slot) => slot.clone(),
                None => {
                    error!("Task '{}' not found in pipeline", task_id);
                    return;
                }
            };

            shared_state.mark_running(&task_id);

            // Execute task with retry logic
            let outcome = Self::execute_with_retry(&task_id, &slot, &shared_state).await;

            let success = match outcome {
                Ok(attempts) => {
                    shared_state.mark_succeeded(&task_id, attempts);
                    true
                }
                Err((error, attempts)) => {
                    shared_state.mark_failed(&task_id, attempts, error);
                    false
                }
            };

            // Signal completion (whether successful or not)
            shared_state.signal_completion(&task_id);

            // Unblock or cancel downstream tasks
            Self::process_downstream_tasks(task_id, shared_state, success);
        });
    }

    /// Run the task action until it succeeds or the retry budget is spent.
    /// Returns the number of attempts used either way.
    async fn execute_with_retry(
        task_id: &str,
        slot: &TaskSlot,
        shared_state: &RunSharedState,
    ) -> Result<u32, (TaskError, u32)> {
        let policy = &slot.retry_policy;
        let max_attempts = policy.max_retries.saturating_add(1); // including the first attempt
        let mut attempt = 0;

        loop {
            attempt += 1;
            info!(
                "Task '{}' starting (attempt {}/{})",
                task_id, attempt, max_attempts
            );
            shared_state.record_attempt(task_id, attempt);

            match Self::run_attempt(slot, shared_state, attempt).await {
                Ok(()) => {
                    info!("Task '{}' succeeded on attempt {}", task_id, attempt);
                    return Ok(attempt);
                }
                Err(e) => {
                    warn!("Task '{}' failed on attempt {}: {}", task_id, attempt, e);

                    // Check if retries remain
                    if attempt < max_attempts {
                        let delay = policy.delay_for(attempt);
                        info!("Retrying task '{}' after {:?}", task_id, delay);
                        sleep(delay).await;
                    } else {
                        error!(
                            "Task '{}' failed after {} attempt(s): {}",
                            task_id, attempt, e
                        );
                        return Err((e, attempt));
                    }
                }
            }
        }
    }

    /// One invocation of the task action, bounded by the per-attempt deadline
    /// when the policy sets one. A concurrency permit covers the attempt
    /// only; backoff sleeps never hold one.
    async fn run_attempt(
        slot: &TaskSlot,
        shared_state: &RunSharedState,
        attempt: u32,
    ) -> Result<(), TaskError> {
        let _permit = match &shared_state.limiter {
            Some(limiter) => match limiter.acquire().await {
                Ok(permit) => Some(permit),
                Err(_) => {
                    return Err(TaskError::Backend(
                        "concurrency limiter closed before the attempt started".into(),
                    ))
                }
            },
            None => None,
        };

        let action = slot.task.execute(&shared_state.context, attempt);
        match slot.retry_policy.attempt_timeout {
            Some(deadline) => match timeout(deadline, action).await {
                Ok(result) => result,
                Err(_) => Err(TaskError::Timeout(deadline)),
            },
            None => action.await,
        }
    }

    fn process_downstream_tasks(
        completed_task_id: String,
        shared_state: RunSharedState,
        success: bool,
    ) {
        // A failed task cancels everything below it instead of unblocking it
        if !success {
            Self::skip_downstream_tasks(&completed_task_id, &shared_state);
            return;
        }

        let mut ready_tasks = Vec::new();

        // Find downstream tasks whose last upstream just finished
        if let Some(downstream) = shared_state.downstreams.get(&completed_task_id) {
            for downstream_id in downstream {
                let is_ready = {
                    let mut remaining = shared_state.remaining_upstreams.lock().unwrap();
                    if let Some(count) = remaining.get_mut(downstream_id) {
                        *count -= 1;
                        *count == 0 // Ready once every upstream has succeeded
                    } else {
                        false
                    }
                };

                if is_ready {
                    ready_tasks.push(downstream_id.clone());
                }
            }
        }

        // Create executor and spawn all newly ready tasks
        let executor = TaskExecutor::new(shared_state);
        for task_id in ready_tasks {
            executor.spawn_task(task_id);
        }
    }

    /// Mark every transitive downstream of a failed task as skipped. Skipped
    /// tasks are never invoked but still signal completion so the run loop
    /// can account for them.
    fn skip_downstream_tasks(failed_task_id: &str, shared_state: &RunSharedState) {
        let mut to_visit: Vec<String> = match shared_state.downstreams.get(failed_task_id) {
            Some(downstream) => downstream.clone(),
            None => return,
        };

        while let Some(task_id) = to_visit.pop() {
            // A task that already left Pending through another path keeps
            // its status
            if !shared_state.mark_skipped_if_pending(&task_id) {
                continue;
            }

            info!(
                "Skipping task '{}' because upstream task '{}' failed",
                task_id, failed_task_id
            );
            shared_state.signal_completion(&task_id);

            if let Some(downstream) = shared_state.downstreams.get(&task_id) {
                to_visit.extend(downstream.iter().cloned());
            }
        }
    }
}

#[cfg(test)]
mod tests;
