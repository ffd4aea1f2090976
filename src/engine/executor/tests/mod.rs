use super::TaskExecutor;
use crate::engine::execution::RunSharedState;
use crate::engine::run_context::RunContext;
use crate::engine::run_result::TaskReport;
use crate::engine::task_slot::TaskSlot;
use crate::engine::task_status::TaskStatus;
use crate::error::TaskError;
use crate::task::{RetryPolicy, Task};

use async_trait::async_trait;
use chrono::Utc;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, Semaphore};
use tokio::time::sleep;

// Mock task that fails a scripted number of times before succeeding
struct MockTask {
    fail_first: usize,
    delay: Duration,
    calls: Arc<Mutex<usize>>,
}

#[async_trait]
impl Task for MockTask {
    async fn execute(&self, _ctx: &RunContext, _attempt: u32) -> Result<(), TaskError> {
        let call = {
            let mut calls = self.calls.lock().unwrap();
            *calls += 1;
            *calls
        };

        sleep(self.delay).await;

        if call <= self.fail_first {
            Err(TaskError::Backend(format!("injected failure {}", call)))
        } else {
            Ok(())
        }
    }
}

fn mock_slot(
    fail_first: usize,
    delay: Duration,
    policy: RetryPolicy,
) -> (TaskSlot, Arc<Mutex<usize>>) {
    let calls = Arc::new(Mutex::new(0));
    let slot = TaskSlot {
        task: Arc::new(MockTask {
            fail_first,
            delay,
            calls: calls.clone(),
        }),
        retry_policy: policy,
    };
    (slot, calls)
}

fn build_state(
    slots: Vec<(&str, TaskSlot)>,
    limiter: Option<usize>,
) -> (RunSharedState, mpsc::UnboundedReceiver<String>) {
    let (tx, rx) = mpsc::unbounded_channel();

    let mut tasks = HashMap::new();
    let mut reports = BTreeMap::new();
    for (id, slot) in slots {
        tasks.insert(id.to_string(), slot);
        reports.insert(id.to_string(), TaskReport::pending());
    }

    let state = RunSharedState {
        tasks: Arc::new(tasks),
        remaining_upstreams: Arc::new(Mutex::new(HashMap::new())),
        downstreams: Arc::new(BTreeMap::new()),
        reports: Arc::new(Mutex::new(reports)),
        completion_sender: tx,
        context: Arc::new(RunContext::new("unit_run", Utc::now())),
        limiter: limiter.map(|n| Arc::new(Semaphore::new(n))),
    };

    (state, rx)
}

#[tokio::test]
async fn test_retries_until_success() {
    let policy = RetryPolicy::new(3, Duration::from_millis(1));
    let (slot, calls) = mock_slot(2, Duration::from_millis(1), policy);
    let (state, _rx) = build_state(vec![("a", slot.clone())], None);

    let outcome = TaskExecutor::execute_with_retry("a", &slot, &state).await;

    assert_eq!(outcome.unwrap(), 3);
    assert_eq!(*calls.lock().unwrap(), 3);
}

#[tokio::test]
async fn test_retry_budget_exhausted() {
    let policy = RetryPolicy::new(2, Duration::from_millis(1));
    let (slot, calls) = mock_slot(10, Duration::from_millis(1), policy);
    let (state, _rx) = build_state(vec![("a", slot.clone())], None);

    let outcome = TaskExecutor::execute_with_retry("a", &slot, &state).await;

    let (error, attempts) = outcome.unwrap_err();
    assert_eq!(attempts, 3); // max_retries + 1 invocations
    assert_eq!(error.kind(), "backend");
    assert_eq!(*calls.lock().unwrap(), 3);
}

#[tokio::test]
async fn test_no_retries_by_default() {
    let (slot, calls) = mock_slot(1, Duration::from_millis(1), RetryPolicy::default());
    let (state, _rx) = build_state(vec![("a", slot.clone())], None);

    let outcome = TaskExecutor::execute_with_retry("a", &slot, &state).await;

    let (_, attempts) = outcome.unwrap_err();
    assert_eq!(attempts, 1);
    assert_eq!(*calls.lock().unwrap(), 1);
}

#[tokio::test]
async fn test_timed_out_attempts_count_toward_budget() {
    let policy = RetryPolicy::new(1, Duration::from_millis(1))
        .with_attempt_timeout(Duration::from_millis(10));
    let (slot, calls) = mock_slot(0, Duration::from_millis(200), policy);
    let (state, _rx) = build_state(vec![("a", slot.clone())], None);

    let outcome = TaskExecutor::execute_with_retry("a", &slot, &state).await;

    let (error, attempts) = outcome.unwrap_err();
    assert!(matches!(error, TaskError::Timeout(_)));
    assert_eq!(attempts, 2);
    assert_eq!(*calls.lock().unwrap(), 2);
}

#[tokio::test]
async fn test_spawn_task_records_report_and_signals() {
    let (slot, _calls) = mock_slot(0, Duration::from_millis(1), RetryPolicy::default());
    let (state, mut rx) = build_state(vec![("a", slot)], None);

    let executor = TaskExecutor::new(state.clone());
    executor.spawn_task("a".to_string());

    assert_eq!(rx.recv().await.unwrap(), "a");

    let reports = state.reports.lock().unwrap();
    let report = reports.get("a").unwrap();
    assert_eq!(report.status, TaskStatus::Succeeded);
    assert_eq!(report.attempts, 1);
    assert!(report.error.is_none());
}

#[tokio::test]
async fn test_spawn_task_records_failure_with_error() {
    let (slot, _calls) = mock_slot(5, Duration::from_millis(1), RetryPolicy::default());
    let (state, mut rx) = build_state(vec![("a", slot)], None);

    let executor = TaskExecutor::new(state.clone());
    executor.spawn_task("a".to_string());

    assert_eq!(rx.recv().await.unwrap(), "a");

    let reports = state.reports.lock().unwrap();
    let report = reports.get("a").unwrap();
    assert_eq!(report.status, TaskStatus::Failed);
    assert_eq!(report.attempts, 1);
    assert_eq!(report.error.as_ref().unwrap().kind(), "backend");
}

// Gauge task that tracks how many instances run at once
struct GaugeTask {
    active: Arc<Mutex<usize>>,
    max_seen: Arc<Mutex<usize>>,
    hold: Duration,
}

#[async_trait]
impl Task for GaugeTask {
    async fn execute(&self, _ctx: &RunContext, _attempt: u32) -> Result<(), TaskError> {
        {
            let mut active = self.active.lock().unwrap();
            *active += 1;
            let mut max_seen = self.max_seen.lock().unwrap();
            *max_seen = (*max_seen).max(*active);
        }

        sleep(self.hold).await;

        *self.active.lock().unwrap() -= 1;
        Ok(())
    }
}

#[tokio::test]
async fn test_limiter_serializes_attempts() {
    let active = Arc::new(Mutex::new(0));
    let max_seen = Arc::new(Mutex::new(0));

    let slot_for = |_: &str| TaskSlot {
        task: Arc::new(GaugeTask {
            active: active.clone(),
            max_seen: max_seen.clone(),
            hold: Duration::from_millis(20),
        }),
        retry_policy: RetryPolicy::default(),
    };

    let (state, mut rx) = build_state(vec![("a", slot_for("a")), ("b", slot_for("b"))], Some(1));
    let executor = TaskExecutor::new(state);
    executor.spawn_task("a".to_string());
    executor.spawn_task("b".to_string());

    rx.recv().await.unwrap();
    rx.recv().await.unwrap();

    assert_eq!(*max_seen.lock().unwrap(), 1);
}

#[tokio::test]
async fn test_unlimited_attempts_overlap() {
    let active = Arc::new(Mutex::new(0));
    let max_seen = Arc::new(Mutex::new(0));

    let slot_for = |_: &str| TaskSlot {
        task: Arc::new(GaugeTask {
            active: active.clone(),
            max_seen: max_seen.clone(),
            hold: Duration::from_millis(20),
        }),
        retry_policy: RetryPolicy::default(),
    };

    let (state, mut rx) = build_state(vec![("a", slot_for("a")), ("b", slot_for("b"))], None);
    let executor = TaskExecutor::new(state);
    executor.spawn_task("a".to_string());
    executor.spawn_task("b".to_string());

    rx.recv().await.unwrap();
    rx.recv().await.unwrap();

    assert_eq!(*max_seen.lock().unwrap(), 2);
}
