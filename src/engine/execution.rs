use log::warn;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};
use tokio::sync::{mpsc, Semaphore};

use super::run_context::RunContext;
use super::run_result::TaskReport;
use super::task_slot::TaskSlot;
use super::task_status::TaskStatus;
use crate::error::TaskError;

pub(crate) struct ExecutionEnvironment {
    /// Total number of tasks in the pipeline
    pub task_count: usize,
    /// Shared state for task execution
    pub shared_state: RunSharedState,
    /// Channel receiver for task completion notifications
    pub completion_channel: mpsc::UnboundedReceiver<String>,
}

/// State shared by every spawned task of one run.
///
/// Built fresh for each run, so consecutive runs of the same graph never
/// see each other's counters or reports.
#[derive(Clone)]
pub(crate) struct RunSharedState {
    /// Map of task ids to registered slots
    pub tasks: Arc<HashMap<String, TaskSlot>>,
    /// Number of unfinished upstream tasks for each task
    pub remaining_upstreams: Arc<Mutex<HashMap<String, usize>>>,
    /// Direct downstream tasks of each task, lexicographically ordered
    pub downstreams: Arc<BTreeMap<String, Vec<String>>>,
    /// Per-task report accumulated over the run
    pub reports: Arc<Mutex<BTreeMap<String, TaskReport>>>,
    /// Channel sender for task completion notifications
    pub completion_sender: mpsc::UnboundedSender<String>,
    /// Context handed read-only to every task action
    pub context: Arc<RunContext>,
    /// Limit on concurrently executing attempts, when configured
    pub limiter: Option<Arc<Semaphore>>,
}

impl RunSharedState {
    /// Pending -> Running. Any other starting status is a scheduling bug and
    /// is left untouched.
    pub fn mark_running(&self, task_id: &str) {
        let mut reports = self.reports.lock().unwrap();
        match reports.get_mut(task_id) {
            Some(report) if report.status == TaskStatus::Pending => {
                report.status = TaskStatus::Running;
            }
            Some(report) => {
                warn!(
                    "Task '{}' was dispatched while {}; leaving status untouched",
                    task_id, report.status
                );
            }
            None => warn!("Task '{}' has no report entry", task_id),
        }
    }

    pub fn record_attempt(&self, task_id: &str, attempt: u32) {
        let mut reports = self.reports.lock().unwrap();
        if let Some(report) = reports.get_mut(task_id) {
            report.attempts = attempt;
        }
    }

    pub fn mark_succeeded(&self, task_id: &str, attempts: u32) {
        let mut reports = self.reports.lock().unwrap();
        if let Some(report) = reports.get_mut(task_id) {
            report.status = TaskStatus::Succeeded;
            report.attempts = attempts;
        }
    }

    pub fn mark_failed(&self, task_id: &str, attempts: u32, error: TaskError) {
        let mut reports = self.reports.lock().unwrap();
        if let Some(report) = reports.get_mut(task_id) {
            report.status = TaskStatus::Failed;
            report.attempts = attempts;
            report.error = Some(error);
        }
    }

    /// Pending -> Skipped. Returns false when the task already left Pending,
    /// which stops a diamond-shaped cascade from visiting it twice.
    pub fn mark_skipped_if_pending(&self, task_id: &str) -> bool {
        let mut reports = self.reports.lock().unwrap();
        match reports.get_mut(task_id) {
            Some(report) if report.status == TaskStatus::Pending => {
                report.status = TaskStatus::Skipped;
                true
            }
            _ => false,
        }
    }

    pub fn signal_completion(&self, task_id: &str) {
        // The receiver stays open until every task is accounted for, so a
        // send error here means the run loop is already gone.
        if let Err(e) = self.completion_sender.send(task_id.to_string()) {
            warn!("Failed to signal completion for task '{}': {}", task_id, e);
        }
    }
}
