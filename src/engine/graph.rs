use log::{debug, info};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, Mutex};
use tokio::sync::{mpsc, Semaphore};

use super::execution::{ExecutionEnvironment, RunSharedState};
use super::executor::TaskExecutor;
use super::options::{PipelineDefaults, RunOptions};
use super::run_context::RunContext;
use super::run_result::{RunResult, RunStatus, TaskReport};
use super::task_slot::TaskSlot;
use super::task_status::TaskStatus;
use crate::error::GraphError;
use crate::task::{RetryPolicy, Task};

/// Adjacency and execution order computed by a successful `finalize`.
#[derive(Debug, Clone)]
struct Topology {
    upstreams: BTreeMap<String, BTreeSet<String>>,
    downstreams: BTreeMap<String, BTreeSet<String>>,
    order: Vec<String>,
}

/// A directed acyclic graph of named tasks.
///
/// Build it up with [`add_task`](Self::add_task) and
/// [`add_edge`](Self::add_edge), then seal it with
/// [`finalize`](Self::finalize). Finalizing validates acyclicity, computes
/// the topology and freezes the definition; only a finalized graph can
/// [`run`](Self::run). Construction errors leave the graph unchanged.
pub struct PipelineGraph {
    /// Unique identifier for the pipeline
    pipeline_id: String,
    /// Map of task ids to registered slots
    tasks: HashMap<String, TaskSlot>,
    /// Dependency edges as (upstream, downstream) pairs
    edges: BTreeSet<(String, String)>,
    defaults: PipelineDefaults,
    options: RunOptions,
    /// Present once the graph is finalized
    topology: Option<Topology>,
}

impl PipelineGraph {
    pub fn new(pipeline_id: impl Into<String>) -> Self {
        Self {
            pipeline_id: pipeline_id.into(),
            tasks: HashMap::new(),
            edges: BTreeSet::new(),
            defaults: PipelineDefaults::default(),
            options: RunOptions::default(),
            topology: None,
        }
    }

    /// Set the retry defaults applied to tasks registered without a policy.
    pub fn with_defaults(mut self, defaults: PipelineDefaults) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn with_options(mut self, options: RunOptions) -> Self {
        self.options = options;
        self
    }

    /// Register a task under a unique id. Passing `None` for the policy
    /// picks up the pipeline defaults.
    pub fn add_task<T: Task + 'static>(
        &mut self,
        id: impl Into<String>,
        task: T,
        retry_policy: Option<RetryPolicy>,
    ) -> Result<(), GraphError> {
        if self.topology.is_some() {
            return Err(GraphError::Frozen);
        }

        let id = id.into();
        if self.tasks.contains_key(&id) {
            return Err(GraphError::DuplicateTask(id));
        }

        let retry_policy = retry_policy.unwrap_or_else(|| self.defaults.retry_policy.clone());
        self.tasks.insert(
            id,
            TaskSlot {
                task: Arc::new(task),
                retry_policy,
            },
        );
        Ok(())
    }

    /// Declare that `downstream_id` must wait for `upstream_id` to succeed.
    /// Both tasks must already be registered. Duplicate edges collapse to
    /// one; a self-edge is rejected as a cycle outright.
    pub fn add_edge(&mut self, upstream_id: &str, downstream_id: &str) -> Result<(), GraphError> {
        if self.topology.is_some() {
            return Err(GraphError::Frozen);
        }
        if !self.tasks.contains_key(upstream_id) {
            return Err(GraphError::UnknownTask(upstream_id.to_string()));
        }
        if !self.tasks.contains_key(downstream_id) {
            return Err(GraphError::UnknownTask(downstream_id.to_string()));
        }
        if upstream_id == downstream_id {
            return Err(GraphError::Cycle(vec![upstream_id.to_string()]));
        }

        self.edges
            .insert((upstream_id.to_string(), downstream_id.to_string()));
        Ok(())
    }

    /// Validate the graph and freeze it. Returns [`GraphError::Cycle`] with
    /// the offending task ids when the edges are not acyclic, leaving the
    /// graph unfrozen. Finalizing an already finalized graph is a no-op.
    pub fn finalize(&mut self) -> Result<(), GraphError> {
        if self.topology.is_some() {
            return Ok(());
        }

        // Full adjacency, isolated tasks included
        let mut upstreams: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        let mut downstreams: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for id in self.tasks.keys() {
            upstreams.insert(id.clone(), BTreeSet::new());
            downstreams.insert(id.clone(), BTreeSet::new());
        }
        for (upstream, downstream) in &self.edges {
            if let Some(set) = upstreams.get_mut(downstream) {
                set.insert(upstream.clone());
            }
            if let Some(set) = downstreams.get_mut(upstream) {
                set.insert(downstream.clone());
            }
        }

        let mut in_degree: BTreeMap<String, usize> = upstreams
            .iter()
            .map(|(id, ups)| (id.clone(), ups.len()))
            .collect();

        // Kahn's algorithm; the ordered ready set keeps ties lexicographic
        let mut ready: BTreeSet<String> = in_degree
            .iter()
            .filter(|(_, degree)| **degree == 0)
            .map(|(id, _)| id.clone())
            .collect();
        let mut order = Vec::with_capacity(self.tasks.len());

        while let Some(id) = ready.pop_first() {
            if let Some(following) = downstreams.get(&id) {
                for downstream_id in following {
                    if let Some(count) = in_degree.get_mut(downstream_id) {
                        *count -= 1;
                        if *count == 0 {
                            ready.insert(downstream_id.clone());
                        }
                    }
                }
            }
            order.push(id);
        }

        if order.len() != self.tasks.len() {
            let cyclic: Vec<String> = in_degree
                .iter()
                .filter(|(_, degree)| **degree > 0)
                .map(|(id, _)| id.clone())
                .collect();
            return Err(GraphError::Cycle(cyclic));
        }

        debug!(
            "Pipeline '{}' finalized; execution order {:?}",
            self.pipeline_id, order
        );

        self.topology = Some(Topology {
            upstreams,
            downstreams,
            order,
        });
        Ok(())
    }

    pub fn is_finalized(&self) -> bool {
        self.topology.is_some()
    }

    pub fn pipeline_id(&self) -> &str {
        &self.pipeline_id
    }

    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    /// Deterministic topological order, available once finalized.
    pub fn execution_order(&self) -> Option<&[String]> {
        self.topology.as_ref().map(|t| t.order.as_slice())
    }

    pub fn upstreams_of(&self, task_id: &str) -> Option<&BTreeSet<String>> {
        self.topology.as_ref().and_then(|t| t.upstreams.get(task_id))
    }

    pub fn downstreams_of(&self, task_id: &str) -> Option<&BTreeSet<String>> {
        self.topology
            .as_ref()
            .and_then(|t| t.downstreams.get(task_id))
    }

    /// Execute one run of the finalized graph.
    ///
    /// Every task is invoked at most once per run (not counting retries of
    /// the same task). The returned result carries the terminal status,
    /// attempt count and originating error for every task. A failed task
    /// yields [`RunStatus::Failed`] but never aborts the rest of the run:
    /// tasks not downstream of the failure still execute.
    pub async fn run(&self, context: RunContext) -> Result<RunResult, GraphError> {
        let topology = self.topology.as_ref().ok_or(GraphError::NotFinalized)?;

        debug!(
            "Executing pipeline '{}' with {} tasks",
            self.pipeline_id,
            self.tasks.len()
        );

        if self.tasks.is_empty() {
            return Ok(RunResult {
                pipeline_id: self.pipeline_id.clone(),
                run_id: context.run_id().to_string(),
                status: RunStatus::Success,
                tasks: BTreeMap::new(),
            });
        }

        let execution_env = self.setup_execution_environment(topology, context);

        let executor = TaskExecutor::new(execution_env.shared_state.clone());
        self.dispatch_initial_tasks(topology, &executor);

        let result = self.wait_for_completion(execution_env).await;

        info!(
            "Pipeline '{}' run '{}' finished: {}",
            self.pipeline_id, result.run_id, result.status
        );
        Ok(result)
    }

    fn setup_execution_environment(
        &self,
        topology: &Topology,
        context: RunContext,
    ) -> ExecutionEnvironment {
        debug!(
            "Setting up execution environment for pipeline '{}'",
            self.pipeline_id
        );

        let (tx, rx) = mpsc::unbounded_channel();
        let task_count = self.tasks.len();

        let remaining_upstreams: HashMap<String, usize> = topology
            .upstreams
            .iter()
            .map(|(id, ups)| (id.clone(), ups.len()))
            .collect();
        let downstreams: BTreeMap<String, Vec<String>> = topology
            .downstreams
            .iter()
            .map(|(id, downs)| (id.clone(), downs.iter().cloned().collect()))
            .collect();
        let reports: BTreeMap<String, TaskReport> = self
            .tasks
            .keys()
            .map(|id| (id.clone(), TaskReport::pending()))
            .collect();

        let limiter = self
            .options
            .max_concurrency
            .map(|n| Arc::new(Semaphore::new(n.max(1))));

        let shared_state = RunSharedState {
            tasks: Arc::new(self.tasks.clone()),
            remaining_upstreams: Arc::new(Mutex::new(remaining_upstreams)),
            downstreams: Arc::new(downstreams),
            reports: Arc::new(Mutex::new(reports)),
            completion_sender: tx,
            context: Arc::new(context),
            limiter,
        };

        ExecutionEnvironment {
            task_count,
            shared_state,
            completion_channel: rx,
        }
    }

    fn dispatch_initial_tasks(&self, topology: &Topology, executor: &TaskExecutor) {
        // Ordered map iteration keeps the dispatch order lexicographic
        let source_tasks: Vec<String> = topology
            .upstreams
            .iter()
            .filter(|(_, ups)| ups.is_empty())
            .map(|(id, _)| id.clone())
            .collect();

        info!("Dispatching {} source tasks", source_tasks.len());

        for task_id in source_tasks {
            executor.spawn_task(task_id);
        }
    }

    async fn wait_for_completion(&self, execution_env: ExecutionEnvironment) -> RunResult {
        let ExecutionEnvironment {
            task_count,
            shared_state,
            completion_channel: mut rx,
        } = execution_env;

        debug!("Waiting for {} tasks to complete", task_count);

        let mut completed = 0;
        while let Some(completed_id) = rx.recv().await {
            info!("Pipeline: task '{}' has completed", completed_id);
            completed += 1;

            debug!("Progress: {}/{} tasks completed", completed, task_count);

            if completed == task_count {
                break;
            }
        }

        let reports = shared_state.reports.lock().unwrap().clone();
        let status = if reports
            .values()
            .any(|report| report.status == TaskStatus::Failed)
        {
            RunStatus::Failed
        } else {
            RunStatus::Success
        };

        RunResult {
            pipeline_id: self.pipeline_id.clone(),
            run_id: shared_state.context.run_id().to_string(),
            status,
            tasks: reports,
        }
    }
}

#[cfg(test)]
mod tests;
