mod execution;
mod executor;
mod graph;
mod options;
mod run_context;
mod run_result;
mod task_slot;
mod task_status;

pub use graph::PipelineGraph;
pub use options::{PipelineDefaults, RunOptions};
pub use run_context::RunContext;
pub use run_result::{RunResult, RunStatus, TaskReport};
pub use task_status::TaskStatus;
