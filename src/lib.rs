//! # Pipeline Engine
//!
//! A multi-threaded, asynchronous DAG execution core for data pipelines,
//! with ready-made task kinds for loading a star-schema warehouse.
//!
//! ## Features
//!
//! - Explicit pipeline graphs: named tasks, dependency edges, validated
//!   and frozen by `finalize`
//! - Asynchronous execution with parallel scheduling of ready tasks
//! - Per-task retry policies with fixed or exponential backoff and
//!   per-attempt timeouts
//! - Cascading cancellation: downstreams of a failed task are skipped,
//!   independent branches keep running
//! - Staging, fact-load, dimension-load and data-quality task kinds over a
//!   pluggable SQL backend
//! - Structured run results with per-task status, attempts and errors
//!
//! ## Usage
//!
//! Add the following to your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! pipeline-engine = "0.1"
//! ```
//!
//! ## Example
//!
//! ```rust
//! use pipeline_engine::{PipelineGraph, RunContext, Task, TaskError, TaskStatus};
//! use async_trait::async_trait;
//! use chrono::Utc;
//!
//! // Define a custom task
//! struct ExtractTask;
//!
//! #[async_trait]
//! impl Task for ExtractTask {
//!     async fn execute(&self, ctx: &RunContext, _attempt: u32) -> Result<(), TaskError> {
//!         println!("Extracting for run {}", ctx.run_id());
//!         Ok(())
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     // Build the graph, then freeze it
//!     let mut graph = PipelineGraph::new("my_pipeline");
//!     graph.add_task("extract", ExtractTask, None).unwrap();
//!     graph.add_task("load", ExtractTask, None).unwrap();
//!     graph.add_edge("extract", "load").unwrap();
//!     graph.finalize().unwrap();
//!
//!     // Execute one run
//!     let result = graph
//!         .run(RunContext::new("run_1", Utc::now()))
//!         .await
//!         .unwrap();
//!     assert!(result.is_success());
//!     assert_eq!(result.status_of("load"), Some(TaskStatus::Succeeded));
//! }
//! ```
//!
//! ## License
//!
//! Licensed under the MIT license. See the [LICENSE](LICENSE) file for details.

pub mod backend;
pub mod credentials;
pub mod engine;
pub mod error;
pub mod etl;
pub mod ops;
pub mod task;

pub use engine::{
    PipelineDefaults, PipelineGraph, RunContext, RunOptions, RunResult, RunStatus, TaskReport,
    TaskStatus,
};
pub use error::{BackendError, CredentialError, GraphError, TaskError};
pub use task::{Backoff, RetryPolicy, Task};
