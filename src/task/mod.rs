use async_trait::async_trait;

pub mod retry;

pub use retry::{Backoff, RetryPolicy};

use crate::engine::RunContext;
use crate::error::TaskError;

/// A unit of work in a pipeline.
///
/// Implementations receive the shared run context and the 1-based attempt
/// number, and report failure through the typed [`TaskError`] taxonomy so the
/// engine can record what went wrong alongside the final status.
#[async_trait]
pub trait Task: Send + Sync {
    async fn execute(&self, ctx: &RunContext, attempt: u32) -> Result<(), TaskError>;
}
